use log::debug;

use crate::boundary::{room_contains, BoundaryError, RoomBoundary};

/// The set of rooms the player can walk through plus the wall buffer.
///
/// Rooms are checked in order; when membership rectangles overlap the first
/// room listed owns the position.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomLayout {
    rooms: Vec<RoomBoundary>,
    wall_margin: f32,
}

impl RoomLayout {
    pub fn new(rooms: Vec<RoomBoundary>, wall_margin: f32) -> Result<Self, BoundaryError> {
        if rooms.is_empty() {
            return Err(BoundaryError::NoRooms);
        }
        if !wall_margin.is_finite() || wall_margin < 0.0 {
            return Err(BoundaryError::InvalidMargin {
                margin: wall_margin,
            });
        }
        if let Some(room) = rooms
            .iter()
            .find(|room| !room.collision_rect(wall_margin).is_valid())
        {
            return Err(BoundaryError::MarginTooLarge {
                room: room.name().to_string(),
                margin: wall_margin,
            });
        }
        Ok(Self { rooms, wall_margin })
    }

    pub fn rooms(&self) -> &[RoomBoundary] {
        &self.rooms
    }

    pub fn wall_margin(&self) -> f32 {
        self.wall_margin
    }

    /// Index of the room whose membership rectangle holds `(x, z)`.
    pub fn room_at(&self, x: f32, z: f32) -> Option<usize> {
        self.rooms.iter().position(|room| room_contains(room, x, z))
    }

    /// Decides whether a candidate position would put the viewpoint into a wall.
    ///
    /// Positions outside every room are open space and never blocked.
    /// Non-finite coordinates are always blocked.
    pub fn is_blocked(&self, x: f32, z: f32) -> bool {
        if !x.is_finite() || !z.is_finite() {
            return true;
        }
        let Some(index) = self.room_at(x, z) else {
            return false;
        };
        let room = &self.rooms[index];
        let blocked = room.blocks(x, z, self.wall_margin);
        if blocked {
            debug!("position ({x:.2}, {z:.2}) blocked by walls of `{}`", room.name());
        }
        blocked
    }
}
