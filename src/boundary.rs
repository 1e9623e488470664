use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned rectangle on the floor (XZ) plane. Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

impl Rect {
    pub const fn new(min_x: f32, max_x: f32, min_z: f32, max_z: f32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        x >= self.min_x && x <= self.max_x && z >= self.min_z && z <= self.max_z
    }

    /// Returns the rectangle grown by `amount` on every side. Negative values shrink it.
    pub fn expand(&self, amount: f32) -> Self {
        Self::new(
            self.min_x - amount,
            self.max_x + amount,
            self.min_z - amount,
            self.max_z + amount,
        )
    }

    pub fn shrink(&self, amount: f32) -> Self {
        self.expand(-amount)
    }

    /// True when all edges are finite and both extents are positive.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.max_x, self.min_z, self.max_z]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x < self.max_x
            && self.min_z < self.max_z
    }

    pub fn encloses(&self, other: &Rect) -> bool {
        self.min_x <= other.min_x
            && self.max_x >= other.max_x
            && self.min_z <= other.min_z
            && self.max_z >= other.max_z
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.2}, {:.2}] x [{:.2}, {:.2}]",
            self.min_x, self.max_x, self.min_z, self.max_z
        )
    }
}

/// One of the four walls of a rectangular room, named by the edge it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wall {
    MinX,
    MaxX,
    MinZ,
    MaxZ,
}

impl Wall {
    pub const ALL: [Wall; 4] = [Wall::MinX, Wall::MaxX, Wall::MinZ, Wall::MaxZ];

    pub fn from_name(name: &str) -> Option<Self> {
        let wall = match name {
            "minX" | "min_x" | "MinX" => Wall::MinX,
            "maxX" | "max_x" | "MaxX" => Wall::MaxX,
            "minZ" | "min_z" | "MinZ" => Wall::MinZ,
            "maxZ" | "max_z" | "MaxZ" => Wall::MaxZ,
            _ => return None,
        };
        Some(wall)
    }

    /// Walls on a Z edge run along the X axis and vice versa.
    pub fn runs_along_x(self) -> bool {
        matches!(self, Wall::MinZ | Wall::MaxZ)
    }

    /// Coordinate of `(x, z)` measured along this wall.
    pub fn along(self, x: f32, z: f32) -> f32 {
        if self.runs_along_x() {
            x
        } else {
            z
        }
    }

    /// Extent of this wall within `rect`, as `(start, end)` along the wall axis.
    pub fn extent(self, rect: &Rect) -> (f32, f32) {
        if self.runs_along_x() {
            (rect.min_x, rect.max_x)
        } else {
            (rect.min_z, rect.max_z)
        }
    }

    /// True when `(x, z)` sits at or beyond this wall's edge of `rect`.
    pub fn is_reached(self, rect: &Rect, x: f32, z: f32) -> bool {
        match self {
            Wall::MinX => x <= rect.min_x,
            Wall::MaxX => x >= rect.max_x,
            Wall::MinZ => z <= rect.min_z,
            Wall::MaxZ => z >= rect.max_z,
        }
    }
}

impl fmt::Display for Wall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Wall::MinX => "minX",
            Wall::MaxX => "maxX",
            Wall::MinZ => "minZ",
            Wall::MaxZ => "maxZ",
        };
        f.write_str(name)
    }
}

/// Passable span cut into one wall of a room.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Doorway {
    pub wall: Wall,
    pub min: f32,
    pub max: f32,
}

impl Doorway {
    pub const fn new(wall: Wall, min: f32, max: f32) -> Self {
        Self { wall, min, max }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, along: f32) -> bool {
        along >= self.min && along <= self.max
    }
}

/// Configuration errors detected once, while the world is being built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundaryError {
    #[error("room `{room}` has degenerate bounds {rect}")]
    DegenerateBounds { room: String, rect: Rect },
    #[error("room `{room}` membership rectangle {membership} does not enclose its bounds {bounds}")]
    MembershipTooSmall {
        room: String,
        membership: Rect,
        bounds: Rect,
    },
    #[error("room `{room}` doorway span [{min}, {max}] is empty or not finite")]
    DoorwayInverted { room: String, min: f32, max: f32 },
    #[error("room `{room}` doorway [{min}, {max}] is not strictly inside the {wall} wall ({start}, {end})")]
    DoorwayOutsideWall {
        room: String,
        wall: Wall,
        min: f32,
        max: f32,
        start: f32,
        end: f32,
    },
    #[error("wall margin {margin} is negative or not finite")]
    InvalidMargin { margin: f32 },
    #[error("wall margin {margin} leaves no walkable area in room `{room}`")]
    MarginTooLarge { room: String, margin: f32 },
    #[error("world defines no rooms")]
    NoRooms,
    #[error("{setting} must be a finite, non-negative number, got {value}")]
    InvalidSetting { setting: &'static str, value: f32 },
    #[error("session length {seconds}s exceeds the {max}s limit")]
    SessionTooLong { seconds: u64, max: u64 },
    #[error("target candidate #{index} has a non-finite position")]
    InvalidCandidate { index: usize },
}

/// Immutable description of one rectangular room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomBoundary {
    name: String,
    bounds: Rect,
    membership: Rect,
    doorway: Option<Doorway>,
}

impl RoomBoundary {
    /// Validates and builds a room.
    ///
    /// `bounds` is the wall rectangle, `membership` the larger rectangle used
    /// to decide which room's walls apply to a position.
    pub fn new(
        name: impl Into<String>,
        bounds: Rect,
        membership: Rect,
        doorway: Option<Doorway>,
    ) -> Result<Self, BoundaryError> {
        let name = name.into();
        if !bounds.is_valid() {
            return Err(BoundaryError::DegenerateBounds { room: name, rect: bounds });
        }
        if !membership.is_valid() || !membership.encloses(&bounds) {
            return Err(BoundaryError::MembershipTooSmall {
                room: name,
                membership,
                bounds,
            });
        }
        if let Some(door) = doorway {
            if !(door.min.is_finite() && door.max.is_finite() && door.min < door.max) {
                return Err(BoundaryError::DoorwayInverted {
                    room: name,
                    min: door.min,
                    max: door.max,
                });
            }
            let (start, end) = door.wall.extent(&bounds);
            if door.min <= start || door.max >= end {
                return Err(BoundaryError::DoorwayOutsideWall {
                    room: name,
                    wall: door.wall,
                    min: door.min,
                    max: door.max,
                    start,
                    end,
                });
            }
        }
        Ok(Self {
            name,
            bounds,
            membership,
            doorway,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bounds(&self) -> &Rect {
        &self.bounds
    }

    pub fn membership(&self) -> &Rect {
        &self.membership
    }

    pub fn doorway(&self) -> Option<&Doorway> {
        self.doorway.as_ref()
    }

    /// Wall rectangle pulled inward by `margin`.
    pub fn collision_rect(&self, margin: f32) -> Rect {
        self.bounds.shrink(margin)
    }

    /// Tests every wall independently against the margin-shrunk rectangle.
    /// The doorway wall lets positions through when they lie on the doorway span.
    pub fn blocks(&self, x: f32, z: f32, margin: f32) -> bool {
        let rect = self.collision_rect(margin);
        Wall::ALL.iter().any(|&wall| {
            if !wall.is_reached(&rect, x, z) {
                return false;
            }
            match self.doorway {
                Some(door) if door.wall == wall => !door.contains(wall.along(x, z)),
                _ => true,
            }
        })
    }
}

/// Coarse "which room am I near" test against the membership rectangle.
pub fn room_contains(room: &RoomBoundary, x: f32, z: f32) -> bool {
    room.membership.contains(x, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> RoomBoundary {
        let bounds = Rect::new(-5.0, 5.0, -5.0, 5.0);
        RoomBoundary::new(
            "Hall",
            bounds,
            bounds.expand(2.0),
            Some(Doorway::new(Wall::MaxZ, 1.0, 2.0)),
        )
        .unwrap()
    }

    #[test]
    fn membership_is_inclusive_and_larger_than_bounds() {
        let room = room();
        assert!(room_contains(&room, 7.0, -7.0));
        assert!(room_contains(&room, 0.0, 0.0));
        assert!(!room_contains(&room, 7.01, 0.0));
    }

    #[test]
    fn rejects_degenerate_bounds() {
        let bounds = Rect::new(1.0, 1.0, 0.0, 2.0);
        let err = RoomBoundary::new("Flat", bounds, Rect::new(0.0, 2.0, 0.0, 2.0), None).unwrap_err();
        assert!(matches!(err, BoundaryError::DegenerateBounds { .. }));
    }

    #[test]
    fn rejects_doorway_touching_wall_corner() {
        let bounds = Rect::new(0.0, 4.0, 0.0, 4.0);
        let err = RoomBoundary::new(
            "Closet",
            bounds,
            bounds.expand(1.0),
            Some(Doorway::new(Wall::MinZ, 0.0, 1.0)),
        )
        .unwrap_err();
        assert!(matches!(err, BoundaryError::DoorwayOutsideWall { .. }));
    }

    #[test]
    fn rejects_inverted_doorway() {
        let bounds = Rect::new(0.0, 4.0, 0.0, 4.0);
        let err = RoomBoundary::new(
            "Closet",
            bounds,
            bounds.expand(1.0),
            Some(Doorway::new(Wall::MaxX, 3.0, 2.0)),
        )
        .unwrap_err();
        assert!(matches!(err, BoundaryError::DoorwayInverted { .. }));
    }

    #[test]
    fn rejects_membership_smaller_than_bounds() {
        let bounds = Rect::new(0.0, 4.0, 0.0, 4.0);
        let err = RoomBoundary::new("Closet", bounds, bounds.shrink(1.0), None).unwrap_err();
        assert!(matches!(err, BoundaryError::MembershipTooSmall { .. }));
    }

    #[test]
    fn doorway_only_opens_its_own_wall() {
        let room = room();
        // On the doorway span at the max-Z edge.
        assert!(!room.blocks(1.5, 4.6, 0.5));
        // Same x, but against the opposite wall.
        assert!(room.blocks(1.5, -4.6, 0.5));
    }

    #[test]
    fn doorway_along_x_wall_uses_z_span() {
        let bounds = Rect::new(0.0, 4.0, 0.0, 4.0);
        let room = RoomBoundary::new(
            "Side",
            bounds,
            bounds.expand(1.0),
            Some(Doorway::new(Wall::MaxX, 1.0, 2.0)),
        )
        .unwrap();
        assert!(!room.blocks(3.8, 1.5, 0.5));
        assert!(room.blocks(3.8, 2.5, 0.5));
    }
}
