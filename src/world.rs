use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;
use roxmltree::{Document, Node};
use serde::{Deserialize, Serialize};

use crate::boundary::{BoundaryError, Doorway, Rect, RoomBoundary, Wall};
use crate::collision::RoomLayout;
use crate::frame::FrameConfig;
use crate::movement::MovementConfig;

/// Longest countdown a world may ask for.
pub const MAX_SESSION_SECONDS: u64 = 24 * 60 * 60;

/// One room as written in the world table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub name: String,
    pub bounds: Rect,
    /// Defaults to `bounds` grown by the world's membership padding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership: Option<Rect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doorway: Option<Doorway>,
}

/// Static configuration for one world: rooms, tuning and target spots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    pub rooms: Vec<RoomConfig>,
    pub wall_margin: f32,
    pub membership_padding: f32,
    pub session_seconds: u64,
    pub movement: MovementConfig,
    pub frame: FrameConfig,
    /// Spawn x/z are clamped into `[-spawn_limit, spawn_limit]`.
    pub spawn_limit: f32,
    pub target_scale: f32,
    pub target_candidates: Vec<Vec3>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            rooms: default_rooms(),
            wall_margin: 0.5,
            membership_padding: 2.0,
            session_seconds: 60,
            movement: MovementConfig::default(),
            frame: FrameConfig::default(),
            spawn_limit: 4.0,
            target_scale: 0.3,
            target_candidates: default_candidates(),
        }
    }
}

fn default_rooms() -> Vec<RoomConfig> {
    vec![
        RoomConfig {
            name: "Room1".to_string(),
            bounds: Rect::new(-5.89, 5.94, -5.87, 5.87),
            membership: None,
            doorway: Some(Doorway::new(Wall::MaxZ, 3.23, 4.53)),
        },
        RoomConfig {
            name: "Room2".to_string(),
            bounds: Rect::new(2.40, 9.78, 6.66, 14.40),
            membership: None,
            doorway: Some(Doorway::new(Wall::MinZ, 3.23, 4.53)),
        },
    ]
}

fn default_candidates() -> Vec<Vec3> {
    vec![
        Vec3::new(-1.60, 2.03, 5.90),
        Vec3::new(-1.96, 2.03, -5.87),
        Vec3::new(-1.77, 2.03, 0.46),
        Vec3::new(10.10, 2.88, 9.35),
        Vec3::new(8.35, 2.84, 6.96),
        Vec3::new(9.84, 2.03, 13.89),
        Vec3::new(2.52, 2.03, 14.36),
    ]
}

impl WorldConfig {
    /// Parses a `<world>` document. Missing tags keep their defaults.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let document = Document::parse(xml).context("invalid world XML")?;
        let root = document.root_element();
        if !root.has_tag_name("world") {
            return Err(anyhow!(
                "expected <world> root element, found <{}>",
                root.tag_name().name()
            ));
        }

        let mut config = Self::default();
        config.wall_margin = parse_f32(optional_text(&root, "wallMargin"), config.wall_margin)?;
        config.membership_padding = parse_f32(
            optional_text(&root, "membershipPadding"),
            config.membership_padding,
        )?;
        if let Some(seconds) = optional_text(&root, "sessionSeconds") {
            config.session_seconds = seconds
                .parse()
                .with_context(|| format!("invalid <sessionSeconds> value `{seconds}`"))?;
        }
        config.spawn_limit = parse_f32(optional_text(&root, "spawnLimit"), config.spawn_limit)?;

        let rooms = root
            .children()
            .filter(|n| n.has_tag_name("room"))
            .enumerate()
            .map(|(index, node)| {
                parse_room(&node).with_context(|| format!("invalid <room> #{}", index + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        if !rooms.is_empty() {
            config.rooms = rooms;
        }

        if let Some(node) = child(&root, "movement") {
            let movement = &mut config.movement;
            movement.move_speed = parse_f32(optional_text(&node, "speed"), movement.move_speed)?;
            movement.damping = parse_f32(optional_text(&node, "damping"), movement.damping)?;
            movement.eye_height =
                parse_f32(optional_text(&node, "eyeHeight"), movement.eye_height)?;
            movement.look_sensitivity = parse_f32(
                optional_text(&node, "lookSensitivity"),
                movement.look_sensitivity,
            )?;
        }

        if let Some(node) = child(&root, "frame") {
            let frame = &mut config.frame;
            frame.min_interval =
                parse_millis(optional_text(&node, "minIntervalMs"), frame.min_interval)?;
            frame.max_step = parse_millis(optional_text(&node, "maxStepMs"), frame.max_step)?;
        }

        if let Some(node) = child(&root, "target") {
            config.target_scale = parse_f32(optional_text(&node, "scale"), config.target_scale)?;
            let candidates = node
                .children()
                .filter(|n| n.has_tag_name("candidate"))
                .map(|n| parse_vec3(n.text().unwrap_or_default()))
                .collect::<Result<Vec<_>>>()
                .context("invalid <candidate>")?;
            if !candidates.is_empty() {
                config.target_candidates = candidates;
            }
        }

        Ok(config)
    }

    pub fn session_duration(&self) -> Duration {
        Duration::from_secs(self.session_seconds)
    }

    /// Validates the tuning values, every room and the wall margin.
    pub fn build_layout(&self) -> Result<RoomLayout, BoundaryError> {
        self.check_settings()?;
        let rooms = self
            .rooms
            .iter()
            .map(|room| {
                let membership = room
                    .membership
                    .unwrap_or_else(|| room.bounds.expand(self.membership_padding));
                RoomBoundary::new(room.name.clone(), room.bounds, membership, room.doorway)
            })
            .collect::<Result<Vec<_>, _>>()?;
        RoomLayout::new(rooms, self.wall_margin)
    }

    fn check_settings(&self) -> Result<(), BoundaryError> {
        let movement = &self.movement;
        let settings = [
            ("membershipPadding", self.membership_padding),
            ("spawnLimit", self.spawn_limit),
            ("target scale", self.target_scale),
            ("movement speed", movement.move_speed),
            ("movement damping", movement.damping),
            ("movement eyeHeight", movement.eye_height),
            ("movement lookSensitivity", movement.look_sensitivity),
            ("movement max pitch", movement.max_pitch),
        ];
        for (setting, value) in settings {
            if !value.is_finite() || value < 0.0 {
                return Err(BoundaryError::InvalidSetting { setting, value });
            }
        }
        if self.session_seconds > MAX_SESSION_SECONDS {
            return Err(BoundaryError::SessionTooLong {
                seconds: self.session_seconds,
                max: MAX_SESSION_SECONDS,
            });
        }
        if let Some(index) = self
            .target_candidates
            .iter()
            .position(|candidate| !candidate.is_finite())
        {
            return Err(BoundaryError::InvalidCandidate { index });
        }
        Ok(())
    }
}

fn parse_room(node: &Node<'_, '_>) -> Result<RoomConfig> {
    let name = required_text(node, "name")?;
    let bounds = parse_rect(&required_text(node, "bounds")?).context("invalid <bounds>")?;
    let membership = optional_text(node, "membership")
        .map(|text| parse_rect(&text))
        .transpose()
        .context("invalid <membership>")?;
    let doorway = child(node, "doorway")
        .map(|door| -> Result<Doorway> {
            let wall_name = door
                .attribute("wall")
                .ok_or_else(|| anyhow!("<doorway> needs a wall attribute"))?;
            let wall = Wall::from_name(wall_name)
                .ok_or_else(|| anyhow!("unknown doorway wall `{wall_name}`"))?;
            let [min, max] = parse_floats::<2>(door.text().unwrap_or_default())?;
            Ok(Doorway::new(wall, min, max))
        })
        .transpose()
        .context("invalid <doorway>")?;
    Ok(RoomConfig {
        name,
        bounds,
        membership,
        doorway,
    })
}

fn child<'a, 'input>(node: &Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn required_text(node: &Node<'_, '_>, tag: &str) -> Result<String> {
    optional_text(node, tag).ok_or_else(|| anyhow!("<{tag}> tag is missing"))
}

fn optional_text(node: &Node<'_, '_>, tag: &str) -> Option<String> {
    child(node, tag)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn parse_floats<const N: usize>(value: &str) -> Result<[f32; N]> {
    let numbers = value
        .split_whitespace()
        .map(|part| {
            part.parse::<f32>()
                .map_err(|err| anyhow!("`{part}` is not a number: {err}"))
        })
        .collect::<Result<Vec<_>>>()?;
    <[f32; N]>::try_from(numbers.as_slice())
        .map_err(|_| anyhow!("expected {N} numbers, found {}", numbers.len()))
}

/// `minX maxX minZ maxZ`
fn parse_rect(value: &str) -> Result<Rect> {
    let [min_x, max_x, min_z, max_z] = parse_floats::<4>(value)?;
    Ok(Rect::new(min_x, max_x, min_z, max_z))
}

fn parse_vec3(value: &str) -> Result<Vec3> {
    Ok(Vec3::from_array(parse_floats::<3>(value)?))
}

fn parse_f32(value: Option<String>, default: f32) -> Result<f32> {
    match value {
        Some(value) => value
            .parse::<f32>()
            .map_err(|err| anyhow!("failed to parse float `{value}`: {err}")),
        None => Ok(default),
    }
}

fn parse_millis(value: Option<String>, default: Duration) -> Result<Duration> {
    let Some(value) = value else {
        return Ok(default);
    };
    let millis = value
        .parse::<f64>()
        .map_err(|err| anyhow!("failed to parse milliseconds `{value}`: {err}"))?;
    if !millis.is_finite() || millis < 0.0 {
        return Err(anyhow!("invalid duration `{value}`"));
    }
    Ok(Duration::from_nanos((millis * 1_000_000.0).round() as u64))
}
