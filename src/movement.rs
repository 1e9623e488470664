//! First-person movement: damped velocity, diagonal normalisation and
//! position rollback when a step would enter a wall.

use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_2};

use glam::{Vec2, Vec3};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::collision::RoomLayout;

/// Directional keys held during one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveInput {
    pub fn is_idle(&self) -> bool {
        !(self.forward || self.backward || self.left || self.right)
    }

    /// `1` forward, `-1` backward, `0` when neither or both are held.
    pub fn forward_axis(&self) -> i8 {
        i8::from(self.forward) - i8::from(self.backward)
    }

    /// `1` right, `-1` left, `0` when neither or both are held.
    pub fn right_axis(&self) -> i8 {
        i8::from(self.right) - i8::from(self.left)
    }
}

/// Tuning values for walking and looking around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Acceleration applied per second of held input.
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Fraction of velocity removed per second while input is held.
    #[serde(default = "default_damping")]
    pub damping: f32,
    /// Eye height above the floor when standing. Crouching halves it.
    #[serde(default = "default_eye_height")]
    pub eye_height: f32,
    /// Radians of rotation per pixel of pointer movement.
    #[serde(default = "default_look_sensitivity")]
    pub look_sensitivity: f32,
    #[serde(default = "default_max_pitch")]
    pub max_pitch: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: default_move_speed(),
            damping: default_damping(),
            eye_height: default_eye_height(),
            look_sensitivity: default_look_sensitivity(),
            max_pitch: default_max_pitch(),
        }
    }
}

fn default_move_speed() -> f32 {
    50.0
}

fn default_damping() -> f32 {
    10.0
}

fn default_eye_height() -> f32 {
    2.0
}

fn default_look_sensitivity() -> f32 {
    0.002
}

fn default_max_pitch() -> f32 {
    FRAC_PI_2
}

/// View orientation. Zero yaw looks down negative Z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewAngles {
    pub yaw: f32,
    pub pitch: f32,
}

impl ViewAngles {
    /// Angles that look along `direction`. A zero vector gives the default view.
    pub fn facing(direction: Vec3) -> Self {
        let Some(dir) = direction.try_normalize() else {
            return Self::default();
        };
        Self {
            yaw: (-dir.x).atan2(-dir.z),
            pitch: dir.y.clamp(-1.0, 1.0).asin(),
        }
    }

    /// Horizontal forward axis used for walking.
    pub fn forward(&self) -> Vec3 {
        Vec3::new(-self.yaw.sin(), 0.0, -self.yaw.cos())
    }

    /// Horizontal right axis used for strafing.
    pub fn right(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, -self.yaw.sin())
    }

    /// Full look direction including pitch, unit length.
    pub fn direction(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        Vec3::new(
            -self.yaw.sin() * cos_pitch,
            sin_pitch,
            -self.yaw.cos() * cos_pitch,
        )
    }

    /// Applies a pointer delta in pixels.
    pub fn apply_pointer_delta(&mut self, dx: f32, dy: f32, config: &MovementConfig) {
        if !dx.is_finite() || !dy.is_finite() {
            return;
        }
        self.yaw -= dx * config.look_sensitivity;
        self.pitch = (self.pitch - dy * config.look_sensitivity)
            .clamp(-config.max_pitch, config.max_pitch);
    }
}

/// Player viewpoint state owned by the movement integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub position: Vec3,
    /// Velocity in the view frame: `x` strafes right, `y` walks forward.
    pub velocity: Vec2,
    pub crouching: bool,
    pub floor_height: f32,
    pub view: ViewAngles,
}

impl PlayerState {
    /// Places a standing player at `(x, z)` on a floor at `floor_height`.
    pub fn spawn(x: f32, z: f32, floor_height: f32, config: &MovementConfig) -> Self {
        let mut player = Self {
            position: Vec3::new(x, 0.0, z),
            velocity: Vec2::ZERO,
            crouching: false,
            floor_height,
            view: ViewAngles::default(),
        };
        player.update_height(config);
        player
    }

    pub fn eye_offset(&self, config: &MovementConfig) -> f32 {
        if self.crouching {
            config.eye_height * 0.5
        } else {
            config.eye_height
        }
    }

    /// Height is always derived from the floor and crouch state, never integrated.
    pub fn update_height(&mut self, config: &MovementConfig) {
        self.position.y = self.floor_height + self.eye_offset(config);
    }
}

/// What happened to the player during one integration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Idle,
    Moved,
    Blocked,
}

/// Advances the player by one frame of held input.
pub fn integrate(
    player: &mut PlayerState,
    input: MoveInput,
    dt: f32,
    config: &MovementConfig,
    layout: &RoomLayout,
) -> MoveOutcome {
    if input.is_idle() {
        player.velocity = Vec2::ZERO;
        player.update_height(config);
        return MoveOutcome::Idle;
    }

    let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
    let damping = (config.damping * dt).clamp(0.0, 1.0);
    player.velocity -= player.velocity * damping;

    let forward = f32::from(input.forward_axis());
    let right = f32::from(input.right_axis());
    let scale = if forward != 0.0 && right != 0.0 {
        FRAC_1_SQRT_2
    } else {
        1.0
    };
    player.velocity += Vec2::new(right, forward) * (scale * config.move_speed * dt);

    let (prev_x, prev_z) = (player.position.x, player.position.z);
    let step = player.view.right() * (player.velocity.x * dt)
        + player.view.forward() * (player.velocity.y * dt);
    player.position.x += step.x;
    player.position.z += step.z;

    let outcome = if layout.is_blocked(player.position.x, player.position.z) {
        debug!(
            "move to ({:.2}, {:.2}) rejected",
            player.position.x, player.position.z
        );
        player.position.x = prev_x;
        player.position.z = prev_z;
        MoveOutcome::Blocked
    } else {
        MoveOutcome::Moved
    };

    player.update_height(config);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::WorldConfig;

    fn setup() -> (PlayerState, MovementConfig, RoomLayout) {
        let config = MovementConfig::default();
        let player = PlayerState::spawn(0.0, 0.0, 0.0, &config);
        let layout = WorldConfig::default().build_layout().unwrap();
        (player, config, layout)
    }

    fn displacement(input: MoveInput) -> f32 {
        let (mut player, config, layout) = setup();
        let start = player.position;
        integrate(&mut player, input, 0.016, &config, &layout);
        let delta = player.position - start;
        Vec2::new(delta.x, delta.z).length()
    }

    #[test]
    fn idle_input_zeroes_velocity_and_sets_height() {
        let (mut player, config, layout) = setup();
        player.velocity = Vec2::new(3.0, -2.0);
        player.crouching = true;
        let outcome = integrate(&mut player, MoveInput::default(), 0.1, &config, &layout);
        assert_eq!(outcome, MoveOutcome::Idle);
        assert_eq!(player.velocity, Vec2::ZERO);
        assert_eq!(player.position.y, 1.0);

        player.crouching = false;
        integrate(&mut player, MoveInput::default(), 0.1, &config, &layout);
        assert_eq!(player.position.y, 2.0);
    }

    #[test]
    fn diagonal_speed_matches_straight_speed() {
        let straight = displacement(MoveInput {
            forward: true,
            ..MoveInput::default()
        });
        let diagonal = displacement(MoveInput {
            forward: true,
            right: true,
            ..MoveInput::default()
        });
        assert!(straight > 0.0);
        assert!((straight - diagonal).abs() < 1e-5, "{straight} vs {diagonal}");
    }

    #[test]
    fn opposing_keys_cancel() {
        let moved = displacement(MoveInput {
            forward: true,
            backward: true,
            ..MoveInput::default()
        });
        assert_eq!(moved, 0.0);
    }

    #[test]
    fn forward_follows_view_yaw() {
        let (mut player, config, layout) = setup();
        integrate(
            &mut player,
            MoveInput {
                forward: true,
                ..MoveInput::default()
            },
            0.05,
            &config,
            &layout,
        );
        assert!(player.position.z < 0.0);
        assert!(player.position.x.abs() < 1e-6);

        let (mut player, _, _) = setup();
        player.view.yaw = -FRAC_PI_2;
        integrate(
            &mut player,
            MoveInput {
                forward: true,
                ..MoveInput::default()
            },
            0.05,
            &config,
            &layout,
        );
        assert!(player.position.x > 0.0);
    }

    #[test]
    fn blocked_move_restores_position_and_keeps_velocity() {
        let (mut player, config, layout) = setup();
        player.position.x = 5.4;
        player.view.yaw = -FRAC_PI_2;
        let outcome = integrate(
            &mut player,
            MoveInput {
                forward: true,
                ..MoveInput::default()
            },
            0.05,
            &config,
            &layout,
        );
        assert_eq!(outcome, MoveOutcome::Blocked);
        assert_eq!(player.position.x, 5.4);
        assert_eq!(player.position.z, 0.0);
        assert!(player.velocity.y > 0.0);
    }

    #[test]
    fn velocity_is_damped_while_moving() {
        let (mut player, config, layout) = setup();
        player.velocity = Vec2::new(0.0, 10.0);
        let input = MoveInput {
            backward: true,
            ..MoveInput::default()
        };
        integrate(&mut player, input, 0.01, &config, &layout);
        // 10 * (1 - 0.1) - 50 * 0.01
        assert!((player.velocity.y - 8.5).abs() < 1e-4);
    }

    #[test]
    fn invalid_dt_does_not_move_or_poison_state() {
        let (mut player, config, layout) = setup();
        let input = MoveInput {
            left: true,
            ..MoveInput::default()
        };
        integrate(&mut player, input, f32::NAN, &config, &layout);
        assert!(player.position.is_finite());
        assert_eq!(player.position.x, 0.0);
        integrate(&mut player, input, -1.0, &config, &layout);
        assert_eq!(player.velocity, Vec2::ZERO);
    }

    #[test]
    fn facing_round_trips_direction() {
        let dir = Vec3::new(-1.77, 0.03, 0.46).normalize();
        let view = ViewAngles::facing(dir);
        assert!(view.direction().abs_diff_eq(dir, 1e-5));
        assert_eq!(ViewAngles::facing(Vec3::ZERO), ViewAngles::default());
    }

    #[test]
    fn pitch_is_clamped() {
        let config = MovementConfig::default();
        let mut view = ViewAngles::default();
        view.apply_pointer_delta(0.0, -10_000.0, &config);
        assert_eq!(view.pitch, FRAC_PI_2);
        view.apply_pointer_delta(100.0, 0.0, &config);
        assert!((view.yaw + 0.2).abs() < 1e-6);
    }
}
