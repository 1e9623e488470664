//! The game aggregate: one owner for the room layout, player, session and
//! target, with entry points for input events, frames and countdown ticks.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use log::{debug, info, warn};
use rand::Rng;

use crate::assets::AssetError;
use crate::boundary::BoundaryError;
use crate::capture::CaptureMode;
use crate::collision::RoomLayout;
use crate::frame::{FrameLimiter, Interval};
use crate::hud::{format_clock, HudSurface};
use crate::input::{Action, InputEvent, InputState, KeyBindings};
use crate::movement::{integrate, MoveOutcome, PlayerState};
use crate::obj::TriangleMesh;
use crate::pick::{try_pick, TargetObject};
use crate::session::{Phase, SessionEvent, SessionTimer};
use crate::world::WorldConfig;

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// What a click or tap did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Ignored,
    /// Left the intro and started the countdown.
    Engaged,
    /// Re-acquired capture without picking.
    Captured,
    Hit,
    Miss,
}

pub struct GameState {
    config: WorldConfig,
    layout: RoomLayout,
    player: PlayerState,
    session: SessionTimer,
    target: Option<TargetObject>,
    input: Arc<InputState>,
    bindings: KeyBindings,
    capture: Box<dyn CaptureMode>,
    hud: Box<dyn HudSurface>,
    limiter: FrameLimiter,
    countdown: Interval,
}

impl GameState {
    /// Validates the world configuration and sets up a session waiting for assets.
    pub fn new(
        config: WorldConfig,
        capture: Box<dyn CaptureMode>,
        hud: Box<dyn HudSurface>,
    ) -> Result<Self, BoundaryError> {
        let layout = config.build_layout()?;
        let player = PlayerState::spawn(0.0, 0.0, 0.0, &config.movement);
        let session = SessionTimer::new(config.session_duration());
        let limiter = FrameLimiter::new(config.frame.clone());
        Ok(Self {
            config,
            layout,
            player,
            session,
            target: None,
            input: Arc::new(InputState::new()),
            bindings: KeyBindings::default(),
            capture,
            hud,
            limiter,
            countdown: Interval::new(COUNTDOWN_PERIOD),
        })
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn layout(&self) -> &RoomLayout {
        &self.layout
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut PlayerState {
        &mut self.player
    }

    pub fn session(&self) -> &SessionTimer {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn target(&self) -> Option<&TargetObject> {
        self.target.as_ref()
    }

    /// Shared key state, for platform listeners that write it directly.
    pub fn input(&self) -> Arc<InputState> {
        Arc::clone(&self.input)
    }

    pub fn capture(&self) -> &dyn CaptureMode {
        self.capture.as_ref()
    }

    pub fn remaining(&self, now: Duration) -> u64 {
        self.session.remaining(now)
    }

    /// Room geometry finished loading (or failed to).
    ///
    /// The floor sits at the mesh's bounding-box centre and the player spawns
    /// at its x/z, clamped to the spawn limit.
    pub fn on_world_loaded(&mut self, result: Result<TriangleMesh, AssetError>) {
        let mesh = match result {
            Ok(mesh) => mesh,
            Err(err) => {
                warn!("world failed to load: {err}");
                self.hud.show_status(&format!("Failed to load world: {err}"));
                return;
            }
        };
        if self.session.phase() != Phase::NotStarted {
            debug!("ignoring repeated world load");
            return;
        }
        let center = mesh
            .center()
            .filter(|center| center.is_finite())
            .unwrap_or(Vec3::ZERO);
        let limit = self.config.spawn_limit;
        self.player = PlayerState::spawn(
            center.x.clamp(-limit, limit),
            center.z.clamp(-limit, limit),
            center.y,
            &self.config.movement,
        );
        info!(
            "world ready ({} triangles), spawning at ({:.2}, {:.2}, {:.2})",
            mesh.triangle_count(),
            self.player.position.x,
            self.player.position.y,
            self.player.position.z
        );
        if let Some(event) = self.session.assets_ready() {
            self.apply_session_event(event, Duration::ZERO);
        }
    }

    /// Target model finished loading; it is placed at a random candidate spot.
    /// `Ok(None)` means there is no model and a box stands in for it.
    pub fn on_target_loaded<R: Rng>(
        &mut self,
        result: Result<Option<TriangleMesh>, AssetError>,
        rng: &mut R,
    ) {
        match result {
            Ok(mesh) => {
                let count = self.config.target_candidates.len();
                if count == 0 {
                    warn!("no target candidate positions configured");
                    return;
                }
                self.place_target(mesh.as_ref(), rng.gen_range(0..count));
            }
            Err(err) => {
                warn!("target failed to load: {err}");
                self.hud.show_status(&format!("Failed to load target: {err}"));
            }
        }
    }

    /// Places the target at candidate `index`. A placed target is never moved.
    pub fn place_target(&mut self, mesh: Option<&TriangleMesh>, index: usize) -> bool {
        if self.target.is_some() {
            debug!("target already placed");
            return false;
        }
        let Some(&position) = self.config.target_candidates.get(index) else {
            warn!("target candidate {index} does not exist");
            return false;
        };
        let scale = self.config.target_scale;
        self.target = Some(match mesh {
            Some(mesh) => TargetObject::from_mesh(mesh, position, scale),
            None => TargetObject::boxed(position, scale),
        });
        info!(
            "target placed at candidate {index} ({:.2}, {:.2}, {:.2})",
            position.x, position.y, position.z
        );
        true
    }

    /// Routes one discrete input event. Returns the trigger outcome for clicks.
    pub fn handle_input(&mut self, event: InputEvent, now: Duration) -> Option<TriggerOutcome> {
        match event {
            InputEvent::KeyDown(key) => {
                self.input.set_key_down(key);
                match self.bindings.action(key) {
                    Some(Action::Crouch) => self.player.crouching = true,
                    Some(Action::Cancel) => self.capture.release(),
                    _ => {}
                }
                None
            }
            InputEvent::KeyUp(key) => {
                self.input.set_key_up(key);
                if self.bindings.action(key) == Some(Action::Crouch) {
                    self.player.crouching = false;
                }
                None
            }
            InputEvent::Look { dx, dy } => {
                if self.capture.is_active() {
                    self.player
                        .view
                        .apply_pointer_delta(dx, dy, &self.config.movement);
                }
                None
            }
            InputEvent::Trigger => Some(self.trigger(now)),
        }
    }

    /// A click means "engage" during the intro, "capture" while running
    /// without capture, and "pick" while running with capture.
    pub fn trigger(&mut self, now: Duration) -> TriggerOutcome {
        match self.session.phase() {
            Phase::NotStarted | Phase::Succeeded | Phase::Failed => TriggerOutcome::Ignored,
            Phase::Intro => {
                if let Some(event) = self.session.engage(now) {
                    self.apply_session_event(event, now);
                }
                self.capture.acquire();
                TriggerOutcome::Engaged
            }
            Phase::Running if !self.capture.is_active() => {
                self.capture.acquire();
                TriggerOutcome::Captured
            }
            Phase::Running => self.pick(now),
        }
    }

    fn pick(&mut self, now: Duration) -> TriggerOutcome {
        let Some(target) = self.target.as_mut() else {
            debug!("click with no target placed");
            return TriggerOutcome::Ignored;
        };
        if !try_pick(self.player.position, self.player.view.direction(), target) {
            return TriggerOutcome::Miss;
        }
        target.mark_located();
        if let Some(event) = self.session.succeed(now) {
            self.apply_session_event(event, now);
        }
        TriggerOutcome::Hit
    }

    /// One rendered frame. Returns `None` when the frame was dropped or
    /// movement is suspended.
    pub fn frame(&mut self, now: Duration) -> Option<MoveOutcome> {
        let dt = self.limiter.admit(now)?;
        if !self.capture.is_active() || self.session.phase().is_terminal() {
            return None;
        }
        let input = self.input.move_input(&self.bindings);
        Some(integrate(
            &mut self.player,
            input,
            dt,
            &self.config.movement,
            &self.layout,
        ))
    }

    /// The 1 Hz countdown callback.
    pub fn tick(&mut self, now: Duration) -> Option<SessionEvent> {
        let event = self.session.tick(now)?;
        self.apply_session_event(event, now);
        Some(event)
    }

    /// Fires [`GameState::tick`] when a countdown period has passed.
    pub fn poll_countdown(&mut self, now: Duration) -> Option<SessionEvent> {
        if self.countdown.poll(now) {
            self.tick(now)
        } else {
            None
        }
    }

    fn apply_session_event(&mut self, event: SessionEvent, now: Duration) {
        match event {
            SessionEvent::Intro => {
                self.hud.show_phase(Phase::Intro);
                self.hud.show_status("Click to start");
            }
            SessionEvent::Started => {
                self.countdown.arm(now);
                self.hud.show_phase(Phase::Running);
                self.hud
                    .show_countdown(&format_clock(self.session.remaining(now)));
            }
            SessionEvent::Countdown { remaining } => {
                self.hud.show_countdown(&format_clock(remaining));
            }
            SessionEvent::Succeeded { elapsed } => {
                self.finish(Phase::Succeeded);
                self.hud.show_status(&format!(
                    "Found it in {}",
                    format_clock(elapsed.as_secs())
                ));
            }
            SessionEvent::Failed => {
                self.finish(Phase::Failed);
                self.hud.show_countdown(&format_clock(0));
            }
        }
    }

    fn finish(&mut self, phase: Phase) {
        self.countdown.disarm();
        self.capture.release();
        self.input.clear();
        self.hud.show_phase(phase);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    use rand::rngs::mock::StepRng;

    use crate::capture::SoftCapture;
    use crate::hud::SharedHud;
    use crate::input::KeyCode;
    use crate::movement::ViewAngles;

    fn secs(value: f32) -> Duration {
        Duration::from_secs_f32(value)
    }

    fn room_mesh() -> TriangleMesh {
        TriangleMesh::unit_cube().placed(Vec3::ZERO, 10.0)
    }

    fn game() -> (GameState, SharedHud) {
        let hud = SharedHud::new();
        let game = GameState::new(
            WorldConfig::default(),
            Box::new(SoftCapture::new()),
            Box::new(hud.clone()),
        )
        .unwrap();
        (game, hud)
    }

    fn running_game() -> (GameState, SharedHud) {
        let (mut game, hud) = game();
        game.on_world_loaded(Ok(room_mesh()));
        assert_eq!(game.trigger(secs(1.0)), TriggerOutcome::Engaged);
        (game, hud)
    }

    fn hold(game: &mut GameState, key: char, now: Duration) {
        game.handle_input(InputEvent::KeyDown(KeyCode::Character(key)), now);
    }

    #[test]
    fn world_load_spawns_player_and_enters_intro() {
        let (mut game, hud) = game();
        assert_eq!(game.trigger(Duration::ZERO), TriggerOutcome::Ignored);
        game.on_world_loaded(Ok(room_mesh()));
        assert_eq!(game.phase(), Phase::Intro);
        assert_eq!(game.player().position, Vec3::new(0.0, 2.0, 0.0));
        assert_eq!(hud.snapshot().phase, Some(Phase::Intro));
    }

    #[test]
    fn spawn_is_clamped_into_the_first_room() {
        let (mut game, _) = game();
        game.on_world_loaded(Ok(TriangleMesh::unit_cube().placed(Vec3::new(9.0, 1.0, -7.0), 1.0)));
        let position = game.player().position;
        assert_eq!((position.x, position.y, position.z), (4.0, 3.0, -4.0));
    }

    #[test]
    fn unusable_tuning_is_rejected_before_play() {
        for xml in [
            "<world><spawnLimit>-1</spawnLimit></world>",
            "<world><spawnLimit>NaN</spawnLimit></world>",
            "<world><movement><damping>NaN</damping></movement></world>",
            "<world><movement><speed>-50</speed></movement></world>",
        ] {
            let config = WorldConfig::from_xml(xml).unwrap();
            let result = GameState::new(
                config,
                Box::new(SoftCapture::new()),
                Box::new(SharedHud::new()),
            );
            assert!(
                matches!(result, Err(BoundaryError::InvalidSetting { .. })),
                "{xml} was accepted"
            );
        }
    }

    #[test]
    fn non_finite_room_model_spawns_at_origin() {
        let (mut game, _) = game();
        let mesh = TriangleMesh {
            positions: vec![
                Vec3::new(f32::NAN, 0.0, 0.0),
                Vec3::new(f32::NAN, 1.0, 0.0),
                Vec3::new(f32::NAN, 0.0, 1.0),
            ],
            indices: vec![0, 1, 2],
        };
        game.on_world_loaded(Ok(mesh));
        assert_eq!(game.player().position, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn failed_world_load_keeps_session_waiting() {
        let (mut game, hud) = game();
        game.on_world_loaded(Err(AssetError::Abandoned {
            name: "room".into(),
        }));
        assert_eq!(game.phase(), Phase::NotStarted);
        assert_eq!(game.trigger(Duration::ZERO), TriggerOutcome::Ignored);
        assert!(hud.snapshot().status.unwrap().contains("Failed to load world"));
        assert_eq!(game.frame(Duration::ZERO), None);
    }

    #[test]
    fn failed_download_is_reported_as_such() {
        let (mut game, hud) = game();
        game.on_world_loaded(Err(AssetError::Download {
            name: "room".into(),
            message: "HTTP 404".into(),
        }));
        assert_eq!(game.phase(), Phase::NotStarted);
        assert_eq!(
            hud.snapshot().status.as_deref(),
            Some("Failed to load world: failed to download room: HTTP 404")
        );

        game.on_target_loaded(
            Err(AssetError::Download {
                name: "target".into(),
                message: "network error".into(),
            }),
            &mut StepRng::new(0, 0),
        );
        assert!(game.target().is_none());
        assert_eq!(
            hud.snapshot().status.as_deref(),
            Some("Failed to load target: failed to download target: network error")
        );
    }

    #[test]
    fn engage_starts_countdown_and_captures() {
        let (game, hud) = running_game();
        assert_eq!(game.phase(), Phase::Running);
        assert!(game.capture().is_active());
        assert_eq!(game.session().started_at(), Some(secs(1.0)));
        assert_eq!(hud.snapshot().countdown.as_deref(), Some("1:00"));
    }

    #[test]
    fn movement_is_suspended_without_capture() {
        let (mut game, _) = running_game();
        hold(&mut game, 'W', secs(1.0));
        game.handle_input(
            InputEvent::KeyDown(KeyCode::Named(crate::input::NamedKey::Escape)),
            secs(1.0),
        );
        assert!(!game.capture().is_active());
        assert_eq!(game.frame(secs(1.1)), None);
        assert_eq!(game.player().position.z, 0.0);

        assert_eq!(game.trigger(secs(1.2)), TriggerOutcome::Captured);
        assert_eq!(game.frame(secs(1.3)), Some(MoveOutcome::Moved));
        assert!(game.player().position.z < 0.0);
    }

    #[test]
    fn crouch_key_lowers_the_view() {
        let (mut game, _) = running_game();
        hold(&mut game, 'C', secs(1.0));
        game.frame(secs(1.1));
        assert_eq!(game.player().position.y, 1.0);
        game.handle_input(InputEvent::KeyUp(KeyCode::Character('C')), secs(1.2));
        game.frame(secs(1.3));
        assert_eq!(game.player().position.y, 2.0);
    }

    #[test]
    fn wall_rejects_move_and_doorway_accepts_it() {
        let (mut game, _) = running_game();
        // Facing +x from near the east wall of room 1.
        game.player_mut().position.x = 5.3;
        game.player_mut().view = ViewAngles::facing(Vec3::X);
        hold(&mut game, 'W', secs(1.0));
        game.frame(secs(1.0));
        assert_eq!(game.frame(secs(1.1)), Some(MoveOutcome::Blocked));
        assert_eq!(game.player().position.x, 5.3);
        assert!(game.layout().is_blocked(6.0, 0.0));

        // Walking north through the doorway.
        game.player_mut().position.x = 3.8;
        game.player_mut().position.z = 5.2;
        game.player_mut().velocity = glam::Vec2::ZERO;
        game.player_mut().view = ViewAngles::facing(Vec3::Z);
        assert_eq!(game.frame(secs(1.2)), Some(MoveOutcome::Moved));
        let position = game.player().position;
        assert!(position.z > 5.37, "moved to {position}");
        assert!(!game.layout().is_blocked(3.8, 5.8));
    }

    #[test]
    fn look_rotates_view_only_while_captured() {
        let (mut game, _) = running_game();
        game.handle_input(InputEvent::Look { dx: -100.0, dy: 0.0 }, secs(1.0));
        assert!((game.player().view.yaw - 0.2).abs() < 1e-6);
        game.capture.release();
        game.handle_input(InputEvent::Look { dx: -100.0, dy: 0.0 }, secs(1.0));
        assert!((game.player().view.yaw - 0.2).abs() < 1e-6);
    }

    #[test]
    fn picking_the_target_succeeds_once() {
        let (mut game, hud) = running_game();
        assert!(game.place_target(Some(&TriangleMesh::unit_cube()), 2));
        let target = game.target().unwrap().position;

        game.player_mut().view = ViewAngles::facing(Vec3::X);
        assert_eq!(game.trigger(secs(3.0)), TriggerOutcome::Miss);
        assert_eq!(game.phase(), Phase::Running);

        let toward = target - game.player().position;
        game.player_mut().view = ViewAngles::facing(toward);
        assert_eq!(game.trigger(secs(13.5)), TriggerOutcome::Hit);
        assert_eq!(game.phase(), Phase::Succeeded);
        assert!(game.target().unwrap().is_located());
        assert!(!game.capture().is_active());

        let snapshot = game.session().clone();
        assert_eq!(game.trigger(secs(14.0)), TriggerOutcome::Ignored);
        assert_eq!(game.tick(secs(80.0)), None);
        assert_eq!(*game.session(), snapshot);

        let text = hud.snapshot();
        assert_eq!(text.banner.as_deref(), Some("SUCCESS!"));
        assert_eq!(text.status.as_deref(), Some("Found it in 0:12"));
    }

    #[test]
    fn target_is_placed_once_from_candidates() {
        let (mut game, _) = running_game();
        let mut rng = StepRng::new(0, 0);
        game.on_target_loaded(Ok(Some(TriangleMesh::unit_cube())), &mut rng);
        let placed = game.target().unwrap().position;
        assert!(game.config().target_candidates.contains(&placed));
        assert!(!game.place_target(Some(&TriangleMesh::unit_cube()), 4));
        assert_eq!(game.target().unwrap().position, placed);
        assert!(!GameState::new(
            WorldConfig::default(),
            Box::new(SoftCapture::new()),
            Box::new(SharedHud::new())
        )
        .unwrap()
        .place_target(None, 99));
    }

    #[test]
    fn missing_target_model_places_a_pickable_box() {
        let (mut game, hud) = running_game();
        game.on_target_loaded(Ok(None), &mut StepRng::new(0, 0));
        let target = game.target().unwrap().position;
        assert!(game.config().target_candidates.contains(&target));

        let toward = target - game.player().position;
        game.player_mut().view = ViewAngles::facing(toward);
        assert_eq!(game.trigger(secs(2.0)), TriggerOutcome::Hit);
        assert_eq!(game.phase(), Phase::Succeeded);
        assert_eq!(hud.snapshot().banner.as_deref(), Some("SUCCESS!"));
    }

    #[test]
    fn countdown_fails_session_and_releases_capture() {
        let (mut game, hud) = running_game();
        hold(&mut game, 'W', secs(1.0));
        let mut fired = 0;
        let mut failures = 0;
        for step in 0..=70 {
            if let Some(event) = game.poll_countdown(secs(1.0 + step as f32)) {
                fired += 1;
                if event == SessionEvent::Failed {
                    failures += 1;
                }
            }
        }
        assert_eq!(failures, 1);
        assert_eq!(fired, 60);
        assert_eq!(game.phase(), Phase::Failed);
        assert!(!game.capture().is_active());
        assert_eq!(game.trigger(secs(75.0)), TriggerOutcome::Ignored);
        assert_eq!(game.frame(secs(76.0)), None);

        let text = hud.snapshot();
        assert_eq!(text.banner.as_deref(), Some("FAILED!"));
        assert_eq!(text.countdown.as_deref(), Some("0:00"));
    }

    #[test]
    fn frames_are_rate_limited() {
        let (mut game, _) = running_game();
        hold(&mut game, 'S', secs(1.0));
        assert!(game.frame(secs(1.0)).is_some());
        assert_eq!(game.frame(secs(1.004)), None);
        assert!(game.frame(secs(1.02)).is_some());
    }

    #[test]
    fn turning_around_walks_backwards_through_the_world() {
        let (mut game, _) = running_game();
        game.player_mut().view.yaw = PI;
        hold(&mut game, 'W', secs(1.0));
        game.frame(secs(1.0));
        game.frame(secs(1.05));
        assert!(game.player().position.z > 0.0);
    }
}
