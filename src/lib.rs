//! Core of a first-person "find the hidden object" game.
//!
//! The crate holds the rules and state of a timed search session: room
//! boundaries with doorways, wall collision, damped first-person movement,
//! the countdown, ray picking against the hidden object and the frame
//! pacing that drives them. Rendering is left to the embedding platform, so
//! everything here runs the same in headless tools, tests and the browser.

pub mod assets;
pub mod boundary;
pub mod capture;
pub mod collision;
pub mod frame;
pub mod game;
pub mod hud;
pub mod input;
pub mod movement;
pub mod obj;
pub mod pick;
pub mod replay;
pub mod session;
#[cfg(target_arch = "wasm32")]
pub mod wasm;
pub mod world;

pub use assets::{load_mesh_file, parse_mesh, AssetError, PendingAsset};
pub use boundary::{room_contains, BoundaryError, Doorway, Rect, RoomBoundary, Wall};
pub use capture::{CaptureMode, SoftCapture};
pub use collision::RoomLayout;
pub use frame::{FrameConfig, FrameLimiter, Interval};
pub use game::{GameState, TriggerOutcome};
pub use hud::{format_clock, HudSurface, HudText, SharedHud};
pub use input::{Action, InputEvent, InputState, KeyBindings, KeyCode, NamedKey};
pub use movement::{integrate, MoveInput, MoveOutcome, MovementConfig, PlayerState, ViewAngles};
pub use obj::{load_obj_from_str, TriangleMesh};
pub use pick::{try_pick, BoundingBox, HitGeometry, Ray, TargetObject};
pub use replay::{ReplayOptions, ReplayReport, Script};
pub use session::{Phase, SessionEvent, SessionTimer};
pub use world::{RoomConfig, WorldConfig};
