#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, Element};

use crate::assets::{parse_mesh, AssetError};
use crate::capture::CaptureMode;
use crate::hud::{banner_text, HudSurface};
use crate::input::wasm::{EventQueue, WasmInputHandler};
use crate::session::Phase;
use crate::{GameState, WorldConfig};

#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = wasm_logger::init(wasm_logger::Config::default());
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn download_error(name: &str, reason: String) -> AssetError {
    AssetError::Download {
        name: name.to_string(),
        message: reason,
    }
}

#[wasm_bindgen]
pub struct WasmGame {
    inner: Rc<RefCell<AppState>>,
}

#[wasm_bindgen]
impl WasmGame {
    /// `element_id` names the element that receives clicks and pointer lock.
    /// `world_xml` overrides the built-in two-room world.
    #[wasm_bindgen(constructor)]
    pub fn new(element_id: String, world_xml: Option<String>) -> Result<WasmGame, JsValue> {
        let config = match world_xml {
            Some(xml) => WorldConfig::from_xml(&xml).map_err(|err| js_error(format!("{err:#}")))?,
            None => WorldConfig::default(),
        };
        let document = document().map_err(js_error)?;
        let element = document
            .get_element_by_id(&element_id)
            .ok_or_else(|| js_error(format!("element #{element_id} not found")))?;

        let game = GameState::new(
            config,
            Box::new(PointerLock::new(document.clone(), element.clone())),
            Box::new(DomHud::new(&document)),
        )
        .map_err(js_error)?;

        let queue: EventQueue = Rc::new(RefCell::new(VecDeque::new()));
        let input_handler =
            WasmInputHandler::attach(&element, Rc::clone(&queue)).map_err(js_error)?;

        Ok(Self {
            inner: Rc::new(RefCell::new(AppState {
                game,
                queue,
                _input_handler: input_handler,
                animation_closure: None,
            })),
        })
    }

    /// Hands over the fetched room model.
    pub fn world_loaded(&self, obj_text: String) {
        let result = parse_mesh("room", &obj_text);
        self.inner.borrow_mut().game.on_world_loaded(result);
    }

    /// Reports that the room model could not be fetched.
    pub fn world_failed(&self, reason: String) {
        self.inner
            .borrow_mut()
            .game
            .on_world_loaded(Err(download_error("room", reason)));
    }

    /// Hands over the fetched target model; `None` stands a box in for it.
    pub fn target_loaded(&self, obj_text: Option<String>) {
        let result = obj_text
            .map(|text| parse_mesh("target", &text))
            .transpose();
        self.inner
            .borrow_mut()
            .game
            .on_target_loaded(result, &mut rand::thread_rng());
    }

    /// Reports that the target model could not be fetched.
    pub fn target_failed(&self, reason: String) {
        self.inner
            .borrow_mut()
            .game
            .on_target_loaded(Err(download_error("target", reason)), &mut rand::thread_rng());
    }

    pub fn start(&self) -> Result<(), JsValue> {
        schedule_animation_loop(Rc::clone(&self.inner)).map_err(js_error)
    }

    pub fn phase(&self) -> String {
        format!("{:?}", self.inner.borrow().game.phase())
    }
}

struct AppState {
    game: GameState,
    queue: EventQueue,
    _input_handler: WasmInputHandler,
    animation_closure: Option<Closure<dyn FnMut()>>,
}

impl AppState {
    fn step(&mut self, now: Duration) {
        let events: Vec<_> = self.queue.borrow_mut().drain(..).collect();
        for event in events {
            self.game.handle_input(event, now);
        }
        self.game.poll_countdown(now);
        self.game.frame(now);
    }
}

fn now() -> Duration {
    let millis = window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_default();
    Duration::from_secs_f64(millis.max(0.0) / 1000.0)
}

fn schedule_animation_loop(app: Rc<RefCell<AppState>>) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let mut state = app.borrow_mut();
    let app_clone = Rc::clone(&app);

    let closure = Closure::wrap(Box::new(move || {
        app_clone.borrow_mut().step(now());
        if let Err(err) = schedule_animation_loop(Rc::clone(&app_clone)) {
            web_sys::console::error_1(&JsValue::from_str(&err.to_string()));
        }
    }) as Box<dyn FnMut()>);

    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;

    state.animation_closure = Some(closure);
    Ok(())
}

fn document() -> Result<Document> {
    window()
        .and_then(|w| w.document())
        .ok_or_else(|| anyhow!("document not available"))
}

/// Browser pointer lock on the game element.
struct PointerLock {
    document: Document,
    element: Element,
}

impl PointerLock {
    fn new(document: Document, element: Element) -> Self {
        Self { document, element }
    }
}

impl CaptureMode for PointerLock {
    fn acquire(&mut self) {
        self.element.request_pointer_lock();
    }

    fn release(&mut self) {
        if self.is_active() {
            self.document.exit_pointer_lock();
        }
    }

    fn is_active(&self) -> bool {
        self.document
            .pointer_lock_element()
            .map_or(false, |locked| locked == self.element)
    }
}

/// Writes HUD text into the `countdown`, `banner` and `status` elements when present.
struct DomHud {
    countdown: Option<Element>,
    banner: Option<Element>,
    status: Option<Element>,
}

impl DomHud {
    fn new(document: &Document) -> Self {
        Self {
            countdown: document.get_element_by_id("countdown"),
            banner: document.get_element_by_id("banner"),
            status: document.get_element_by_id("status"),
        }
    }
}

fn set_text(element: &Option<Element>, text: &str) {
    if let Some(element) = element {
        element.set_text_content(Some(text));
    }
}

impl HudSurface for DomHud {
    fn show_countdown(&mut self, text: &str) {
        set_text(&self.countdown, text);
    }

    fn show_phase(&mut self, phase: Phase) {
        if let Some(banner) = banner_text(phase) {
            set_text(&self.banner, banner);
        }
        if phase == Phase::Running {
            set_text(&self.status, "");
        }
    }

    fn show_status(&mut self, message: &str) {
        set_text(&self.status, message);
    }
}
