use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use gloo_events::{EventListener, EventListenerOptions};
use wasm_bindgen::JsCast;
use web_sys::{window, Element, KeyboardEvent, MouseEvent};

use super::{InputEvent, KeyCode, NamedKey};

/// Events collected from the DOM, drained once per animation frame.
pub type EventQueue = Rc<RefCell<VecDeque<InputEvent>>>;

/// Keeps DOM listeners registered for as long as it lives.
pub struct WasmInputHandler {
    listeners: Vec<EventListener>,
}

impl WasmInputHandler {
    /// Keys are read from the whole document; clicks from `element` only.
    pub fn attach(element: &Element, queue: EventQueue) -> Result<Self> {
        let document = window()
            .and_then(|w| w.document())
            .ok_or_else(|| anyhow!("document not available"))?;

        let mut listeners = Vec::new();

        // Key listeners are not passive so game keys don't scroll the page.
        {
            let keys = Rc::clone(&queue);
            listeners.push(EventListener::new_with_options(
                &document,
                "keydown",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                        return;
                    };
                    if let Some(code) = map_key(event) {
                        event.prevent_default();
                        if !event.repeat() {
                            keys.borrow_mut().push_back(InputEvent::KeyDown(code));
                        }
                    }
                },
            ));
        }

        {
            let keys = Rc::clone(&queue);
            listeners.push(EventListener::new_with_options(
                &document,
                "keyup",
                EventListenerOptions::enable_prevent_default(),
                move |event| {
                    let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                        return;
                    };
                    if let Some(code) = map_key(event) {
                        event.prevent_default();
                        keys.borrow_mut().push_back(InputEvent::KeyUp(code));
                    }
                },
            ));
        }

        {
            let clicks = Rc::clone(&queue);
            listeners.push(EventListener::new(element, "mousedown", move |event| {
                if event.dyn_ref::<MouseEvent>().map_or(false, |e| e.button() == 0) {
                    clicks.borrow_mut().push_back(InputEvent::Trigger);
                }
            }));
        }

        {
            let moves = Rc::clone(&queue);
            listeners.push(EventListener::new(&document, "mousemove", move |event| {
                if let Some(event) = event.dyn_ref::<MouseEvent>() {
                    moves.borrow_mut().push_back(InputEvent::Look {
                        dx: event.movement_x() as f32,
                        dy: event.movement_y() as f32,
                    });
                }
            }));
        }

        Ok(Self { listeners })
    }
}

fn map_key(event: &KeyboardEvent) -> Option<KeyCode> {
    match event.key().as_str() {
        "Escape" => Some(KeyCode::Named(NamedKey::Escape)),
        _ => KeyCode::from_name(&event.code()),
    }
}
