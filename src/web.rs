//! Browser host for the engine.
//!
//! `start_game()` installs a thread-local [`GameSession`], a keyboard listener
//! and a `requestAnimationFrame` loop. Buttons, taps and tempo inputs on the JS
//! side call the exported control functions below. Every engine notification
//! is re-dispatched on `window` as a `CustomEvent` named `rhythm:<kind>` whose
//! `detail` is the event as JSON (Debug text without the `serde_json` feature).

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CustomEvent, CustomEventInit, KeyboardEvent, Window, window};

use crate::config::{GameConfig, lane_for_key};
use crate::session::{GameEvent, GameSession};

thread_local! {
    static SESSION: RefCell<Option<GameSession>> = const { RefCell::new(None) };
    static HOST_READY: Cell<bool> = const { Cell::new(false) };
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// Boot (or re-boot) the engine. `config_json` may override any config field.
#[wasm_bindgen]
pub fn start_game(config_json: Option<String>) -> Result<(), JsValue> {
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let config = load_config(config_json.as_deref())?;
    let session = GameSession::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
    SESSION.with(|cell| cell.replace(Some(session)));

    if !HOST_READY.with(|r| r.replace(true)) {
        install_keyboard(&win)?;
        start_frame_loop();
        log::info!("rhythm host ready");
    }
    Ok(())
}

fn load_config(json: Option<&str>) -> Result<GameConfig, JsValue> {
    match json {
        #[cfg(feature = "serde_json")]
        Some(text) => GameConfig::from_json(text).map_err(|e| {
            log::warn!("rejected config: {e}");
            JsValue::from_str(&e.to_string())
        }),
        #[cfg(not(feature = "serde_json"))]
        Some(_) => {
            log::warn!("config json ignored: built without serde_json");
            Ok(GameConfig::default())
        }
        None => Ok(GameConfig::default()),
    }
}

// --- Controls ----------------------------------------------------------------

/// Lane press from a tap, click or custom key binding. True on a hit.
#[wasm_bindgen]
pub fn press_lane(lane: u8) -> bool {
    with_session(|s, now| s.on_lane_press(lane, now))
        .flatten()
        .is_some_and(|v| v.is_hit())
}

/// Returns the tempo actually applied (clamped to 40..=300).
#[wasm_bindgen]
pub fn set_bpm(bpm: u32) -> u32 {
    with_session(|s, _| s.set_bpm(bpm)).unwrap_or(0)
}

#[wasm_bindgen]
pub fn start_play() -> bool {
    with_session(|s, now| s.start(now)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn pause_game() -> bool {
    with_session(|s, now| s.pause(now)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn resume_game() -> bool {
    with_session(|s, now| s.resume(now)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn toggle_game() -> bool {
    with_session(|s, now| s.toggle(now)).unwrap_or(false)
}

#[wasm_bindgen]
pub fn reset_game() -> bool {
    with_session(|s, _| s.reset()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn show_help() -> bool {
    with_session(|s, _| s.show_help()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn close_help() -> bool {
    with_session(|s, _| s.close_help()).unwrap_or(false)
}

#[wasm_bindgen]
pub fn game_phase() -> String {
    with_session(|s, _| s.phase().to_string()).unwrap_or_default()
}

/// Current counters as JSON (Debug text without the `serde_json` feature).
#[wasm_bindgen]
pub fn game_stats() -> String {
    with_session(|s, _| {
        let stats = s.stats();
        #[cfg(feature = "serde_json")]
        let text = serde_json::to_string(&stats).unwrap_or_default();
        #[cfg(not(feature = "serde_json"))]
        let text = format!("{stats:?}");
        text
    })
    .unwrap_or_default()
}

// --- Plumbing ----------------------------------------------------------------

fn now_ms() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// Run `f` against the live session, then flush queued notifications. The
/// session borrow is released before dispatch so JS listeners may call back in.
fn with_session<R>(f: impl FnOnce(&mut GameSession, f64) -> R) -> Option<R> {
    let now = now_ms();
    let out = SESSION.with(|cell| cell.borrow_mut().as_mut().map(|s| f(s, now)));
    flush_events();
    out
}

fn flush_events() {
    let events = SESSION
        .with(|cell| cell.borrow_mut().as_mut().map(GameSession::drain_events))
        .unwrap_or_default();
    if events.is_empty() {
        return;
    }
    let Some(win) = window() else {
        return;
    };
    for event in &events {
        if let Err(err) = dispatch(&win, event) {
            log::warn!("failed to dispatch {}: {err:?}", event.kind());
        }
    }
}

fn dispatch(win: &Window, event: &GameEvent) -> Result<(), JsValue> {
    let init = CustomEventInit::new();
    init.set_detail(&JsValue::from_str(&event_detail(event)));
    let dom_event =
        CustomEvent::new_with_event_init_dict(&format!("rhythm:{}", event.kind()), &init)?;
    win.dispatch_event(&dom_event)?;
    Ok(())
}

#[cfg(feature = "serde_json")]
fn event_detail(event: &GameEvent) -> String {
    serde_json::to_string(event).unwrap_or_default()
}

#[cfg(not(feature = "serde_json"))]
fn event_detail(event: &GameEvent) -> String {
    format!("{event:?}")
}

fn install_keyboard(win: &Window) -> Result<(), JsValue> {
    let closure = Closure::wrap(Box::new(move |evt: KeyboardEvent| {
        let code = evt.code();
        if let Some(lane) = lane_for_key(&code) {
            if !evt.repeat() {
                with_session(|s, now| s.on_lane_press(lane, now));
            }
            return;
        }
        match code.as_str() {
            "Space" => {
                evt.prevent_default();
                with_session(|s, now| s.toggle(now));
            }
            "Escape" => {
                evt.prevent_default();
                with_session(|s, now| s.escape(now));
            }
            _ => {}
        }
    }) as Box<dyn FnMut(KeyboardEvent)>);
    win.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn start_frame_loop() {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        SESSION.with(|cell| {
            if let Some(session) = cell.borrow_mut().as_mut() {
                session.tick(ts);
            }
        });
        flush_events();
        request_frame(&f);
    }) as Box<dyn FnMut(f64)>));
    request_frame(&g);
}

fn request_frame(callback: &FrameCallback) {
    let Some(win) = window() else {
        return;
    };
    if let Some(cb) = callback.borrow().as_ref() {
        let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
    }
}
