//! Lane Rhythm core crate.
//!
//! Shapes fall through four lanes; pressing a lane while a shape overlaps the
//! target zone scores by timing accuracy and builds a combo. This crate holds
//! the timing and scoring engine ([`GameSession`]) plus a thin wasm-bindgen
//! host layer (`web`) that drives it from `requestAnimationFrame` and the
//! keyboard. Rendering, sound and menus stay on the JS side and listen for the
//! `rhythm:*` DOM events the host layer dispatches.

use wasm_bindgen::prelude::*;

pub mod clock;
pub mod config;
pub mod field;
pub mod judge;
pub mod phase;
pub mod score;
pub mod session;
pub mod spawner;
pub mod web;

pub use config::{ConfigError, GameConfig, MatchPolicy, SpawnMode};
pub use field::{FallingObject, ObjectId, ObjectStatus};
pub use judge::{Rating, Verdict};
pub use phase::{CountdownStep, Phase};
pub use score::ComboTier;
pub use session::{GameEvent, GameSession, MissCause, SessionStats};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    // Fails only if a logger is already installed, which is fine.
    #[cfg(target_arch = "wasm32")]
    let _ = console_log::init_with_level(log::Level::Info);
}
