//! Hand gesture to key-press mapping.
//!
//! A gesture is recorded once as a set of hand landmarks, stored under a label together with the
//! key it should trigger, and later recognized in a live stream of landmarks by comparing each
//! frame against the stored reference poses.
//!
//! # Coordinates
//!
//! Landmark coordinates are taken as-is from the landmark extractor. For MediaPipe-style
//! extractors X and Y are normalized image coordinates (Y points *down*), and Z is a relative depth
//! in roughly the same scale. Nothing here assumes a specific range, but all poses that are
//! compared with each other have to use the same convention.
//!
//! # Environment Variables
//!
//! Some configuration values can be overridden by setting environment variables:
//!
//! * `HANDTYPED_BINDINGS`: Path of the JSON file the gesture bindings are loaded from and saved
//!   to. Overrides `bindings_path` from the [`Config`][config::Config].
//! * `HANDTYPED_THRESHOLD`: Maximum landmark distance at which a live pose is still considered to
//!   be the recorded gesture. Overrides `threshold` from the [`Config`][config::Config].

use log::LevelFilter;

pub mod binding;
pub mod config;
pub mod hand;
pub mod key;
pub mod landmark;
pub mod matcher;
pub mod session;
pub mod source;
pub mod store;
pub mod timer;


/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and this library will log at *debug* level, unless overridden via `RUST_LOG`.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
