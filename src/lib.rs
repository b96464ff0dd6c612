//! overlay-meter: persisted overlay settings and overlay visibility coordination
//!
//! - **config**: settings file, typed value codecs, settings store
//! - **class_icons** / **data**: class icon paths under the resource directory
//! - **messaging**: in-process publish/subscribe
//! - **overlay**: pinned-aware visibility controller
//! - **services**: composition root owning the store and messenger

#![forbid(unsafe_code)]

pub mod class_icons;
pub mod config;
pub mod constants;
pub mod data;
pub mod detector;
pub mod messaging;
pub mod overlay;
pub mod services;
