// src/watch/mod.rs

//! File watching and change detection for `serve`.
//!
//! This module is responsible for:
//! - Compiling each watch binding's pattern and exclude globs.
//! - Wiring up a cross-platform filesystem watcher (`notify`) with a short
//!   debounce window.
//! - Turning matched changes into triggers of the binding's reload node.
//!
//! It does **not** know which tasks a reload node depends on; the graph and
//! scheduler take care of that.

pub mod event_handler;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use event_handler::bindings_for_paths;
pub use patterns::{compile_bindings, reload_node, WatchBinding, WatchBindingError};
pub use watcher::{spawn_watcher, WatcherHandle, DEBOUNCE};
