//! Terminal user interface.
//!
//! Screen flow mirrors the annotation workflow: password gate, login,
//! calibration instructions, the annotation form, and the completion view.

mod app;
mod state;
mod widgets;

pub use app::{App, AppOptions};
