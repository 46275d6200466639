//! UI layer for desktop GUI: the wizard shell and its per-step views.

pub mod app;

pub use app::{DesktopGuiApp, StartupConfig};
