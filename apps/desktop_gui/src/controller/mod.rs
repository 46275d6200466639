//! Controller layer: UI events and command orchestration around the wizard.

pub mod events;
pub mod orchestration;
