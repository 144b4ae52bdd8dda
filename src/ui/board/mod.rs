//! Interactive kanban board: four columns, mouse drag and drop, details popup.

pub mod app;
pub mod view;

pub use app::{run, Screen, ScreenRenderer};
