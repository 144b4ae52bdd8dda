//! Drag coordination: pointer (mouse / HTML5 drag) and touch.
//!
//! Both controllers resolve a drop target through [`crate::column`] and hand
//! the move to [`crate::session::BoardSession::move_task`]; neither touches
//! task state directly.

pub mod autoscroll;
pub mod pointer;
pub mod touch;

pub use autoscroll::{AutoScroller, PageScroll, ScrollDirection};
pub use pointer::{DragPayload, PointerDrag, TRANSFER_MIME};
pub use touch::{CloneHandle, DragSurface, TouchDragController, TouchPhase};
