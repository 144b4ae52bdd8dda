//! boardsync - kanban board core
//!
//! This library holds the state of one user's kanban board: the task
//! collection, the rules for moving a task between columns, and the drag
//! controllers that turn pointer and touch input into moves.
//!
//! # Core Concepts
//!
//! - **Tasks**: documents owned by a user, each in exactly one status
//! - **Columns**: the four status lanes, derived from tasks on every render
//! - **Session**: owns the store, the active drag and the renderer
//! - **Backends**: where task documents live (files, a local blob, memory)
//!
//! # Module Organization
//!
//! - `task`: task model, validation and edits
//! - `store`: in-memory collection over a backend
//! - `backend`: the `TaskBackend` trait and its implementations
//! - `transition`: status transition planning
//! - `session`: board session, deferred work and drag bookkeeping
//! - `drag`: pointer and touch drag controllers, auto-scroll
//! - `render`: board views and the renderer callback
//! - `cli` / `ui`: command line and terminal board
//! - `storage` / `lock`: data directory layout, file locking and atomic writes

pub mod backend;
pub mod cli;
pub mod column;
pub mod config;
pub mod drag;
pub mod error;
pub mod events;
pub mod lock;
pub mod output;
pub mod render;
pub mod session;
pub mod storage;
pub mod store;
pub mod summary;
pub mod task;
pub mod transition;
pub mod ui;

pub use error::{Error, Result};
