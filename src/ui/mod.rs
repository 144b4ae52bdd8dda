//! Terminal front end.

pub mod board;
