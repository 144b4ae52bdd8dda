//! `boardsync board`: the interactive terminal board.

use std::cell::RefCell;
use std::rc::Rc;

use crate::cli::context::BoardContext;
use crate::cli::GlobalOptions;
use crate::error::Result;
use crate::ui::board::{Screen, ScreenRenderer};

pub fn run(global: GlobalOptions) -> Result<()> {
    let screen = Rc::new(RefCell::new(Screen::default()));
    let renderer = ScreenRenderer::new(Rc::clone(&screen));
    let ctx = BoardContext::open_with(global, Box::new(renderer))?;
    crate::ui::board::run(ctx, screen)
}
