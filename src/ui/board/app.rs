use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::backend::BackendKind;
use crate::cli::BoardContext;
use crate::column::{column_at, Column, ColumnBounds, Point, Rect as HitRect};
use crate::drag::DragPayload;
use crate::error::Result;
use crate::render::{BoardRenderer, ColumnView};
use crate::session::BoardSession;
use crate::task::{Status, Task, TaskId};
use crate::transition::MoveOutcome;

use super::view;

const EVENT_POLL_MS: u64 = 120;
const WATCH_DEBOUNCE_MS: u64 = 200;

/// What the session last asked to be drawn.
#[derive(Debug, Default)]
pub struct Screen {
    pub(crate) columns: Vec<ColumnView>,
    pub(crate) highlighted: [bool; 4],
    pub(crate) details: Option<Task>,
}

/// Renderer that records into a [`Screen`] for the next frame.
pub struct ScreenRenderer {
    screen: Rc<RefCell<Screen>>,
}

impl ScreenRenderer {
    pub fn new(screen: Rc<RefCell<Screen>>) -> Self {
        Self { screen }
    }
}

impl BoardRenderer for ScreenRenderer {
    fn render_column(&mut self, column: &ColumnView) {
        let mut screen = self.screen.borrow_mut();
        match screen.columns.iter_mut().find(|view| view.column == column.column) {
            Some(existing) => *existing = column.clone(),
            None => {
                screen.columns.push(column.clone());
                screen
                    .columns
                    .sort_by_key(|view| view.column.status().index());
            }
        }
    }

    fn set_highlight(&mut self, column: Column, highlighted: bool) {
        self.screen.borrow_mut().highlighted[column.status().index()] = highlighted;
    }

    fn open_details(&mut self, task: &Task) {
        self.screen.borrow_mut().details = Some(task.clone());
    }

    fn close_details(&mut self) {
        self.screen.borrow_mut().details = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StatusKind {
    Info,
    Error,
}

/// Screen position of one drawn card.
#[derive(Debug, Clone)]
pub(crate) struct CardHit {
    pub(crate) task_id: TaskId,
    pub(crate) rect: HitRect,
}

/// Geometry of the last frame, in terminal cells.
#[derive(Debug, Default)]
pub(crate) struct BoardLayout {
    pub(crate) columns: Vec<ColumnBounds>,
    pub(crate) cards: Vec<CardHit>,
}

impl BoardLayout {
    fn card_at(&self, point: Point) -> Option<&TaskId> {
        self.cards
            .iter()
            .find(|hit| hit.rect.contains(point))
            .map(|hit| &hit.task_id)
    }
}

struct Press {
    task_id: TaskId,
    origin: Point,
    payload: Option<DragPayload>,
    hover: Option<Column>,
}

enum UiMsg {
    Reload,
    WatchError(String),
}

pub(crate) struct AppState {
    pub(crate) screen: Rc<RefCell<Screen>>,
    pub(crate) user: String,
    pub(crate) layout: BoardLayout,
    /// Selected column and card index among its visible cards.
    pub(crate) cursor: (usize, usize),
    pub(crate) search_input: Option<String>,
    pub(crate) dragged: Option<TaskId>,
    status: Option<(String, StatusKind)>,
    press: Option<Press>,
}

impl AppState {
    fn new(screen: Rc<RefCell<Screen>>, user: String) -> Self {
        Self {
            screen,
            user,
            layout: BoardLayout::default(),
            cursor: (0, 0),
            search_input: None,
            dragged: None,
            status: None,
            press: None,
        }
    }

    pub(crate) fn status_line(&self) -> Option<(String, StatusKind)> {
        self.status.clone()
    }

    pub(crate) fn footer_hint(&self) -> String {
        if self.search_input.is_some() {
            return "type to search  enter apply  esc clear".to_string();
        }
        if self.screen.borrow().details.is_some() {
            return "esc close".to_string();
        }
        "drag cards with the mouse  arrows select  enter details  < > move  / search  r reload  D delete  q quit"
            .to_string()
    }

    pub(crate) fn selected_task(&self) -> Option<TaskId> {
        let screen = self.screen.borrow();
        let column = screen.columns.get(self.cursor.0)?;
        let selected = column
            .visible_cards()
            .nth(self.cursor.1)
            .map(|card| card.id.clone());
        selected
    }

    fn clamp_cursor(&mut self) {
        let visible = {
            let screen = self.screen.borrow();
            screen
                .columns
                .get(self.cursor.0)
                .map(|column| column.visible_cards().count())
                .unwrap_or(0)
        };
        self.cursor.1 = self.cursor.1.min(visible.saturating_sub(1));
    }

    fn set_error(&mut self, message: String) {
        self.status = Some((message, StatusKind::Error));
    }

    fn set_info(&mut self, message: String) {
        self.status = Some((message, StatusKind::Info));
    }

    fn report_move(&mut self, result: Result<Option<MoveOutcome>>) {
        match result {
            Ok(Some(MoveOutcome::Moved(transition))) => self.set_info(format!(
                "moved {} to {}",
                transition.task_id,
                transition.to.label()
            )),
            Ok(Some(MoveOutcome::UnknownTask { task_id })) => {
                self.set_error(format!("task {task_id} no longer exists"))
            }
            Ok(Some(MoveOutcome::Unchanged { .. })) | Ok(None) => {}
            Err(err) => self.set_error(format!("move not saved: {err}")),
        }
    }
}

pub fn run(mut ctx: BoardContext, screen: Rc<RefCell<Screen>>) -> Result<()> {
    let (ui_tx, ui_rx) = mpsc::channel();
    spawn_watch(watch_paths(&ctx), ui_tx);

    let mut app = AppState::new(screen, ctx.config.user.clone());
    if ctx.load_report.failed.is_some() {
        app.set_error("could not load tasks, showing an empty board".to_string());
    } else if ctx.load_report.skipped > 0 {
        app.set_error(format!(
            "{} invalid task document(s) skipped",
            ctx.load_report.skipped
        ));
    }
    run_terminal(&mut app, &mut ctx, ui_rx)
}

fn run_terminal(app: &mut AppState, ctx: &mut BoardContext, ui_rx: Receiver<UiMsg>) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app, ctx, ui_rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableFocusChange
    )?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    ctx: &mut BoardContext,
    ui_rx: Receiver<UiMsg>,
) -> Result<()> {
    let mut dirty = true;
    loop {
        while let Ok(msg) = ui_rx.try_recv() {
            handle_ui_msg(app, ctx, msg);
            dirty = true;
        }

        if dirty {
            app.clamp_cursor();
            terminal.draw(|frame| view::render(frame, app))?;
            dirty = false;
        }

        if event::poll(Duration::from_millis(EVENT_POLL_MS))? {
            match event::read()? {
                Event::Key(key) => {
                    if handle_key(app, ctx, key) {
                        break;
                    }
                    dirty = true;
                }
                Event::Mouse(mouse) => {
                    handle_mouse(app, ctx, mouse);
                    dirty = true;
                }
                Event::FocusLost => {
                    // The button-up of a drag in progress will not reach us.
                    release_stale_press(app, &mut ctx.session);
                    dirty = true;
                }
                Event::Resize(_, _) => dirty = true,
                _ => {}
            }
        }

        // One event turn has passed.
        if ctx.session.flush_deferred() > 0 {
            dirty = true;
        }
    }
    Ok(())
}

fn handle_ui_msg(app: &mut AppState, ctx: &mut BoardContext, msg: UiMsg) {
    match msg {
        UiMsg::Reload => {
            if ctx.session.drag().is_some() {
                // Reloading mid-drag would pull the card out from under the pointer.
                return;
            }
            let report = ctx.runtime.block_on(ctx.session.load());
            if let Some(reason) = report.failed {
                app.set_error(format!("reload failed: {reason}"));
            }
        }
        UiMsg::WatchError(message) => app.set_error(format!("watch error: {message}")),
    }
}

fn handle_mouse(app: &mut AppState, ctx: &mut BoardContext, mouse: MouseEvent) {
    let point = Point::new(f64::from(mouse.column), f64::from(mouse.row));
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            release_stale_press(app, &mut ctx.session);
            if app.screen.borrow().details.is_some() {
                ctx.session.close_details();
                return;
            }
            if let Some(task_id) = app.layout.card_at(point).cloned() {
                select_task(app, &task_id);
                app.press = Some(Press {
                    task_id,
                    origin: point,
                    payload: None,
                    hover: None,
                });
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            let Some(press) = app.press.as_mut() else {
                return;
            };
            if press.payload.is_none() {
                if point == press.origin {
                    return;
                }
                match ctx.session.pointer().drag_start_at(&press.task_id, press.origin) {
                    Ok(payload) => {
                        press.payload = Some(payload);
                        app.dragged = Some(press.task_id.clone());
                    }
                    Err(err) => {
                        app.press = None;
                        app.set_error(format!("cannot drag: {err}"));
                        return;
                    }
                }
            }

            let mut pointer = ctx.session.pointer();
            pointer.drag_move(point);
            let hover = column_at(&app.layout.columns, point);
            if hover != press.hover {
                if let Some(previous) = press.hover {
                    pointer.drag_leave(&previous.dom_id());
                }
                if let Some(next) = hover {
                    pointer.drag_enter(&next.dom_id());
                }
                press.hover = hover;
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            let Some(press) = app.press.take() else {
                return;
            };
            match press.payload {
                Some(payload) => {
                    let target = column_at(&app.layout.columns, point)
                        .map(|column| column.dom_id())
                        .unwrap_or_default();
                    let result = ctx
                        .runtime
                        .block_on(ctx.session.pointer().drop(&target, Some(&payload)));
                    ctx.session.pointer().drag_end();
                    app.dragged = None;
                    app.report_move(result);
                }
                None => {
                    ctx.session.request_details(&press.task_id);
                }
            }
        }
        _ => {}
    }
}

/// Forget a press whose button-up never arrived, along with its drag.
fn release_stale_press(app: &mut AppState, session: &mut BoardSession) {
    let Some(press) = app.press.take() else {
        return;
    };
    if press.payload.is_some() {
        tracing::debug!(task_id = %press.task_id, "mouse drag lost its release");
        session.pointer().cancel();
        app.dragged = None;
    }
}

fn handle_key(app: &mut AppState, ctx: &mut BoardContext, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    if let Some(input) = app.search_input.as_mut() {
        match key.code {
            KeyCode::Enter => {
                let query = input.clone();
                app.search_input = None;
                ctx.session.set_search(query);
            }
            KeyCode::Esc => {
                app.search_input = None;
                ctx.session.set_search("");
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(ch) => input.push(ch),
            _ => {}
        }
        return false;
    }

    if app.screen.borrow().details.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
            ctx.session.close_details();
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('r') => handle_ui_msg(app, ctx, UiMsg::Reload),
        KeyCode::Left | KeyCode::Char('h') => {
            app.cursor = (app.cursor.0.saturating_sub(1), 0);
        }
        KeyCode::Right | KeyCode::Char('l') => {
            app.cursor = ((app.cursor.0 + 1).min(Status::ALL.len() - 1), 0);
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.cursor.1 = app.cursor.1.saturating_sub(1);
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.cursor.1 += 1;
        }
        KeyCode::Enter => {
            if let Some(task_id) = app.selected_task() {
                ctx.session.request_details(&task_id);
            }
        }
        KeyCode::Char('<') | KeyCode::Char('>') => {
            let forward = key.code == KeyCode::Char('>');
            move_selected(app, ctx, forward);
        }
        KeyCode::Char('/') => {
            app.search_input = Some(ctx.session.search().to_string());
        }
        KeyCode::Char('D') => {
            if let Some(task_id) = app.selected_task() {
                match ctx.runtime.block_on(ctx.session.delete_task(&task_id)) {
                    Ok(task) => app.set_info(format!("deleted {}", task.title)),
                    Err(err) => app.set_error(format!("delete failed: {err}")),
                }
            }
        }
        _ => {}
    }
    false
}

fn move_selected(app: &mut AppState, ctx: &mut BoardContext, forward: bool) {
    let Some(task_id) = app.selected_task() else {
        return;
    };
    let Some(current) = ctx.session.find_task(&task_id).map(|task| task.status) else {
        return;
    };
    let Some(target) = neighbour_status(current, forward) else {
        return;
    };

    let result = ctx
        .runtime
        .block_on(ctx.session.move_task(&task_id, target))
        .map(Some);
    app.report_move(result);
    select_task(app, &task_id);
}

/// The next column to the right (or left) of `current`, if any.
fn neighbour_status(current: Status, forward: bool) -> Option<Status> {
    let statuses = Status::ALL;
    let index = current.index();
    let target = if forward {
        index.checked_add(1)
    } else {
        index.checked_sub(1)
    };
    target.and_then(|index| statuses.get(index).copied())
}

fn select_task(app: &mut AppState, task_id: &TaskId) {
    let screen = app.screen.borrow();
    for (column_idx, column) in screen.columns.iter().enumerate() {
        if let Some(card_idx) = column.visible_cards().position(|card| &card.id == task_id) {
            app.cursor = (column_idx, card_idx);
            return;
        }
    }
}

fn watch_paths(ctx: &BoardContext) -> Vec<PathBuf> {
    let user = ctx.session.store().user();
    let path = match ctx.config.store.kind {
        BackendKind::Documents => ctx.storage.tasks_dir(user).ok(),
        BackendKind::Local => ctx
            .storage
            .local_tasks_file(user)
            .ok()
            .and_then(|file| file.parent().map(|dir| dir.to_path_buf())),
        BackendKind::Memory => None,
    };
    path.into_iter().collect()
}

fn spawn_watch(paths: Vec<PathBuf>, ui_tx: Sender<UiMsg>) {
    if paths.is_empty() {
        return;
    }

    thread::spawn(move || {
        let (event_tx, event_rx) = mpsc::channel();
        let watcher: notify::Result<RecommendedWatcher> = notify::recommended_watcher(move |res| {
            let _ = event_tx.send(res);
        });

        let mut watcher = match watcher {
            Ok(watcher) => watcher,
            Err(err) => {
                let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                return;
            }
        };

        for path in &paths {
            if let Err(err) = std::fs::create_dir_all(path) {
                let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                continue;
            }
            if let Err(err) = watcher.watch(path, RecursiveMode::NonRecursive) {
                let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
            }
        }

        let debounce = Duration::from_millis(WATCH_DEBOUNCE_MS);
        let mut pending: Option<Instant> = None;

        loop {
            let timeout = pending
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(Duration::from_secs(3600));
            match event_rx.recv_timeout(timeout) {
                Ok(Ok(_)) => {
                    pending = Some(Instant::now() + debounce);
                }
                Ok(Err(err)) => {
                    let _ = ui_tx.send(UiMsg::WatchError(err.to_string()));
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {
                    if pending.is_some() {
                        pending = None;
                        if ui_tx.send(UiMsg::Reload).is_err() {
                            break;
                        }
                    }
                }
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }
    });
}
