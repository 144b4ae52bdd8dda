//! Board session: the single owner of board state.
//!
//! A session holds the task store, the renderer, the active drag (at most
//! one), the dragging flag that suppresses detail popups, and the deferred
//! queue. Drag controllers borrow the session for each event; nothing about
//! the board lives in globals.
//!
//! Work that must happen "on the next event turn" (clearing the dragged task
//! after a drop, releasing the dragging flag after a touch ends) is queued
//! with [`BoardSession::defer`] and runs on [`BoardSession::flush_deferred`],
//! which the event loop calls once per turn. Each entry carries the gesture
//! generation that queued it, so a late entry never clobbers a newer drag.
//!
//! A controller that owns a gesture across events (touch) holds a
//! [`GestureTicket`]. If the controller goes away mid-gesture the ticket is
//! handed back and the next flush forgets the drag and its dragging flag.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::Serialize;

use crate::column::{Column, Point};
use crate::config::PersistConfig;
use crate::drag::pointer::PointerDrag;
use crate::error::{Error, Result};
use crate::events::{Event, EventKind, EventSink};
use crate::render::{partition, BoardRenderer, BoardView};
use crate::store::{LoadReport, TaskStore};
use crate::task::{Status, Task, TaskEdit, TaskId};
use crate::transition::{plan_move, MoveOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DragInput {
    Pointer,
    Touch,
}

/// The one drag in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub task_id: TaskId,
    pub input: DragInput,
    pub origin: Point,
    pub current: Point,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deferred {
    /// Forget the dragged task if it is still the drag of `generation`.
    ClearDraggedTask { generation: u64 },
    /// Drop the dragging flag unless a newer gesture has started.
    ReleaseDragging { generation: u64 },
}

/// Claim on a gesture's drag, kept by the controller driving it.
#[derive(Debug)]
pub struct GestureTicket {
    generation: u64,
    orphaned: Rc<RefCell<Vec<u64>>>,
}

impl GestureTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Give the gesture back without a session at hand. The session tears it
    /// down on its next [`BoardSession::flush_deferred`].
    pub fn orphan(self) {
        self.orphaned.borrow_mut().push(self.generation);
    }
}

pub struct BoardSession {
    store: TaskStore,
    renderer: Box<dyn BoardRenderer>,
    persist: PersistConfig,
    events: Option<EventSink>,
    drag: Option<DragSession>,
    /// Generation of the gesture holding the dragging flag.
    dragging: Option<u64>,
    generation: u64,
    deferred: VecDeque<Deferred>,
    orphaned: Rc<RefCell<Vec<u64>>>,
    highlighted: Option<Column>,
    search: String,
}

impl BoardSession {
    pub fn new(store: TaskStore, renderer: Box<dyn BoardRenderer>) -> Self {
        Self {
            store,
            renderer,
            persist: PersistConfig::default(),
            events: None,
            drag: None,
            dragging: None,
            generation: 0,
            deferred: VecDeque::new(),
            orphaned: Rc::new(RefCell::new(Vec::new())),
            highlighted: None,
            search: String::new(),
        }
    }

    pub fn with_persist(mut self, persist: PersistConfig) -> Self {
        self.persist = persist;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn find_task(&self, task_id: &TaskId) -> Option<&Task> {
        self.store.find(task_id)
    }

    pub fn renderer(&self) -> &dyn BoardRenderer {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> &mut dyn BoardRenderer {
        self.renderer.as_mut()
    }

    /// Pointer (mouse / HTML5 drag) controller bound to this session.
    pub fn pointer(&mut self) -> PointerDrag<'_> {
        PointerDrag::new(self)
    }

    // =========================================================================
    // Loading and drawing
    // =========================================================================

    /// Reload from the backing store and redraw. Never fails.
    pub async fn load(&mut self) -> LoadReport {
        let report = self.store.load_all().await;
        self.emit(EventKind::BoardLoaded, &report);
        self.render();
        report
    }

    pub fn board_view(&self) -> BoardView {
        partition(self.store.tasks(), &self.search)
    }

    /// Redraw all four columns.
    pub fn render(&mut self) {
        let view = self.board_view();
        for column in &view.columns {
            self.renderer.render_column(column);
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Filter cards by title or description; an empty query shows everything.
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.search = query.into();
        self.render();
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Move a task to `to`. Unknown ids and same-status moves change nothing
    /// in the store; every call redraws the board.
    pub async fn move_task(&mut self, task_id: &TaskId, to: Status) -> Result<MoveOutcome> {
        let outcome = plan_move(self.store.tasks(), task_id, to);
        let transition = match &outcome {
            MoveOutcome::Moved(transition) => transition.clone(),
            MoveOutcome::UnknownTask { .. } => {
                tracing::warn!(task_id = %task_id, to = %to, "move ignored, unknown task");
                return Ok(outcome);
            }
            MoveOutcome::Unchanged { .. } => {
                tracing::debug!(task_id = %task_id, status = %to, "task already in target status");
                self.render();
                return Ok(outcome);
            }
        };

        let Some(task) = self.store.find_mut(task_id) else {
            return Ok(MoveOutcome::UnknownTask {
                task_id: task_id.clone(),
            });
        };
        let previous = task.clone();
        task.status = to;
        let updated = task.clone();

        self.commit(previous, updated, EventKind::TaskMoved, &transition)
            .await?;
        tracing::info!(
            task_id = %task_id,
            from = %transition.from,
            to = %transition.to,
            "task moved"
        );
        Ok(outcome)
    }

    /// Edit-form save. The only path besides a drop that may change status.
    pub async fn save_edit(&mut self, task_id: &TaskId, edit: &TaskEdit) -> Result<Task> {
        let previous = self
            .store
            .find(task_id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let updated = edit.apply(&previous)?;
        self.store.insert(updated.clone());

        let change = serde_json::json!({
            "task_id": task_id,
            "status": updated.status,
            "status_changed": updated.status != previous.status,
        });
        self.commit(previous, updated.clone(), EventKind::TaskEdited, &change)
            .await?;
        tracing::info!(task_id = %task_id, "task edited");
        Ok(updated)
    }

    /// Flip subtask `index`; returns its new completion state.
    pub async fn toggle_subtask(&mut self, task_id: &TaskId, index: usize) -> Result<bool> {
        let task = self
            .store
            .find_mut(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let previous = task.clone();
        let subtask = task
            .subtasks
            .get_mut(index)
            .ok_or_else(|| Error::SubtaskOutOfRange {
                task_id: task_id.to_string(),
                index,
            })?;
        subtask.completed = !subtask.completed;
        let completed = subtask.completed;
        let updated = task.clone();

        let change = serde_json::json!({
            "task_id": task_id,
            "index": index,
            "completed": completed,
        });
        self.commit(previous, updated, EventKind::SubtaskToggled, &change)
            .await?;
        tracing::info!(task_id = %task_id, index, completed, "subtask toggled");
        Ok(completed)
    }

    /// Delete from the backing store, then from the board. When the store
    /// refuses, the task stays on the board and the error is returned.
    pub async fn delete_task(&mut self, task_id: &TaskId) -> Result<Task> {
        match self.store.remove(task_id).await {
            Ok(removed) => {
                self.renderer.close_details();
                self.render();
                self.emit(EventKind::TaskDeleted, &serde_json::json!({ "task_id": task_id }));
                tracing::info!(task_id = %task_id, "task deleted");
                Ok(removed)
            }
            Err(Error::TaskNotFound(id)) => Err(Error::TaskNotFound(id)),
            Err(err) => {
                tracing::error!(task_id = %task_id, error = %err, "deleting task failed");
                self.emit(
                    EventKind::DeleteFailed,
                    &serde_json::json!({ "task_id": task_id, "error": err.to_string() }),
                );
                self.render();
                Err(err)
            }
        }
    }

    /// Store a newly created task, then reload the board from the store.
    pub async fn add_task(&mut self, task: Task) -> Result<LoadReport> {
        task.validate()?;
        if let Err(err) = self.store.persist(&task).await {
            tracing::error!(task_id = %task.id, error = %err, "saving new task failed");
            self.emit(
                EventKind::PersistFailed,
                &serde_json::json!({ "task_id": task.id, "error": err.to_string() }),
            );
            return Err(err);
        }
        self.emit(EventKind::TaskAdded, &serde_json::json!({ "task_id": task.id, "title": task.title }));
        tracing::info!(task_id = %task.id, "task added");
        self.store.insert(task);
        Ok(self.load().await)
    }

    /// Persist `updated` (already in the store), redraw, and report. On a
    /// store failure the previous copy is restored only when rollback is on.
    async fn commit<T: Serialize>(
        &mut self,
        previous: Task,
        updated: Task,
        kind: EventKind,
        change: &T,
    ) -> Result<()> {
        let result = self.store.persist(&updated).await;
        if let Err(err) = &result {
            tracing::error!(task_id = %updated.id, error = %err, "persisting task failed");
            if self.persist.rollback_on_failure {
                tracing::info!(task_id = %updated.id, "rolling back local change");
                self.store.insert(previous);
            }
            self.emit(
                EventKind::PersistFailed,
                &serde_json::json!({
                    "task_id": updated.id,
                    "error": err.to_string(),
                    "rolled_back": self.persist.rollback_on_failure,
                }),
            );
        } else {
            self.emit(kind, change);
        }
        self.render();
        result
    }

    // =========================================================================
    // Details popup
    // =========================================================================

    /// Open the details view for a tapped card, unless a drag just happened.
    pub fn request_details(&mut self, task_id: &TaskId) -> bool {
        if self.dragging.is_some() || self.drag.is_some() {
            tracing::debug!(task_id = %task_id, "details suppressed while dragging");
            return false;
        }
        match self.store.find(task_id) {
            Some(task) => {
                self.renderer.open_details(task);
                true
            }
            None => {
                tracing::warn!(task_id = %task_id, "details requested for unknown task");
                false
            }
        }
    }

    pub fn close_details(&mut self) {
        self.renderer.close_details();
    }

    // =========================================================================
    // Drag state
    // =========================================================================

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn dragged_task_id(&self) -> Option<&TaskId> {
        self.drag.as_ref().map(|drag| &drag.task_id)
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    /// Raise the dragging flag on behalf of the gesture `generation`.
    pub(crate) fn hold_dragging(&mut self, generation: u64) {
        self.dragging = Some(generation);
    }

    /// Lower the flag, but only for the gesture that raised it.
    pub(crate) fn release_dragging(&mut self, generation: u64) {
        if self.dragging == Some(generation) {
            self.dragging = None;
        }
    }

    pub(crate) fn ticket(&self, generation: u64) -> GestureTicket {
        GestureTicket {
            generation,
            orphaned: Rc::clone(&self.orphaned),
        }
    }

    /// Start the drag of `task_id`. Only one drag may be active.
    pub fn begin_drag(&mut self, task_id: &TaskId, input: DragInput, at: Point) -> Result<u64> {
        if let Some(active) = &self.drag {
            return Err(Error::DragInProgress(active.task_id.to_string()));
        }
        self.generation += 1;
        self.drag = Some(DragSession {
            task_id: task_id.clone(),
            input,
            origin: at,
            current: at,
            generation: self.generation,
        });
        tracing::debug!(task_id = %task_id, ?input, generation = self.generation, "drag started");
        Ok(self.generation)
    }

    pub fn update_drag(&mut self, at: Point) {
        if let Some(drag) = &mut self.drag {
            drag.current = at;
        }
    }

    /// Forget the drag immediately, for gestures that were torn down.
    pub(crate) fn abort_drag(&mut self, generation: u64) {
        if self.drag.as_ref().map(|drag| drag.generation) == Some(generation) {
            self.drag = None;
        }
    }

    /// Highlight exactly one column, or none.
    pub fn set_highlight(&mut self, column: Option<Column>) {
        if self.highlighted == column {
            return;
        }
        if let Some(previous) = self.highlighted.take() {
            self.renderer.set_highlight(previous, false);
        }
        if let Some(next) = column {
            self.renderer.set_highlight(next, true);
        }
        self.highlighted = column;
    }

    pub fn highlighted(&self) -> Option<Column> {
        self.highlighted
    }

    /// Clear every column highlight, including ones this session did not set.
    pub fn clear_highlights(&mut self) {
        for column in Column::ALL {
            self.renderer.set_highlight(column, false);
        }
        self.highlighted = None;
    }

    // =========================================================================
    // Deferred work
    // =========================================================================

    pub fn defer(&mut self, work: Deferred) {
        self.deferred.push_back(work);
    }

    pub fn pending_deferred(&self) -> usize {
        self.deferred.len() + self.orphaned.borrow().len()
    }

    /// Run work queued during the previous turn, then tear down gestures
    /// whose controller went away. Returns how many entries ran.
    pub fn flush_deferred(&mut self) -> usize {
        let queued: Vec<Deferred> = self.deferred.drain(..).collect();
        for work in &queued {
            match *work {
                Deferred::ClearDraggedTask { generation } => self.abort_drag(generation),
                Deferred::ReleaseDragging { generation } => self.release_dragging(generation),
            }
        }

        let orphaned: Vec<u64> = self.orphaned.borrow_mut().drain(..).collect();
        for &generation in &orphaned {
            tracing::debug!(generation, "releasing gesture left behind by its controller");
            if self.drag.as_ref().map(|drag| drag.generation) == Some(generation) {
                self.drag = None;
                self.set_highlight(None);
            }
            self.release_dragging(generation);
        }
        queued.len() + orphaned.len()
    }

    fn emit<T: Serialize>(&mut self, kind: EventKind, data: &T) {
        let Some(sink) = self.events.as_mut() else {
            return;
        };
        let user = Some(self.store.user().to_string());
        let result = Event::new(kind, user)
            .with_data(data)
            .and_then(|event| sink.emit(&event));
        if let Err(err) = result {
            tracing::warn!(error = %err, ?kind, "failed to write board event");
        }
    }
}
