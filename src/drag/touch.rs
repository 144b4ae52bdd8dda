//! Touch drag: a gesture state machine over touchstart/move/end/cancel.
//!
//! ```text
//! Idle -> Tracking -> Dragging -> (resolved) -> Idle
//!            |                         ^
//!            +-- below threshold ------+   (a tap: no clone, no move)
//! ```
//!
//! While dragging, a clone of the card follows the finger, the source card
//! is faded, page scroll is locked and the page auto-scrolls near the
//! viewport edges. Every way out of `Dragging` (end, cancel, a new touch
//! without an end, dropping the controller) removes the clone, stops the
//! scroll timer and unlocks the page. A controller dropped mid-drag hands its
//! gesture back to the session, which forgets it on the next flush.

use std::sync::Arc;

use crate::column::{column_at, ColumnBounds, Point};
use crate::config::TouchConfig;
use crate::drag::autoscroll::{AutoScroller, PageScroll, ScrollDirection};
use crate::error::Result;
use crate::session::{BoardSession, Deferred, DragInput, GestureTicket};
use crate::task::TaskId;
use crate::transition::MoveOutcome;

/// A floating copy of a card created by the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct CloneHandle {
    pub id: u64,
    pub width: f64,
}

/// The view the touch controller draws on.
pub trait DragSurface {
    /// Column elements in document order.
    fn column_bounds(&self) -> Vec<ColumnBounds>;

    fn viewport_height(&self) -> f64;

    fn create_clone(&mut self, task_id: &TaskId) -> CloneHandle;

    fn position_clone(&mut self, clone: &CloneHandle, left: f64, top: f64);

    fn remove_clone(&mut self, clone: &CloneHandle);

    fn set_source_faded(&mut self, task_id: &TaskId, faded: bool);

    fn set_page_scroll_locked(&mut self, locked: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Idle,
    Tracking,
    Dragging,
}

#[derive(Debug)]
enum Gesture {
    Idle,
    Tracking {
        task_id: TaskId,
        start: Point,
    },
    Dragging {
        task_id: TaskId,
        ticket: GestureTicket,
        clone: CloneHandle,
    },
}

pub struct TouchDragController {
    config: TouchConfig,
    surface: Box<dyn DragSurface>,
    scroller: AutoScroller,
    gesture: Gesture,
}

impl TouchDragController {
    pub fn new(config: TouchConfig, surface: Box<dyn DragSurface>, page: Arc<dyn PageScroll>) -> Self {
        let scroller = AutoScroller::from_config(page, &config);
        Self {
            config,
            surface,
            scroller,
            gesture: Gesture::Idle,
        }
    }

    pub fn phase(&self) -> TouchPhase {
        match self.gesture {
            Gesture::Idle => TouchPhase::Idle,
            Gesture::Tracking { .. } => TouchPhase::Tracking,
            Gesture::Dragging { .. } => TouchPhase::Dragging,
        }
    }

    pub fn auto_scroll(&self) -> Option<ScrollDirection> {
        self.scroller.direction()
    }

    /// Finger down on a card. An unfinished previous gesture is torn down.
    pub fn touch_start(&mut self, session: &mut BoardSession, task_id: &TaskId, at: Point) {
        if !matches!(self.gesture, Gesture::Idle) {
            tracing::debug!("new touch before the previous ended, abandoning it");
            self.abandon(session);
        }
        self.gesture = Gesture::Tracking {
            task_id: task_id.clone(),
            start: at,
        };
    }

    pub fn touch_move(&mut self, session: &mut BoardSession, at: Point) {
        if let Gesture::Tracking { task_id, start } = &self.gesture {
            let threshold = self.config.drag_threshold_px;
            if (at.x - start.x).abs() <= threshold && (at.y - start.y).abs() <= threshold {
                return;
            }
            let (task_id, start) = (task_id.clone(), *start);
            self.enter_dragging(session, task_id, start);
        }

        let Gesture::Dragging { clone, .. } = &self.gesture else {
            return;
        };
        let left = at.x - clone.width / 2.0;
        let top = at.y - self.config.clone_offset_y;
        self.surface.position_clone(clone, left, top);

        session.update_drag(at);
        session.set_highlight(column_at(&self.surface.column_bounds(), at));
        self.update_auto_scroll(at.y);
    }

    /// Finger lifted. Drops onto the column under `at` when dragging.
    pub async fn touch_end(
        &mut self,
        session: &mut BoardSession,
        at: Point,
    ) -> Result<Option<MoveOutcome>> {
        self.scroller.stop();
        self.surface.set_page_scroll_locked(false);

        let Gesture::Dragging {
            task_id,
            ticket,
            clone,
        } = std::mem::replace(&mut self.gesture, Gesture::Idle)
        else {
            return Ok(None);
        };
        let generation = ticket.generation();

        let target = column_at(&self.surface.column_bounds(), at);
        self.surface.remove_clone(&clone);
        self.surface.set_source_faded(&task_id, false);
        session.clear_highlights();
        session.defer(Deferred::ClearDraggedTask { generation });
        session.defer(Deferred::ReleaseDragging { generation });

        match target {
            Some(column) => {
                tracing::debug!(task_id = %task_id, column = %column.dom_id(), "touch drop");
                session.move_task(&task_id, column.status()).await.map(Some)
            }
            None => {
                tracing::debug!(task_id = %task_id, "touch drop outside any column");
                Ok(None)
            }
        }
    }

    /// The platform cancelled the touch sequence. Nothing moves.
    pub fn touch_cancel(&mut self, session: &mut BoardSession) {
        self.abandon(session);
    }

    /// Stop listening. Any gesture in flight is abandoned right away.
    pub fn detach(mut self, session: &mut BoardSession) {
        self.abandon(session);
    }

    fn enter_dragging(&mut self, session: &mut BoardSession, task_id: TaskId, start: Point) {
        let generation = match session.begin_drag(&task_id, DragInput::Touch, start) {
            Ok(generation) => generation,
            Err(err) => {
                tracing::warn!(task_id = %task_id, error = %err, "touch drag refused");
                self.gesture = Gesture::Idle;
                return;
            }
        };

        let clone = self.surface.create_clone(&task_id);
        self.surface.set_source_faded(&task_id, true);
        self.surface.set_page_scroll_locked(true);
        session.hold_dragging(generation);
        tracing::debug!(task_id = %task_id, generation, "touch drag started");

        self.gesture = Gesture::Dragging {
            task_id,
            ticket: session.ticket(generation),
            clone,
        };
    }

    fn update_auto_scroll(&mut self, y: f64) {
        let edge = self.config.auto_scroll_edge_px;
        if y < edge {
            self.scroller.start(ScrollDirection::Up);
        } else if y > self.surface.viewport_height() - edge {
            self.scroller.start(ScrollDirection::Down);
        } else {
            self.scroller.stop();
        }
    }

    /// Tear down the current gesture without moving anything.
    fn abandon(&mut self, session: &mut BoardSession) {
        if let Some(ticket) = self.release_surface() {
            let generation = ticket.generation();
            session.clear_highlights();
            session.abort_drag(generation);
            session.defer(Deferred::ReleaseDragging { generation });
        }
    }

    /// Undo everything the drag did to the view. Returns the ticket of the
    /// drag that was active, if any.
    fn release_surface(&mut self) -> Option<GestureTicket> {
        self.scroller.stop();
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Dragging {
                task_id,
                ticket,
                clone,
            } => {
                self.surface.remove_clone(&clone);
                self.surface.set_source_faded(&task_id, false);
                self.surface.set_page_scroll_locked(false);
                Some(ticket)
            }
            Gesture::Tracking { .. } | Gesture::Idle => None,
        }
    }
}

impl Drop for TouchDragController {
    fn drop(&mut self) {
        if let Some(ticket) = self.release_surface() {
            ticket.orphan();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::column::{Column, Rect};
    use crate::render::NullRenderer;
    use crate::store::TaskStore;
    use crate::task::Status;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct SurfaceLog {
        clones: Vec<u64>,
        created: usize,
        scroll_locked: bool,
        faded: bool,
    }

    struct FakeSurface {
        log: Arc<Mutex<SurfaceLog>>,
    }

    impl DragSurface for FakeSurface {
        fn column_bounds(&self) -> Vec<ColumnBounds> {
            Column::ALL
                .iter()
                .enumerate()
                .map(|(idx, column)| {
                    ColumnBounds::new(*column, Rect::new(idx as f64 * 250.0, 0.0, 240.0, 800.0))
                })
                .collect()
        }

        fn viewport_height(&self) -> f64 {
            800.0
        }

        fn create_clone(&mut self, _task_id: &TaskId) -> CloneHandle {
            let mut log = self.log.lock().unwrap();
            log.created += 1;
            let id = log.created as u64;
            log.clones.push(id);
            CloneHandle { id, width: 200.0 }
        }

        fn position_clone(&mut self, _clone: &CloneHandle, _left: f64, _top: f64) {}

        fn remove_clone(&mut self, clone: &CloneHandle) {
            self.log.lock().unwrap().clones.retain(|id| *id != clone.id);
        }

        fn set_source_faded(&mut self, _task_id: &TaskId, faded: bool) {
            self.log.lock().unwrap().faded = faded;
        }

        fn set_page_scroll_locked(&mut self, locked: bool) {
            self.log.lock().unwrap().scroll_locked = locked;
        }
    }

    struct NoScroll;

    impl PageScroll for NoScroll {
        fn scroll_by(&self, _dy: f64) {}
    }

    async fn fixture() -> (BoardSession, TouchDragController, Arc<Mutex<SurfaceLog>>) {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed("u", json!({ "id": 1, "title": "one", "status": "todo" }))
            .unwrap();
        let mut session = BoardSession::new(TaskStore::new(backend, "u"), Box::new(NullRenderer));
        session.load().await;

        let log = Arc::new(Mutex::new(SurfaceLog::default()));
        let surface = FakeSurface { log: log.clone() };
        let controller =
            TouchDragController::new(TouchConfig::default(), Box::new(surface), Arc::new(NoScroll));
        (session, controller, log)
    }

    fn id() -> TaskId {
        TaskId::new("1").unwrap()
    }

    #[tokio::test]
    async fn small_movement_stays_a_tap() {
        let (mut session, mut touch, log) = fixture().await;
        touch.touch_start(&mut session, &id(), Point::new(100.0, 300.0));
        touch.touch_move(&mut session, Point::new(103.0, 303.0));
        assert_eq!(touch.phase(), TouchPhase::Tracking);

        let outcome = touch
            .touch_end(&mut session, Point::new(103.0, 303.0))
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(log.lock().unwrap().created, 0);
        assert!(!session.is_dragging());
    }

    #[tokio::test]
    async fn exactly_threshold_does_not_drag() {
        let (mut session, mut touch, _log) = fixture().await;
        touch.touch_start(&mut session, &id(), Point::new(100.0, 300.0));
        touch.touch_move(&mut session, Point::new(110.0, 290.0));
        assert_eq!(touch.phase(), TouchPhase::Tracking);
        touch.touch_move(&mut session, Point::new(110.5, 300.0));
        assert_eq!(touch.phase(), TouchPhase::Dragging);
    }

    #[tokio::test]
    async fn drop_on_column_moves_and_cleans_up() {
        let (mut session, mut touch, log) = fixture().await;
        touch.touch_start(&mut session, &id(), Point::new(100.0, 300.0));
        touch.touch_move(&mut session, Point::new(115.0, 300.0));
        assert_eq!(touch.phase(), TouchPhase::Dragging);
        assert!(session.is_dragging());
        assert!(log.lock().unwrap().scroll_locked);

        touch.touch_move(&mut session, Point::new(800.0, 300.0));
        assert_eq!(session.highlighted(), Some(Column::for_status(Status::Done)));

        let outcome = touch
            .touch_end(&mut session, Point::new(800.0, 300.0))
            .await
            .unwrap();
        assert!(outcome.unwrap().is_moved());
        assert_eq!(session.find_task(&id()).unwrap().status, Status::Done);

        let log = log.lock().unwrap();
        assert!(log.clones.is_empty());
        assert!(!log.scroll_locked);
        assert!(!log.faded);
        assert_eq!(session.highlighted(), None);

        assert!(session.is_dragging());
        session.flush_deferred();
        assert!(!session.is_dragging());
        assert!(session.dragged_task_id().is_none());
    }

    #[tokio::test]
    async fn cancel_releases_everything() {
        let (mut session, mut touch, log) = fixture().await;
        touch.touch_start(&mut session, &id(), Point::new(100.0, 300.0));
        touch.touch_move(&mut session, Point::new(100.0, 50.0));
        assert_eq!(touch.auto_scroll(), Some(ScrollDirection::Up));

        touch.touch_cancel(&mut session);
        assert_eq!(touch.phase(), TouchPhase::Idle);
        assert_eq!(touch.auto_scroll(), None);
        assert!(log.lock().unwrap().clones.is_empty());
        assert!(session.dragged_task_id().is_none());
        session.flush_deferred();
        assert!(!session.is_dragging());
        assert_eq!(session.find_task(&id()).unwrap().status, Status::Todo);
    }

    #[tokio::test]
    async fn restart_without_end_abandons_previous_clone() {
        let (mut session, mut touch, log) = fixture().await;
        touch.touch_start(&mut session, &id(), Point::new(100.0, 300.0));
        touch.touch_move(&mut session, Point::new(130.0, 300.0));
        touch.touch_start(&mut session, &id(), Point::new(100.0, 300.0));
        assert_eq!(touch.phase(), TouchPhase::Tracking);
        assert!(log.lock().unwrap().clones.is_empty());

        touch.touch_move(&mut session, Point::new(130.0, 300.0));
        assert_eq!(touch.phase(), TouchPhase::Dragging);
        assert_eq!(log.lock().unwrap().clones.len(), 1);
    }

    #[tokio::test]
    async fn dropping_controller_removes_clone() {
        let (mut session, mut touch, log) = fixture().await;
        touch.touch_start(&mut session, &id(), Point::new(100.0, 300.0));
        touch.touch_move(&mut session, Point::new(130.0, 300.0));
        drop(touch);
        {
            let log = log.lock().unwrap();
            assert!(log.clones.is_empty());
            assert!(!log.scroll_locked);
        }

        session.flush_deferred();
        assert!(session.drag().is_none());
        assert!(!session.is_dragging());
    }

    #[tokio::test]
    async fn detach_releases_the_session_at_once() {
        let (mut session, mut touch, log) = fixture().await;
        touch.touch_start(&mut session, &id(), Point::new(100.0, 300.0));
        touch.touch_move(&mut session, Point::new(130.0, 300.0));
        touch.detach(&mut session);

        assert!(log.lock().unwrap().clones.is_empty());
        assert!(session.drag().is_none());
        session.flush_deferred();
        assert!(!session.is_dragging());
    }
}
