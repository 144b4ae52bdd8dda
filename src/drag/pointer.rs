//! Pointer drag: drag start on a card, enter/leave/over on columns, drop.

use serde::Serialize;

use crate::column::{Column, Point};
use crate::error::{Error, Result};
use crate::session::{BoardSession, Deferred, DragInput};
use crate::task::TaskId;
use crate::transition::MoveOutcome;

/// Transfer format carrying the dragged task id.
pub const TRANSFER_MIME: &str = "text/plain";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DragPayload {
    pub mime: &'static str,
    pub data: String,
}

impl DragPayload {
    pub fn for_task(task_id: &TaskId) -> Self {
        Self {
            mime: TRANSFER_MIME,
            data: task_id.to_string(),
        }
    }

    pub fn task_id(&self) -> Option<TaskId> {
        if self.mime != TRANSFER_MIME {
            return None;
        }
        TaskId::new(self.data.as_str()).ok()
    }
}

/// Pointer controller borrowed from [`BoardSession::pointer`].
pub struct PointerDrag<'s> {
    session: &'s mut BoardSession,
}

impl<'s> PointerDrag<'s> {
    pub(crate) fn new(session: &'s mut BoardSession) -> Self {
        Self { session }
    }

    pub fn drag_start(&mut self, task_id: &TaskId) -> Result<DragPayload> {
        self.drag_start_at(task_id, Point::new(0.0, 0.0))
    }

    /// Start dragging a card grabbed at `at`.
    pub fn drag_start_at(&mut self, task_id: &TaskId, at: Point) -> Result<DragPayload> {
        if self.session.find_task(task_id).is_none() {
            return Err(Error::TaskNotFound(task_id.to_string()));
        }
        self.session.begin_drag(task_id, DragInput::Pointer, at)?;
        Ok(DragPayload::for_task(task_id))
    }

    pub fn drag_move(&mut self, at: Point) {
        self.session.update_drag(at);
    }

    /// Whether a drop is allowed over the element with this id.
    pub fn drag_over(&self, column_id: &str) -> bool {
        Column::from_dom_id(column_id).is_some()
    }

    pub fn drag_enter(&mut self, column_id: &str) {
        if let Some(column) = Column::from_dom_id(column_id) {
            self.session.set_highlight(Some(column));
        }
    }

    pub fn drag_leave(&mut self, column_id: &str) {
        if let Some(column) = Column::from_dom_id(column_id) {
            if self.session.highlighted() == Some(column) {
                self.session.set_highlight(None);
            }
        }
    }

    /// Drop onto `column_id`. The session's drag wins over the payload; the
    /// payload is only used when the session lost track of the drag.
    ///
    /// Returns `None` when the drop had no valid column or no task.
    pub async fn drop(
        &mut self,
        column_id: &str,
        payload: Option<&DragPayload>,
    ) -> Result<Option<MoveOutcome>> {
        self.session.set_highlight(None);

        let Some(column) = Column::from_dom_id(column_id) else {
            tracing::debug!(column_id, "drop outside any column ignored");
            return Ok(None);
        };
        let task_id = match self.session.dragged_task_id() {
            Some(task_id) => task_id.clone(),
            None => match payload.and_then(DragPayload::task_id) {
                Some(task_id) => task_id,
                None => {
                    tracing::warn!(column_id, "drop without a dragged task ignored");
                    return Ok(None);
                }
            },
        };

        let outcome = self.session.move_task(&task_id, column.status()).await?;
        Ok(Some(outcome))
    }

    /// Drag finished (dropped or not). The dragged task is forgotten on the
    /// next event turn so the click that ends the drag cannot open details.
    pub fn drag_end(&mut self) {
        self.session.set_highlight(None);
        if let Some(generation) = self.session.drag().map(|drag| drag.generation) {
            self.session.defer(Deferred::ClearDraggedTask { generation });
        }
    }

    /// The drag ended without a drop or drag end reaching us (button
    /// released outside the window, focus lost). The pointer drag is
    /// forgotten immediately; a touch drag in flight is left alone.
    pub fn cancel(&mut self) {
        let Some(drag) = self.session.drag() else {
            return;
        };
        if drag.input != DragInput::Pointer {
            return;
        }
        let generation = drag.generation;
        tracing::debug!(generation, "pointer drag cancelled");
        self.session.set_highlight(None);
        self.session.abort_drag(generation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::render::NullRenderer;
    use crate::store::TaskStore;
    use crate::task::Status;
    use serde_json::json;
    use std::sync::Arc;

    async fn session() -> BoardSession {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .seed("u", json!({ "id": 1, "title": "one", "status": "todo" }))
            .unwrap();
        let mut session = BoardSession::new(TaskStore::new(backend, "u"), Box::new(NullRenderer));
        session.load().await;
        session
    }

    fn id() -> TaskId {
        TaskId::new("1").unwrap()
    }

    #[tokio::test]
    async fn drop_on_column_moves_task() {
        let mut session = session().await;
        let mut pointer = session.pointer();
        let payload = pointer.drag_start(&id()).unwrap();
        assert_eq!(payload.data, "1");
        assert!(pointer.drag_over("column-done"));

        let outcome = pointer.drop("column-done", Some(&payload)).await.unwrap();
        assert!(outcome.unwrap().is_moved());
        pointer.drag_end();

        assert_eq!(session.find_task(&id()).unwrap().status, Status::Done);
        assert!(session.dragged_task_id().is_some());
        session.flush_deferred();
        assert!(session.dragged_task_id().is_none());
    }

    #[tokio::test]
    async fn drop_outside_columns_is_a_no_op() {
        let mut session = session().await;
        let mut pointer = session.pointer();
        pointer.drag_start(&id()).unwrap();
        assert!(!pointer.drag_over("sidebar"));
        assert!(pointer.drop("sidebar", None).await.unwrap().is_none());
        pointer.drag_end();
        assert_eq!(session.find_task(&id()).unwrap().status, Status::Todo);
    }

    #[tokio::test]
    async fn payload_is_used_when_drag_was_lost() {
        let mut session = session().await;
        let payload = DragPayload::for_task(&id());
        let outcome = session
            .pointer()
            .drop("inprogress-list", Some(&payload))
            .await
            .unwrap();
        assert!(outcome.unwrap().is_moved());
        assert_eq!(session.find_task(&id()).unwrap().status, Status::InProgress);
    }

    #[tokio::test]
    async fn enter_and_leave_toggle_one_highlight() {
        let mut session = session().await;
        let mut pointer = session.pointer();
        pointer.drag_enter("column-todo");
        pointer.drag_enter("column-done");
        pointer.drag_leave("column-todo");
        assert_eq!(session.highlighted(), Some(Column::for_status(Status::Done)));
        session.pointer().drag_leave("column-done");
        assert_eq!(session.highlighted(), None);
    }

    #[tokio::test]
    async fn unknown_card_cannot_be_dragged() {
        let mut session = session().await;
        let missing = TaskId::new("404").unwrap();
        assert!(matches!(
            session.pointer().drag_start(&missing),
            Err(Error::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn cancel_forgets_a_drag_that_never_ended() {
        let mut session = session().await;
        session.pointer().drag_start(&id()).unwrap();
        session.pointer().drag_enter("column-done");
        session.pointer().cancel();

        assert!(session.drag().is_none());
        assert_eq!(session.highlighted(), None);
        assert!(session.pointer().drag_start(&id()).is_ok());
    }

    #[test]
    fn payload_with_other_mime_is_ignored() {
        let payload = DragPayload {
            mime: "text/uri-list",
            data: "1".to_string(),
        };
        assert!(payload.task_id().is_none());
    }
}
