mod support;

use boardsync::column::{Column, Point};
use boardsync::drag::{DragPayload, TRANSFER_MIME};
use boardsync::error::Error;
use boardsync::session::DragInput;
use boardsync::task::Status;
use boardsync::transition::MoveOutcome;

use support::{open_session, seeded_backend, status_of, task_doc, task_id, RenderCall};

#[tokio::test]
async fn drag_and_drop_moves_the_card() {
    let backend = seeded_backend(vec![task_doc(1, "Login page", "todo")]);
    let (mut session, renderer, _) = open_session(backend.clone()).await;
    let done = Column::for_status(Status::Done);
    assert_eq!(renderer.column_counts(), [1, 0, 0, 0]);

    let payload = session.pointer().drag_start(&task_id("1")).expect("drag start");
    assert_eq!(payload.mime, TRANSFER_MIME);
    assert!(session.pointer().drag_over(&done.dom_id()));
    session.pointer().drag_enter(&done.dom_id());
    assert_eq!(session.highlighted(), Some(done));

    let outcome = session
        .pointer()
        .drop(&done.dom_id(), Some(&payload))
        .await
        .expect("drop");
    session.pointer().drag_end();

    assert!(matches!(outcome, Some(MoveOutcome::Moved(_))));
    assert_eq!(status_of(&session, "1").as_deref(), Some("done"));
    assert_eq!(renderer.column_counts(), [0, 0, 0, 1]);
    assert_eq!(session.highlighted(), None);
    assert_eq!(backend.upsert_count(), 1);
    assert!(renderer.calls().contains(&RenderCall::Highlight {
        column: done,
        on: false
    }));

    // The dragged task is cleared on the next turn, not immediately.
    assert!(session.drag().is_some());
    session.flush_deferred();
    assert!(session.drag().is_none());
}

#[tokio::test]
async fn drop_outside_any_column_changes_nothing() {
    let backend = seeded_backend(vec![task_doc(1, "Login page", "todo")]);
    let (mut session, _, _) = open_session(backend.clone()).await;

    let payload = session.pointer().drag_start(&task_id("1")).expect("drag start");
    assert!(!session.pointer().drag_over("board-header"));
    let outcome = session
        .pointer()
        .drop("board-header", Some(&payload))
        .await
        .expect("drop");
    session.pointer().drag_end();
    session.flush_deferred();

    assert!(outcome.is_none());
    assert_eq!(status_of(&session, "1").as_deref(), Some("todo"));
    assert_eq!(backend.upsert_count(), 0);
}

#[tokio::test]
async fn drag_leave_only_clears_the_column_it_left() {
    let backend = seeded_backend(vec![task_doc(1, "Login page", "todo")]);
    let (mut session, _, _) = open_session(backend).await;
    let todo = Column::for_status(Status::Todo);
    let review = Column::for_status(Status::AwaitFeedback);

    session.pointer().drag_start(&task_id("1")).expect("drag start");
    session.pointer().drag_enter(&todo.dom_id());
    session.pointer().drag_enter(&review.dom_id());
    session.pointer().drag_leave(&todo.dom_id());
    assert_eq!(session.highlighted(), Some(review));
    session.pointer().drag_leave(&review.dom_id());
    assert_eq!(session.highlighted(), None);
}

#[tokio::test]
async fn payload_is_used_when_the_session_lost_the_drag() {
    let backend = seeded_backend(vec![task_doc(7, "Board", "inprogress")]);
    let (mut session, _, _) = open_session(backend).await;
    let payload = DragPayload::for_task(&task_id("7"));

    let outcome = session
        .pointer()
        .drop(&Column::for_status(Status::Todo).dom_id(), Some(&payload))
        .await
        .expect("drop");
    assert!(outcome.map(|outcome| outcome.is_moved()).unwrap_or(false));
    assert_eq!(status_of(&session, "7").as_deref(), Some("todo"));
}

#[tokio::test]
async fn only_one_drag_at_a_time() {
    let backend = seeded_backend(vec![task_doc(1, "a", "todo"), task_doc(2, "b", "todo")]);
    let (mut session, _, _) = open_session(backend).await;

    session
        .pointer()
        .drag_start_at(&task_id("1"), Point::new(5.0, 5.0))
        .expect("first drag");
    let err = session
        .pointer()
        .drag_start(&task_id("2"))
        .expect_err("second drag");
    assert!(matches!(err, Error::DragInProgress(_)));

    let err = session.pointer().drag_start(&task_id("99")).expect_err("unknown");
    assert!(matches!(err, Error::TaskNotFound(_)));
}

#[tokio::test]
async fn drag_without_end_is_recovered_by_cancel() {
    let backend = seeded_backend(vec![task_doc(1, "Login page", "todo")]);
    let (mut session, renderer, _) = open_session(backend.clone()).await;
    let done = Column::for_status(Status::Done);

    session
        .pointer()
        .drag_start_at(&task_id("1"), Point::new(4.0, 2.0))
        .expect("drag start");
    session.pointer().drag_enter(&done.dom_id());
    // Neither drop nor drag end arrives; later turns do not free the drag.
    session.flush_deferred();
    assert!(session.drag().is_some());
    assert!(!session.request_details(&task_id("1")));

    session.pointer().cancel();
    assert!(session.drag().is_none());
    assert_eq!(session.highlighted(), None);
    assert!(renderer.calls().contains(&RenderCall::Highlight {
        column: done,
        on: false
    }));
    assert!(session.request_details(&task_id("1")));
    session
        .pointer()
        .drag_start(&task_id("1"))
        .expect("drag after cancel");
    assert_eq!(status_of(&session, "1").as_deref(), Some("todo"));
    assert_eq!(backend.upsert_count(), 0);
}

#[tokio::test]
async fn cancel_leaves_a_touch_drag_alone() {
    let backend = seeded_backend(vec![task_doc(1, "Login page", "todo")]);
    let (mut session, _, _) = open_session(backend).await;

    session
        .begin_drag(&task_id("1"), DragInput::Touch, Point::new(0.0, 0.0))
        .expect("touch drag");
    session.pointer().cancel();
    assert!(session.drag().is_some());
}
