//! Status transitions.
//!
//! All four statuses are connected to each other; a move is valid for any
//! known task and any status. This module only decides what a move means.
//! Applying it (persist, redraw) is [`crate::session::BoardSession::move_task`].

use serde::Serialize;

use crate::task::{Status, Task, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub task_id: TaskId,
    pub from: Status,
    pub to: Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved(StatusTransition),
    /// Already in the requested status.
    Unchanged { task_id: TaskId, status: Status },
    /// No task with that id; nothing happened.
    UnknownTask { task_id: TaskId },
}

impl MoveOutcome {
    pub fn is_moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved(_))
    }

    pub fn task_id(&self) -> &TaskId {
        match self {
            MoveOutcome::Moved(transition) => &transition.task_id,
            MoveOutcome::Unchanged { task_id, .. } | MoveOutcome::UnknownTask { task_id } => task_id,
        }
    }
}

/// Classify a move of `task_id` to `to` against the current collection.
pub fn plan_move(tasks: &[Task], task_id: &TaskId, to: Status) -> MoveOutcome {
    match tasks.iter().find(|task| &task.id == task_id) {
        None => MoveOutcome::UnknownTask {
            task_id: task_id.clone(),
        },
        Some(task) if task.status == to => MoveOutcome::Unchanged {
            task_id: task_id.clone(),
            status: to,
        },
        Some(task) => MoveOutcome::Moved(StatusTransition {
            task_id: task_id.clone(),
            from: task.status,
            to,
        }),
    }
}
