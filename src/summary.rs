//! Dashboard metrics over the current task collection.

use chrono::NaiveDate;
use serde::Serialize;

use crate::task::{Priority, Status, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BoardSummary {
    pub todo: usize,
    pub in_progress: usize,
    pub await_feedback: usize,
    pub done: usize,
    /// Every task on the board.
    pub total: usize,
    /// Urgent tasks that are not done.
    pub urgent: usize,
    /// Earliest due date among open urgent tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_deadline: Option<NaiveDate>,
}

impl BoardSummary {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut summary = BoardSummary {
            total: tasks.len(),
            ..BoardSummary::default()
        };
        for task in tasks {
            match task.status {
                Status::Todo => summary.todo += 1,
                Status::InProgress => summary.in_progress += 1,
                Status::AwaitFeedback => summary.await_feedback += 1,
                Status::Done => summary.done += 1,
            }
            if task.priority == Priority::Urgent && task.status != Status::Done {
                summary.urgent += 1;
                if let Some(due) = task.due_date() {
                    summary.next_deadline = Some(match summary.next_deadline {
                        Some(current) => current.min(due),
                        None => due,
                    });
                }
            }
        }
        summary
    }

    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Todo => self.todo,
            Status::InProgress => self.in_progress,
            Status::AwaitFeedback => self.await_feedback,
            Status::Done => self.done,
        }
    }

    /// Deadline the way the dashboard prints it, e.g. `October 16, 2022`.
    pub fn next_deadline_label(&self) -> Option<String> {
        self.next_deadline
            .map(|date| date.format("%B %-d, %Y").to_string())
    }
}
