//! Board views and the renderer callback.
//!
//! [`partition`] is a pure function of the task list: it decides which card
//! goes in which column. Whatever draws the board implements
//! [`BoardRenderer`] and is handed finished column views.

use serde::Serialize;

use crate::column::Column;
use crate::task::{Priority, Progress, Task, TaskId};

/// Assignee badges shown on a card before the `+N` overflow badge.
pub const MAX_CARD_ASSIGNEES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardView {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub category: &'static str,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    pub assignees: Vec<String>,
    /// Assignees beyond [`MAX_CARD_ASSIGNEES`].
    pub overflow: usize,
    /// False when the search filter hides the card.
    pub visible: bool,
}

impl CardView {
    pub fn from_task(task: &Task, query: &str) -> Self {
        let shown = task.assigned_to.len().min(MAX_CARD_ASSIGNEES);
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            category: task.category.label(),
            priority: task.priority,
            progress: task.progress(),
            assignees: task.assigned_to[..shown].to_vec(),
            overflow: task.assigned_to.len() - shown,
            visible: task.matches_query(query),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnView {
    pub column: Column,
    pub cards: Vec<CardView>,
}

impl ColumnView {
    /// Placeholder text when the column has no cards.
    pub fn placeholder(&self) -> Option<&'static str> {
        self.cards.is_empty().then(|| self.column.placeholder())
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn visible_cards(&self) -> impl Iterator<Item = &CardView> {
        self.cards.iter().filter(|card| card.visible)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardView {
    pub columns: [ColumnView; 4],
}

impl BoardView {
    pub fn column(&self, column: Column) -> &ColumnView {
        &self.columns[column.status().index()]
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(ColumnView::len).sum()
    }
}

/// Group tasks into the four columns, keeping collection order within each.
pub fn partition(tasks: &[Task], query: &str) -> BoardView {
    let mut columns = Column::ALL.map(|column| ColumnView {
        column,
        cards: Vec::new(),
    });
    for task in tasks {
        columns[task.status.index()]
            .cards
            .push(CardView::from_task(task, query));
    }
    BoardView { columns }
}

/// Draws the board. Called by the session after every mutation.
pub trait BoardRenderer {
    fn render_column(&mut self, column: &ColumnView);

    fn set_highlight(&mut self, column: Column, highlighted: bool);

    fn open_details(&mut self, task: &Task);

    fn close_details(&mut self);
}

/// Renderer for headless use (command line, scripts).
#[derive(Debug, Default)]
pub struct NullRenderer;

impl BoardRenderer for NullRenderer {
    fn render_column(&mut self, column: &ColumnView) {
        tracing::trace!(column = %column.column.dom_id(), cards = column.len(), "render column");
    }

    fn set_highlight(&mut self, _column: Column, _highlighted: bool) {}

    fn open_details(&mut self, _task: &Task) {}

    fn close_details(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Status;
    use serde_json::json;

    fn task(id: u64, status: &str, title: &str) -> Task {
        Task::from_document(json!({
            "id": id,
            "title": title,
            "status": status,
            "assignedTo": ["a", "b", "c", "d", "e"],
            "subtasks": [{ "id": 1, "text": "x", "completed": true }]
        }))
        .unwrap()
    }

    #[test]
    fn every_task_lands_in_exactly_one_column() {
        let tasks = vec![
            task(1, "todo", "a"),
            task(2, "done", "b"),
            task(3, "todo", "c"),
            task(4, "awaitfeedback", "d"),
        ];
        let board = partition(&tasks, "");
        assert_eq!(board.total(), tasks.len());
        assert_eq!(board.column(Column::for_status(Status::Todo)).len(), 2);
        assert_eq!(board.column(Column::for_status(Status::InProgress)).len(), 0);

        let todo_ids: Vec<_> = board.columns[0].cards.iter().map(|card| card.id.as_str()).collect();
        assert_eq!(todo_ids, vec!["1", "3"]);
    }

    #[test]
    fn empty_column_shows_placeholder() {
        let board = partition(&[task(1, "todo", "a")], "");
        assert_eq!(board.columns[0].placeholder(), None);
        assert_eq!(board.columns[1].placeholder(), Some("No tasks In progress"));
    }

    #[test]
    fn card_caps_assignees_and_derives_progress() {
        let card = CardView::from_task(&task(1, "todo", "a"), "");
        assert_eq!(card.assignees, vec!["a", "b", "c"]);
        assert_eq!(card.overflow, 2);
        assert_eq!(card.progress, Some(Progress { completed: 1, total: 1 }));
        assert_eq!(card.category, "Technical Task");
    }

    #[test]
    fn search_hides_cards_without_dropping_them() {
        let tasks = vec![task(1, "todo", "Login page"), task(2, "todo", "Board")];
        let board = partition(&tasks, "login");
        assert_eq!(board.total(), 2);
        let visible: Vec<_> = board.columns[0].visible_cards().map(|card| card.id.as_str()).collect();
        assert_eq!(visible, vec!["1"]);
    }
}
