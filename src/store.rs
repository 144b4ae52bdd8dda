//! In-memory task collection for the signed-in user.
//!
//! The store is the only place that talks to a [`TaskBackend`]. Loading is
//! forgiving: a failing backend yields an empty board and a malformed
//! document is skipped, so drawing the board never fails on bad data.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::backend::TaskBackend;
use crate::error::{Error, Result};
use crate::task::{Task, TaskId};

/// What the last [`TaskStore::load_all`] saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
    /// Backend error message when the whole load failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed.is_none()
    }
}

pub struct TaskStore {
    backend: Arc<dyn TaskBackend>,
    user: String,
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new(backend: Arc<dyn TaskBackend>, user: impl Into<String>) -> Self {
        Self {
            backend,
            user: user.into(),
            tasks: Vec::new(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn backend(&self) -> &Arc<dyn TaskBackend> {
        &self.backend
    }

    /// Replace the collection with what the backend holds.
    pub async fn load_all(&mut self) -> LoadReport {
        let documents = match self.backend.list_tasks(&self.user).await {
            Ok(documents) => documents,
            Err(err) => {
                tracing::error!(
                    user = %self.user,
                    backend = self.backend.name(),
                    error = %err,
                    "loading tasks failed, showing an empty board"
                );
                self.tasks.clear();
                return LoadReport {
                    failed: Some(err.to_string()),
                    ..LoadReport::default()
                };
            }
        };

        let mut report = LoadReport::default();
        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(documents.len());
        for document in documents {
            match Task::from_document(document) {
                Ok(task) if seen.insert(task.id.clone()) => tasks.push(task),
                Ok(task) => {
                    tracing::warn!(task_id = %task.id, "duplicate task id in store, keeping the first");
                    report.skipped += 1;
                }
                Err(err) => {
                    tracing::warn!(error = %err, "skipping invalid task document");
                    report.skipped += 1;
                }
            }
        }

        report.loaded = tasks.len();
        self.tasks = tasks;
        tracing::debug!(
            user = %self.user,
            loaded = report.loaded,
            skipped = report.skipped,
            "tasks loaded"
        );
        report
    }

    /// Upsert one task into the backend. The in-memory copy is not touched.
    pub async fn persist(&self, task: &Task) -> Result<()> {
        self.backend.upsert_task(&self.user, task).await
    }

    /// Delete from the backend first; evict locally only when that succeeds.
    pub async fn remove(&mut self, task_id: &TaskId) -> Result<Task> {
        let position = self
            .position(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        self.backend.delete_task(&self.user, task_id).await?;
        Ok(self.tasks.remove(position))
    }

    /// Add a task, replacing any task with the same id. Returns the replaced task.
    pub fn insert(&mut self, task: Task) -> Option<Task> {
        match self.position(&task.id) {
            Some(position) => Some(std::mem::replace(&mut self.tasks[position], task)),
            None => {
                self.tasks.push(task);
                None
            }
        }
    }

    pub fn find(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == task_id)
    }

    pub fn find_mut(&mut self, task_id: &TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| &task.id == task_id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn position(&self, task_id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == task_id)
    }
}
