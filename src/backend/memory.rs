//! In-process store with failure injection, used by tests and `kind = "memory"`.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use super::{document_id, TaskBackend};
use crate::error::{Error, Result};
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    List,
    Upsert,
    Delete,
}

#[derive(Default)]
struct State {
    users: HashMap<String, Vec<Value>>,
    fail_next: Vec<BackendOp>,
    upserts: usize,
    deletes: usize,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Backend("memory store poisoned".to_string()))
    }

    /// Store a raw document as-is, bypassing validation.
    pub fn seed(&self, user: &str, document: Value) -> Result<()> {
        self.state()?
            .users
            .entry(user.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    /// Make the next call of `op` fail once.
    pub fn fail_next(&self, op: BackendOp) -> Result<()> {
        self.state()?.fail_next.push(op);
        Ok(())
    }

    pub fn upsert_count(&self) -> usize {
        self.state().map(|state| state.upserts).unwrap_or(0)
    }

    pub fn delete_count(&self) -> usize {
        self.state().map(|state| state.deletes).unwrap_or(0)
    }

    /// Raw documents currently stored for `user`.
    pub fn documents(&self, user: &str) -> Vec<Value> {
        self.state()
            .ok()
            .and_then(|state| state.users.get(user).cloned())
            .unwrap_or_default()
    }
}

fn take_failure(state: &mut State, op: BackendOp) -> Result<()> {
    if let Some(pos) = state.fail_next.iter().position(|pending| *pending == op) {
        state.fail_next.remove(pos);
        return Err(Error::Backend(format!("injected {op:?} failure")));
    }
    Ok(())
}

#[async_trait]
impl TaskBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_tasks(&self, user: &str) -> Result<Vec<Value>> {
        let mut state = self.state()?;
        take_failure(&mut state, BackendOp::List)?;
        Ok(state.users.get(user).cloned().unwrap_or_default())
    }

    async fn upsert_task(&self, user: &str, task: &Task) -> Result<()> {
        let document = task.to_document()?;
        let mut state = self.state()?;
        take_failure(&mut state, BackendOp::Upsert)?;
        state.upserts += 1;

        let documents = state.users.entry(user.to_string()).or_default();
        let id = task.id.as_str();
        match documents
            .iter_mut()
            .find(|existing| document_id(existing).as_deref() == Some(id))
        {
            Some(existing) => *existing = document,
            None => documents.push(document),
        }
        Ok(())
    }

    async fn delete_task(&self, user: &str, task_id: &TaskId) -> Result<()> {
        let mut state = self.state()?;
        take_failure(&mut state, BackendOp::Delete)?;
        state.deletes += 1;

        if let Some(documents) = state.users.get_mut(user) {
            documents.retain(|existing| document_id(existing).as_deref() != Some(task_id.as_str()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Status;
    use serde_json::json;

    fn task(id: &str) -> Task {
        Task::from_document(json!({ "id": id, "title": "Card", "status": "todo" })).unwrap()
    }

    #[tokio::test]
    async fn upsert_is_idempotent_by_id() {
        let backend = MemoryBackend::new();
        let mut card = task("1");
        backend.upsert_task("u", &card).await.unwrap();
        card.status = Status::Done;
        backend.upsert_task("u", &card).await.unwrap();

        let documents = backend.list_tasks("u").await.unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["status"], json!("done"));
        assert_eq!(backend.upsert_count(), 2);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let backend = MemoryBackend::new();
        backend.fail_next(BackendOp::Delete).unwrap();
        let id = TaskId::new("1").unwrap();
        assert!(backend.delete_task("u", &id).await.is_err());
        assert!(backend.delete_task("u", &id).await.is_ok());
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let backend = MemoryBackend::new();
        backend.upsert_task("a", &task("1")).await.unwrap();
        assert!(backend.list_tasks("b").await.unwrap().is_empty());
    }
}
