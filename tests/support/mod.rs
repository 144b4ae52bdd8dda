#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use boardsync::backend::MemoryBackend;
use boardsync::column::{Column, ColumnBounds, Rect};
use boardsync::drag::{CloneHandle, DragSurface, PageScroll};
use boardsync::render::{BoardRenderer, ColumnView};
use boardsync::session::BoardSession;
use boardsync::store::{LoadReport, TaskStore};
use boardsync::task::{Task, TaskId};
use serde_json::{json, Value};

pub const USER: &str = "guest";
pub const VIEWPORT_HEIGHT: f64 = 800.0;
pub const COLUMN_WIDTH: f64 = 200.0;

pub fn task_doc(id: u64, title: &str, status: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": "",
        "dueDate": "2024-05-01",
        "priority": "medium",
        "assignedTo": [],
        "category": "technical-task",
        "subtasks": [],
        "status": status,
        "createdAt": "2024-04-01T10:00:00Z",
        "createdBy": USER
    })
}

pub fn task_id(raw: &str) -> TaskId {
    TaskId::new(raw).expect("task id")
}

pub fn seeded_backend(docs: Vec<Value>) -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    for doc in docs {
        backend.seed(USER, doc).expect("seed");
    }
    backend
}

/// A loaded session over `backend` that records everything it renders.
pub async fn open_session(backend: Arc<MemoryBackend>) -> (BoardSession, RecordingRenderer, LoadReport) {
    let renderer = RecordingRenderer::default();
    let store = TaskStore::new(backend, USER);
    let mut session = BoardSession::new(store, Box::new(renderer.clone()));
    let report = session.load().await;
    (session, renderer, report)
}

pub fn status_of(session: &BoardSession, raw: &str) -> Option<String> {
    session
        .find_task(&task_id(raw))
        .map(|task: &Task| task.status.as_str().to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    Column { column: Column, cards: usize },
    Highlight { column: Column, on: bool },
    OpenDetails(TaskId),
    CloseDetails,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().expect("render log").clone()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("render log").clear();
    }

    /// Card count of each column as last rendered, in column order.
    pub fn column_counts(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        for call in self.calls() {
            if let RenderCall::Column { column, cards } = call {
                counts[column.status().index()] = cards;
            }
        }
        counts
    }

    pub fn opened_details(&self) -> Vec<TaskId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RenderCall::OpenDetails(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: RenderCall) {
        self.calls.lock().expect("render log").push(call);
    }
}

impl BoardRenderer for RecordingRenderer {
    fn render_column(&mut self, column: &ColumnView) {
        self.push(RenderCall::Column {
            column: column.column,
            cards: column.len(),
        });
    }

    fn set_highlight(&mut self, column: Column, highlighted: bool) {
        self.push(RenderCall::Highlight {
            column,
            on: highlighted,
        });
    }

    fn open_details(&mut self, task: &Task) {
        self.push(RenderCall::OpenDetails(task.id.clone()));
    }

    fn close_details(&mut self) {
        self.push(RenderCall::CloseDetails);
    }
}

#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub clones_created: usize,
    pub live_clones: Vec<u64>,
    pub positions: Vec<(f64, f64)>,
    pub faded: Vec<TaskId>,
    pub scroll_locked: bool,
}

/// Four 200px wide columns side by side, full viewport height.
pub struct FakeSurface {
    log: Arc<Mutex<SurfaceLog>>,
    next_id: u64,
}

impl FakeSurface {
    pub fn new() -> (Self, Arc<Mutex<SurfaceLog>>) {
        let log = Arc::new(Mutex::new(SurfaceLog::default()));
        (
            Self {
                log: Arc::clone(&log),
                next_id: 0,
            },
            log,
        )
    }
}

impl DragSurface for FakeSurface {
    fn column_bounds(&self) -> Vec<ColumnBounds> {
        Column::ALL
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                ColumnBounds::new(
                    *column,
                    Rect::new(idx as f64 * COLUMN_WIDTH, 0.0, COLUMN_WIDTH - 1.0, VIEWPORT_HEIGHT),
                )
            })
            .collect()
    }

    fn viewport_height(&self) -> f64 {
        VIEWPORT_HEIGHT
    }

    fn create_clone(&mut self, _task_id: &TaskId) -> CloneHandle {
        self.next_id += 1;
        let mut log = self.log.lock().expect("surface log");
        log.clones_created += 1;
        log.live_clones.push(self.next_id);
        CloneHandle {
            id: self.next_id,
            width: 180.0,
        }
    }

    fn position_clone(&mut self, _clone: &CloneHandle, left: f64, top: f64) {
        self.log.lock().expect("surface log").positions.push((left, top));
    }

    fn remove_clone(&mut self, clone: &CloneHandle) {
        self.log
            .lock()
            .expect("surface log")
            .live_clones
            .retain(|id| *id != clone.id);
    }

    fn set_source_faded(&mut self, task_id: &TaskId, faded: bool) {
        let mut log = self.log.lock().expect("surface log");
        if faded {
            log.faded.push(task_id.clone());
        } else {
            log.faded.retain(|id| id != task_id);
        }
    }

    fn set_page_scroll_locked(&mut self, locked: bool) {
        self.log.lock().expect("surface log").scroll_locked = locked;
    }
}

#[derive(Debug, Default)]
pub struct RecordingPage {
    deltas: Mutex<Vec<f64>>,
}

impl RecordingPage {
    pub fn deltas(&self) -> Vec<f64> {
        self.deltas.lock().expect("scroll log").clone()
    }
}

impl PageScroll for RecordingPage {
    fn scroll_by(&self, dy: f64) {
        self.deltas.lock().expect("scroll log").push(dy);
    }
}
