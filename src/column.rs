//! The four fixed board columns and their geometry.
//!
//! Columns are never persisted; they are derived from [`Status`] whenever the
//! board is drawn or a drop target has to be resolved.

use serde::Serialize;

use crate::task::Status;

const COLUMN_ID_PREFIX: &str = "column-";
const LIST_ID_SUFFIX: &str = "-list";

/// A board column. One per status, always in [`Status::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Column(Status);

impl Column {
    pub const ALL: [Column; 4] = [
        Column(Status::Todo),
        Column(Status::InProgress),
        Column(Status::AwaitFeedback),
        Column(Status::Done),
    ];

    pub fn for_status(status: Status) -> Self {
        Column(status)
    }

    pub fn status(self) -> Status {
        self.0
    }

    /// Element id of the column container, e.g. `column-inprogress`.
    pub fn dom_id(self) -> String {
        format!("{COLUMN_ID_PREFIX}{}", self.0.storage_key())
    }

    /// Element id of the card list inside the column, e.g. `done-list`.
    pub fn list_id(self) -> String {
        format!("{}{LIST_ID_SUFFIX}", self.0.storage_key())
    }

    pub fn placeholder(self) -> &'static str {
        match self.0 {
            Status::Todo => "No tasks To do",
            Status::InProgress => "No tasks In progress",
            Status::AwaitFeedback => "No tasks Await feedback",
            Status::Done => "No tasks Done",
        }
    }

    /// Resolve a column from either its container id or its list id.
    ///
    /// Anything else, including ids that merely look similar, is not a
    /// column.
    pub fn from_dom_id(id: &str) -> Option<Self> {
        let id = id.trim();
        let key = id
            .strip_prefix(COLUMN_ID_PREFIX)
            .or_else(|| id.strip_suffix(LIST_ID_SUFFIX))?;
        Status::ALL
            .into_iter()
            .find(|status| status.storage_key() == key)
            .map(Column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Client-space bounding rectangle, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x <= self.right && point.y >= self.top && point.y <= self.bottom
    }
}

/// Bounds of one column element as measured by the view, keyed by element id.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBounds {
    pub id: String,
    pub rect: Rect,
}

impl ColumnBounds {
    pub fn new(column: Column, rect: Rect) -> Self {
        Self {
            id: column.dom_id(),
            rect,
        }
    }
}

/// First column (in document order) whose rectangle contains `point`.
///
/// Elements whose id does not name a column are skipped, so an unrelated
/// container under the finger never becomes a drop target.
pub fn column_at(bounds: &[ColumnBounds], point: Point) -> Option<Column> {
    bounds
        .iter()
        .filter(|entry| entry.rect.contains(point))
        .find_map(|entry| Column::from_dom_id(&entry.id))
}
