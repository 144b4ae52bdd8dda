//! boardsync task command implementations.

use chrono::Utc;
use serde::Serialize;

use crate::cli::context::BoardContext;
use crate::cli::GlobalOptions;
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::render::CardView;
use crate::summary::BoardSummary;
use crate::task::{Category, NewTask, Priority, Progress, Status, Task, TaskEdit};
use crate::transition::MoveOutcome;

pub struct ListOptions {
    pub status: Option<String>,
    pub search: Option<String>,
    pub global: GlobalOptions,
}

pub struct ShowOptions {
    pub id: String,
    pub global: GlobalOptions,
}

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub due: Option<String>,
    pub priority: String,
    pub category: String,
    pub assignees: Vec<String>,
    pub subtasks: Vec<String>,
    pub global: GlobalOptions,
}

pub struct MoveOptions {
    pub id: String,
    pub status: String,
    pub global: GlobalOptions,
}

pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub assignees: Option<Vec<String>>,
    pub global: GlobalOptions,
}

pub struct ToggleOptions {
    pub id: String,
    /// 1-based
    pub index: usize,
    pub global: GlobalOptions,
}

pub struct DeleteOptions {
    pub id: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct ColumnOutput {
    status: Status,
    label: &'static str,
    total: usize,
    cards: Vec<CardView>,
}

#[derive(Serialize)]
struct ListOutput {
    total: usize,
    columns: Vec<ColumnOutput>,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    task: &'a Task,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<Progress>,
}

#[derive(Serialize)]
struct AddOutput {
    task: Task,
    total: usize,
}

#[derive(Serialize)]
struct ToggleOutput {
    task_id: String,
    index: usize,
    completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<Progress>,
}

#[derive(Serialize)]
struct DeleteOutput {
    task_id: String,
    title: String,
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let status = options
        .status
        .as_deref()
        .map(str::parse::<Status>)
        .transpose()?;

    let mut ctx = BoardContext::open(options.global)?;
    ctx.require_loaded()?;
    if let Some(query) = &options.search {
        ctx.session.set_search(query.as_str());
    }
    let view = ctx.session.board_view();

    let columns: Vec<ColumnOutput> = view
        .columns
        .iter()
        .filter(|column| status.map_or(true, |status| column.column.status() == status))
        .map(|column| ColumnOutput {
            status: column.column.status(),
            label: column.column.status().label(),
            total: column.visible_cards().count(),
            cards: column.visible_cards().cloned().collect(),
        })
        .collect();
    let output = ListOutput {
        total: columns.iter().map(|column| column.total).sum(),
        columns,
    };

    let mut human = HumanOutput::new("Board");
    human.push_summary("User", ctx.config.user.clone());
    human.push_summary("Total", output.total.to_string());
    if let Some(query) = &options.search {
        human.push_summary("Search", query.clone());
    }
    for warning in ctx.load_warnings() {
        human.push_warning(warning);
    }
    for column in &output.columns {
        human.push_detail(format!("{} ({})", column.label, column.total));
        if column.cards.is_empty() {
            human.push_detail(format!("  {}", column.status_placeholder()));
        }
        for card in &column.cards {
            human.push_detail(format!("  {}", card_line(card)));
        }
    }

    emit_success(ctx.output, "list", &output, Some(&human))
}

impl ColumnOutput {
    fn status_placeholder(&self) -> &'static str {
        crate::column::Column::for_status(self.status).placeholder()
    }
}

fn card_line(card: &CardView) -> String {
    let mut line = format!("[{}] {} {}", card.priority, card.id, card.title);
    if let Some(progress) = card.progress {
        line.push_str(&format!(" ({}/{} subtasks)", progress.completed, progress.total));
    }
    if !card.assignees.is_empty() {
        line.push_str(&format!(" @{}", card.assignees.join(",")));
        if card.overflow > 0 {
            line.push_str(&format!(" +{}", card.overflow));
        }
    }
    line
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = BoardContext::open(options.global)?;
    ctx.require_loaded()?;
    let id = ctx.task_id(&options.id)?;
    let Some(task) = ctx.session.find_task(&id) else {
        return Err(Error::TaskNotFound(id.to_string()));
    };

    let output = ShowOutput {
        task,
        progress: task.progress(),
    };

    let mut human = HumanOutput::new(format!("Task {}: {}", task.id, task.title));
    human.push_summary("Status", task.status.label());
    human.push_summary("Priority", task.priority.as_str());
    human.push_summary("Category", task.category.label());
    if !task.due_date.is_empty() {
        human.push_summary("Due", task.due_date.clone());
    }
    if !task.assigned_to.is_empty() {
        human.push_summary("Assigned", task.assigned_to.join(", "));
    }
    if !task.description.is_empty() {
        human.push_detail(task.description.clone());
    }
    for (idx, subtask) in task.subtasks.iter().enumerate() {
        let mark = if subtask.completed { "x" } else { " " };
        human.push_detail(format!("{}. [{mark}] {}", idx + 1, subtask.text));
    }

    emit_success(ctx.output, "show", &output, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let new_task = NewTask {
        title: options.title,
        description: options.description.unwrap_or_default(),
        due_date: options.due.unwrap_or_default(),
        priority: options.priority.parse::<Priority>()?,
        assigned_to: options.assignees,
        category: options.category.parse::<Category>()?,
        subtasks: options.subtasks,
        created_by: None,
    };

    let mut ctx = BoardContext::open(options.global)?;
    let task = NewTask {
        created_by: Some(ctx.config.user.clone()),
        ..new_task
    }
    .into_task(Utc::now())?;

    let report = ctx.runtime.block_on(ctx.session.add_task(task.clone()))?;
    let output = AddOutput {
        task,
        total: report.loaded,
    };

    let mut human = HumanOutput::new(format!("Added task {}", output.task.id));
    human.push_summary("Title", output.task.title.clone());
    human.push_summary("Column", Status::Todo.label());
    human.push_next_step(format!("boardsync move {} in-progress", output.task.id));

    emit_success(ctx.output, "add", &output, Some(&human))
}

pub fn run_move(options: MoveOptions) -> Result<()> {
    let status = options.status.parse::<Status>()?;
    let mut ctx = BoardContext::open(options.global)?;
    ctx.require_loaded()?;
    let id = ctx.task_id(&options.id)?;

    let outcome = ctx.runtime.block_on(ctx.session.move_task(&id, status))?;
    let header = match &outcome {
        MoveOutcome::Moved(transition) => format!(
            "Moved task {} from {} to {}",
            transition.task_id,
            transition.from.label(),
            transition.to.label()
        ),
        MoveOutcome::Unchanged { task_id, status } => {
            format!("Task {task_id} is already in {}", status.label())
        }
        MoveOutcome::UnknownTask { task_id } => return Err(Error::TaskNotFound(task_id.to_string())),
    };

    let human = HumanOutput::new(header);
    emit_success(ctx.output, "move", &outcome, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let edit = TaskEdit {
        title: options.title,
        description: options.description,
        due_date: options.due,
        priority: options.priority.as_deref().map(str::parse).transpose()?,
        assigned_to: options.assignees,
        category: options.category.as_deref().map(str::parse).transpose()?,
        subtasks: None,
        status: options.status.as_deref().map(str::parse).transpose()?,
    };
    if edit.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to edit; pass at least one field flag".to_string(),
        ));
    }

    let mut ctx = BoardContext::open(options.global)?;
    ctx.require_loaded()?;
    let id = ctx.task_id(&options.id)?;
    let task = ctx.runtime.block_on(ctx.session.save_edit(&id, &edit))?;

    let mut human = HumanOutput::new(format!("Updated task {}", task.id));
    human.push_summary("Title", task.title.clone());
    human.push_summary("Status", task.status.label());
    emit_success(ctx.output, "edit", &task, Some(&human))
}

pub fn run_toggle(options: ToggleOptions) -> Result<()> {
    if options.index == 0 {
        return Err(Error::InvalidArgument(
            "subtask index starts at 1".to_string(),
        ));
    }

    let mut ctx = BoardContext::open(options.global)?;
    ctx.require_loaded()?;
    let id = ctx.task_id(&options.id)?;
    let completed = ctx
        .runtime
        .block_on(ctx.session.toggle_subtask(&id, options.index - 1))
        .map_err(|err| match err {
            Error::SubtaskOutOfRange { task_id, .. } => Error::SubtaskOutOfRange {
                task_id,
                index: options.index,
            },
            other => other,
        })?;

    let progress = ctx.session.find_task(&id).and_then(Task::progress);
    let output = ToggleOutput {
        task_id: id.to_string(),
        index: options.index,
        completed,
        progress,
    };

    let state = if completed { "done" } else { "open" };
    let mut human = HumanOutput::new(format!("Subtask {} of task {id} is {state}", options.index));
    if let Some(progress) = progress {
        human.push_summary(
            "Progress",
            format!("{}/{}", progress.completed, progress.total),
        );
    }
    emit_success(ctx.output, "toggle", &output, Some(&human))
}

pub fn run_delete(options: DeleteOptions) -> Result<()> {
    let mut ctx = BoardContext::open(options.global)?;
    ctx.require_loaded()?;
    let id = ctx.task_id(&options.id)?;
    let removed = ctx.runtime.block_on(ctx.session.delete_task(&id))?;

    let output = DeleteOutput {
        task_id: removed.id.to_string(),
        title: removed.title,
    };
    let human = HumanOutput::new(format!("Deleted task {}", output.task_id));
    emit_success(ctx.output, "delete", &output, Some(&human))
}

pub fn run_summary(global: GlobalOptions) -> Result<()> {
    let ctx = BoardContext::open(global)?;
    ctx.require_loaded()?;
    let summary = BoardSummary::from_tasks(ctx.session.tasks());

    let mut human = HumanOutput::new("Summary");
    for status in Status::ALL {
        human.push_summary(status.label(), summary.count(status).to_string());
    }
    human.push_summary("Tasks in board", summary.total.to_string());
    human.push_summary("Urgent", summary.urgent.to_string());
    if let Some(deadline) = summary.next_deadline_label() {
        human.push_summary("Upcoming deadline", deadline);
    }
    emit_success(ctx.output, "summary", &summary, Some(&human))
}
