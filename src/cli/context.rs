//! Shared setup for commands: data dir, config, store and session.

use std::path::PathBuf;

use tokio::runtime::Runtime;

use crate::backend::open_backend;
use crate::cli::GlobalOptions;
use crate::config::{resolve_data_dir, Config};
use crate::error::{Error, Result};
use crate::events::EventDestination;
use crate::output::OutputOptions;
use crate::render::{BoardRenderer, NullRenderer};
use crate::session::BoardSession;
use crate::storage::Storage;
use crate::store::{LoadReport, TaskStore};
use crate::task::TaskId;

pub struct BoardContext {
    pub data_dir: PathBuf,
    pub config: Config,
    pub storage: Storage,
    pub runtime: Runtime,
    pub session: BoardSession,
    pub load_report: LoadReport,
    pub output: OutputOptions,
}

impl BoardContext {
    pub fn open(global: GlobalOptions) -> Result<Self> {
        Self::open_with(global, Box::new(NullRenderer))
    }

    /// Load config, open the store and load the board.
    pub fn open_with(global: GlobalOptions, renderer: Box<dyn BoardRenderer>) -> Result<Self> {
        let data_dir = resolve_data_dir(global.dir.as_deref())?;
        let mut config = Config::load_from_dir(&data_dir)?;
        if let Some(user) = global.user {
            config.user = user;
            config.validate()?;
        }

        let storage = Storage::new(&data_dir, config.store.lock_timeout_ms);
        let backend = open_backend(config.store.kind, storage.clone());
        let store = TaskStore::new(backend, config.user.trim());

        let mut session = BoardSession::new(store, renderer).with_persist(config.persist.clone());
        if let Some(destination) = EventDestination::parse(global.events.as_deref()) {
            session = session.with_events(destination.open()?);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| Error::OperationFailed(format!("failed to start runtime: {err}")))?;
        let load_report = runtime.block_on(session.load());

        let events_to_stdout = global
            .events
            .as_deref()
            .map(|value| value.trim() == "-")
            .unwrap_or(false);
        let output = OutputOptions {
            json: global.json && !events_to_stdout,
            quiet: global.quiet || events_to_stdout,
        };

        Ok(Self {
            data_dir,
            config,
            storage,
            runtime,
            session,
            load_report,
            output,
        })
    }

    /// Commands that read tasks must not pretend an unreachable store is empty.
    pub fn require_loaded(&self) -> Result<()> {
        match &self.load_report.failed {
            Some(reason) => Err(Error::Backend(reason.clone())),
            None => Ok(()),
        }
    }

    pub fn task_id(&self, raw: &str) -> Result<TaskId> {
        let id = TaskId::new(raw)?;
        if self.session.find_task(&id).is_none() {
            return Err(Error::TaskNotFound(id.to_string()));
        }
        Ok(id)
    }

    /// Warnings worth showing for the load that opened this context.
    pub fn load_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.load_report.skipped > 0 {
            warnings.push(format!(
                "{} invalid task document(s) skipped",
                self.load_report.skipped
            ));
        }
        warnings
    }
}
