use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{StoreError, ValidationError};
use crate::task::{NewTask, Task, TaskPatch};

/// Persistence seam for the task collection.
pub trait TaskStore {
    fn list(&self) -> Result<Vec<Task>, StoreError>;

    /// Stores a new task with a fresh id and `completed = false`.
    fn create(&mut self, new: NewTask) -> Result<Task, StoreError>;

    fn patch(&mut self, id: u64, patch: &TaskPatch) -> Result<Task, StoreError>;

    fn delete(&mut self, id: u64) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub tasks_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let tasks_path = data_dir.join("tasks.data");
        if !tasks_path.exists() {
            fs::write(&tasks_path, "")?;
        }

        info!(
            data_dir = %data_dir.display(),
            tasks = %tasks_path.display(),
            "opened datastore"
        );

        Ok(Self {
            data_dir,
            tasks_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Vec<Task>> {
        load_jsonl(&self.tasks_path).context("failed to load tasks.data")
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_jsonl_atomic(&self.tasks_path, tasks).context("failed to save tasks.data")
    }

    /// One past the highest id on file. Ids of deleted tasks are never handed out again.
    pub fn next_id(&self, tasks: &[Task]) -> Result<u64, StoreError> {
        let max = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        max.checked_add(1).ok_or(StoreError::IdsExhausted(max))
    }
}

impl TaskStore for DataStore {
    fn list(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.load()?)
    }

    #[tracing::instrument(skip(self, new), fields(title = %new.title))]
    fn create(&mut self, new: NewTask) -> Result<Task, StoreError> {
        let title = new.title.trim();
        if title.is_empty() {
            return Err(ValidationError::Missing { field: "title" }.into());
        }

        let mut tasks = self.load()?;
        let task = Task::new(
            self.next_id(&tasks)?,
            title.to_string(),
            new.category,
            new.deadline,
        );
        tasks.push(task.clone());
        self.save(&tasks)?;

        debug!(id = task.id, count = tasks.len(), "task created");
        Ok(task)
    }

    #[tracing::instrument(skip(self, patch))]
    fn patch(&mut self, id: u64, patch: &TaskPatch) -> Result<Task, StoreError> {
        if let Some(title) = &patch.title
            && title.trim().is_empty()
        {
            return Err(ValidationError::Missing { field: "title" }.into());
        }

        let mut tasks = self.load()?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::TaskNotFound(id))?;
        if patch.is_empty() {
            debug!(id, "empty patch; store left as is");
            return Ok(task.clone());
        }
        patch.apply(task);
        task.title = task.title.trim().to_string();
        let updated = task.clone();

        self.save(&tasks)?;
        debug!(id, ?patch, "task patched");
        Ok(updated)
    }

    #[tracing::instrument(skip(self))]
    fn delete(&mut self, id: u64) -> Result<(), StoreError> {
        let mut tasks = self.load()?;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Err(StoreError::TaskNotFound(id));
        }

        self.save(&tasks)?;
        info!(id, remaining = tasks.len(), "task deleted");
        Ok(())
    }
}

#[tracing::instrument(skip(path))]
fn load_jsonl(path: &Path) -> anyhow::Result<Vec<Task>> {
    debug!(file = %path.display(), "loading jsonl");
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut out = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(trimmed)
            .with_context(|| format!("failed parsing {} line {}", path.display(), idx + 1))?;
        out.push(task);
    }

    debug!(count = out.len(), "loaded tasks from jsonl");
    Ok(out)
}

#[tracing::instrument(skip(path, tasks))]
fn save_jsonl_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving jsonl atomically");

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    for task in tasks {
        let serialized = serde_json::to_string(task)?;
        writeln!(temp, "{serialized}")?;
    }
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}
