use crate::error::AppError;
use crate::model::{NewTask, Priority, Task, normalize_category, now_timestamp, parse_due_date};
use crate::storage::json_store::{self, MAX_TASK_ID, TaskState};
use serde::Serialize;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use time::{Date, PrimitiveDateTime};

/// Owns the task list, the undo stack of completion snapshots and the file
/// they are persisted to. Every mutation is written through immediately.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    tasks: Vec<Task>,
    undo: Vec<Task>,
    next_id: u32,
    persist_error: Option<AppError>,
}

/// Result of `TaskStore::open`: the store, plus the load error it recovered from.
#[derive(Debug)]
pub struct StoreLoad {
    pub store: TaskStore,
    pub error: Option<AppError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Completed(Task),
    AlreadyCompleted(Task),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// High, Medium, Low.
    Priority,
    /// Earliest first; missing or unreadable dates last.
    DueDate,
    /// A-Z, ignoring case.
    Category,
    /// Newest first; unreadable timestamps last.
    CreatedAt,
}

impl SortKey {
    pub fn from_menu_choice(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(Self::Priority),
            "2" => Some(Self::DueDate),
            "3" => Some(Self::Category),
            "4" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Self::Priority => "Tasks sorted by Priority",
            Self::DueDate => "Tasks sorted by Due date",
            Self::Category => "Tasks sorted by Category",
            Self::CreatedAt => "Tasks sorted by Created date",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    Pending,
    Completed,
    Priority(Priority),
    /// Case-insensitive category name.
    Category(String),
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !task.completed,
            Self::Completed => task.completed,
            Self::Priority(priority) => task.priority == *priority,
            Self::Category(category) => task.category.eq_ignore_ascii_case(category.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Percentage in `0.0..=100.0`.
    pub completion_rate: f64,
}

impl Statistics {
    pub fn count_for(&self, priority: Priority) -> usize {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
        }
    }
}

impl TaskStore {
    /// Loads the store from `path`. Unreadable or malformed files fall back
    /// to an empty store; the error is returned alongside for reporting.
    pub fn open<P: Into<PathBuf>>(path: P) -> StoreLoad {
        let path = path.into();
        match json_store::load_state(&path) {
            Ok(state) => {
                tracing::info!(
                    path = %path.display(),
                    tasks = state.tasks.len(),
                    undo = state.completed.len(),
                    "loaded task store"
                );
                StoreLoad {
                    store: Self::from_state(path, state),
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "task store is unreadable, starting with an empty list"
                );
                StoreLoad {
                    store: Self::from_state(path, TaskState::default()),
                    error: Some(err),
                }
            }
        }
    }

    fn from_state(path: PathBuf, state: TaskState) -> Self {
        let next_id = state.tasks.iter().map(|task| task.id).max().unwrap_or(0) + 1;
        Self {
            path,
            tasks: state.tasks,
            undo: state.completed,
            next_id,
            persist_error: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Completion snapshots, oldest first. The last entry is undone next.
    pub fn undo_stack(&self) -> &[Task] {
        &self.undo
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn add(&mut self, input: NewTask) -> Result<Task, AppError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(AppError::invalid_input("title is required"));
        }

        let description = input
            .description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        let due_date = match input.due_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                if parse_due_date(raw).is_some() {
                    Some(raw.to_string())
                } else {
                    tracing::debug!(due_date = raw, "dropping unparseable due date");
                    None
                }
            }
            _ => None,
        };

        if self.next_id >= MAX_TASK_ID {
            return Err(AppError::invalid_input("no task ids left"));
        }

        let task = Task {
            id: self.next_id,
            title: title.to_string(),
            description,
            priority: input.priority,
            category: normalize_category(input.category.as_deref()),
            due_date,
            created_at: now_timestamp()?,
            completed: false,
            completed_at: None,
        };

        self.tasks.push(task.clone());
        self.next_id += 1;
        tracing::debug!(id = task.id, "added task");
        self.persist();

        Ok(task)
    }

    /// Tasks in stored order that satisfy `predicate`.
    pub fn list<P>(&self, predicate: P) -> Vec<Task>
    where
        P: Fn(&Task) -> bool,
    {
        self.tasks
            .iter()
            .filter(|task| predicate(task))
            .cloned()
            .collect()
    }

    pub fn list_filtered(&self, filter: &TaskFilter) -> Vec<Task> {
        self.list(|task| filter.matches(task))
    }

    pub fn complete(&mut self, id: u32) -> Result<Completion, AppError> {
        let timestamp = now_timestamp()?;
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;

        if task.completed {
            return Ok(Completion::AlreadyCompleted(task.clone()));
        }

        self.undo.push(task.clone());
        task.completed = true;
        task.completed_at = Some(timestamp);
        let completed = task.clone();

        tracing::debug!(id, "completed task");
        self.persist();

        Ok(Completion::Completed(completed))
    }

    /// Reverts the most recent completion. Only one step, store-wide.
    pub fn undo_last_completion(&mut self) -> Result<Task, AppError> {
        let record = self
            .undo
            .pop()
            .ok_or_else(|| AppError::empty_undo("no completed tasks to undo"))?;

        // Records keep the id they had when completed, so a renumbering
        // delete can leave one pointing past the end. It is dropped for good.
        let Some(index) = self.tasks.iter().position(|task| task.id == record.id) else {
            tracing::warn!(id = record.id, "undo record has no matching task");
            self.persist();
            return Err(AppError::inconsistent_state(format!(
                "previously completed task {} not found",
                record.id
            )));
        };

        let task = &mut self.tasks[index];
        task.completed = false;
        task.completed_at = None;
        let restored = task.clone();

        tracing::debug!(id = restored.id, "undid completion");
        self.persist();

        Ok(restored)
    }

    /// Removes a task and renumbers the rest `1..=N`.
    ///
    /// Undo records are purged by title, so every snapshot sharing the
    /// deleted task's title goes with it.
    pub fn delete(&mut self, id: u32) -> Result<Task, AppError> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;

        let removed = self.tasks.remove(index);
        self.undo.retain(|record| record.title != removed.title);
        self.reindex();

        tracing::debug!(id, remaining = self.tasks.len(), "deleted task");
        self.persist();

        Ok(removed)
    }

    fn reindex(&mut self) {
        for (task, id) in self.tasks.iter_mut().zip(1..) {
            task.id = id;
        }
        self.next_id = self.tasks.len() as u32 + 1;
    }

    /// A sorted copy; stored order is untouched and ties keep their order.
    pub fn sort(&self, key: SortKey) -> Vec<Task> {
        let mut sorted = self.tasks.clone();
        match key {
            SortKey::Priority => sorted.sort_by_key(|task| Reverse(task.priority.rank())),
            SortKey::DueDate => sorted.sort_by_key(due_key),
            SortKey::Category => sorted.sort_by_cached_key(|task| task.category.to_lowercase()),
            SortKey::CreatedAt => sorted.sort_by_key(|task| Reverse(created_key(task))),
        }
        sorted
    }

    /// Case-insensitive match on title, description and category. A blank
    /// keyword matches nothing.
    pub fn search(&self, keyword: &str) -> Vec<Task> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.list(|task| {
            task.title.to_lowercase().contains(&needle)
                || task
                    .description
                    .as_deref()
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
                || task.category.to_lowercase().contains(&needle)
        })
    }

    /// Groups in order of each category's first appearance.
    pub fn group_by_category(&self) -> Vec<CategoryGroup> {
        let mut groups: Vec<CategoryGroup> = Vec::new();
        for task in &self.tasks {
            match groups.iter_mut().find(|group| group.category == task.category) {
                Some(group) => group.tasks.push(task.clone()),
                None => groups.push(CategoryGroup {
                    category: task.category.clone(),
                    tasks: vec![task.clone()],
                }),
            }
        }
        groups
    }

    pub fn statistics(&self) -> Statistics {
        let total = self.tasks.len();
        let completed = self.tasks.iter().filter(|task| task.completed).count();
        let count = |priority: Priority| {
            self.tasks
                .iter()
                .filter(|task| task.priority == priority)
                .count()
        };
        let completion_rate = if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64 * 100.0
        };

        Statistics {
            total,
            completed,
            pending: total - completed,
            high: count(Priority::High),
            medium: count(Priority::Medium),
            low: count(Priority::Low),
            completion_rate,
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        let state = TaskState {
            tasks: self.tasks.clone(),
            completed: self.undo.clone(),
        };
        json_store::save_state(&self.path, &state)?;
        tracing::debug!(path = %self.path.display(), "saved task store");
        Ok(())
    }

    /// The failure of the last write-through save, if it has not been taken yet.
    pub fn take_persist_error(&mut self) -> Option<AppError> {
        self.persist_error.take()
    }

    fn persist(&mut self) {
        match self.save() {
            Ok(()) => self.persist_error = None,
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "failed to save task store"
                );
                self.persist_error = Some(err);
            }
        }
    }
}

fn due_key(task: &Task) -> Date {
    task.due().unwrap_or(Date::MAX)
}

fn created_key(task: &Task) -> PrimitiveDateTime {
    task.created().unwrap_or(PrimitiveDateTime::MIN)
}
