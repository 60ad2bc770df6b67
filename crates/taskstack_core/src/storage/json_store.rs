use crate::error::AppError;
use crate::model::Task;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

const STORE_FILE_NAME: &str = "todo_data.json";
pub const STORE_ENV_VAR: &str = "TASKSTACK_STORE_PATH";
/// Ids stay below this so the next id can always be computed.
pub const MAX_TASK_ID: u32 = u32::MAX;

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    completed: Vec<Task>,
}

/// Everything the backing file holds: the task list and the undo stack
/// (oldest completion first).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskState {
    pub tasks: Vec<Task>,
    pub completed: Vec<Task>,
}

pub fn default_store_path() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskstack").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskstack")
            .join(STORE_FILE_NAME))
    }
}

/// The path named by `TASKSTACK_STORE_PATH`, if set and non-blank.
pub fn store_path_from_env() -> Option<PathBuf> {
    match std::env::var(STORE_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
        _ => None,
    }
}

/// Reads the backing file. A missing file is an empty state, not an error.
pub fn load_state(path: &Path) -> Result<TaskState, AppError> {
    if !path.exists() {
        return Ok(TaskState::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
    let stored: StoredState = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;

    let mut seen = HashSet::with_capacity(stored.tasks.len());
    for task in &stored.tasks {
        if task.id == 0 {
            return Err(AppError::invalid_data("task ids start at 1"));
        }
        if task.id >= MAX_TASK_ID {
            return Err(AppError::invalid_data(format!("task id {} is out of range", task.id)));
        }
        if !seen.insert(task.id) {
            return Err(AppError::invalid_data(format!("duplicate task id {}", task.id)));
        }
    }

    Ok(TaskState {
        tasks: stored.tasks,
        completed: stored.completed,
    })
}

/// Writes the whole state to a sibling temp file and renames it into place.
pub fn save_state(path: &Path, state: &TaskState) -> Result<(), AppError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
    }

    let stored = StoredState {
        tasks: state.tasks.clone(),
        completed: state.completed.clone(),
    };
    let content = serde_json::to_string_pretty(&stored)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;

    let tmp = path.with_file_name(format!(
        ".{}.tmp.{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(STORE_FILE_NAME),
        std::process::id()
    ));
    {
        let mut file = std::fs::File::create(&tmp).map_err(|err| AppError::io(err.to_string()))?;
        file.write_all(content.as_bytes())
            .map_err(|err| AppError::io(err.to_string()))?;
        file.sync_all().map_err(|err| AppError::io(err.to_string()))?;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&tmp, permissions).map_err(|err| AppError::io(err.to_string()))?;
    }

    std::fs::rename(&tmp, path).map_err(|err| {
        std::fs::remove_file(&tmp).ok();
        AppError::io(err.to_string())
    })?;

    Ok(())
}
