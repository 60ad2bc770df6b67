use crate::cli::Command;
use crate::render::Renderer;
use serde::Serialize;
use std::fmt::Display;
use std::io::Write;
use taskstack_core::model::{parse_due_date, parse_task_id};
use taskstack_core::{
    AppError, Completion, NewTask, Priority, SortKey, Task, TaskFilter, TaskStore,
};

/// Runs a single subcommand against `store`, writing its result to `out`.
pub fn run_command<W: Write>(
    store: &mut TaskStore,
    command: Command,
    json: bool,
    renderer: &Renderer,
    out: &mut W,
) -> Result<(), AppError> {
    match command {
        Command::Add {
            title,
            description,
            priority,
            category,
            due,
        } => {
            let title = match title {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::invalid_input("title is required")),
            };
            if let Some(raw) = due.as_deref()
                && !raw.trim().is_empty()
                && parse_due_date(raw).is_none()
            {
                eprintln!("WARNING: due date '{raw}' is not DD-MM-YYYY and was dropped");
            }

            let task = store.add(NewTask {
                title,
                description,
                priority: Priority::from(priority),
                category,
                due_date: due,
            })?;
            if json {
                write_json(out, &task)?;
            } else {
                write_line(out, format!("Added task: {} ({})", task.title, task.id))?;
            }
        }
        Command::List {
            pending,
            completed,
            priority,
            category,
        } => {
            let mut filters = Vec::new();
            if pending {
                filters.push(TaskFilter::Pending);
            }
            if completed {
                filters.push(TaskFilter::Completed);
            }
            if let Some(priority) = priority {
                filters.push(TaskFilter::Priority(priority.into()));
            }
            if let Some(category) = category {
                filters.push(TaskFilter::Category(category));
            }

            let tasks = store.list(|task| filters.iter().all(|filter| filter.matches(task)));
            write_tasks(out, renderer, json, "All Tasks", &tasks)?;
        }
        Command::Show { id } => {
            let id = parse_task_id(&id)?;
            let task = store
                .get(id)
                .cloned()
                .ok_or_else(|| AppError::not_found(format!("task {id} not found")))?;
            if json {
                write_json(out, &task)?;
            } else {
                write_line(out, renderer.task_detail(&task))?;
            }
        }
        Command::Done { id } => {
            let id = parse_task_id(&id)?;
            match store.complete(id)? {
                Completion::Completed(task) => {
                    if json {
                        write_json(out, &task)?;
                    } else {
                        write_line(out, format!("Completed task: {} ({})", task.title, task.id))?;
                    }
                }
                Completion::AlreadyCompleted(task) => {
                    if json {
                        write_json(out, &task)?;
                    } else {
                        write_line(
                            out,
                            format!("Task already completed: {} ({})", task.title, task.id),
                        )?;
                    }
                }
            }
        }
        Command::Undo => {
            let task = store.undo_last_completion()?;
            if json {
                write_json(out, &task)?;
            } else {
                write_line(out, format!("Restored task: {} ({})", task.title, task.id))?;
            }
        }
        Command::Delete { id } => {
            let id = parse_task_id(&id)?;
            let task = store.delete(id)?;
            if json {
                write_json(out, &task)?;
            } else {
                write_line(out, format!("Deleted task: {} ({})", task.title, task.id))?;
            }
        }
        Command::Sort { by } => {
            let key = SortKey::from(by);
            let tasks = store.sort(key);
            write_tasks(out, renderer, json, key.heading(), &tasks)?;
        }
        Command::Search { keyword } => {
            let needle = keyword.trim().to_lowercase();
            if needle.is_empty() {
                return Err(AppError::invalid_input("keyword is required"));
            }
            let tasks = store.search(&needle);
            let header = format!("Search results for '{needle}'");
            write_tasks(out, renderer, json, &header, &tasks)?;
        }
        Command::Categories => {
            let groups = store.group_by_category();
            if json {
                write_json(out, &groups)?;
            } else {
                write_line(out, renderer.category_groups(&groups))?;
            }
        }
        Command::Stats => {
            let stats = store.statistics();
            if json {
                write_json(out, &stats)?;
            } else {
                write_line(out, renderer.statistics(&stats))?;
            }
        }
    }

    match store.take_persist_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn write_tasks<W: Write>(
    out: &mut W,
    renderer: &Renderer,
    json: bool,
    header: &str,
    tasks: &[Task],
) -> Result<(), AppError> {
    if json {
        write_json(out, tasks)
    } else {
        write_line(out, renderer.task_view(header, tasks))
    }
}

fn write_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<(), AppError> {
    let rendered =
        serde_json::to_string(value).map_err(|err| AppError::invalid_data(err.to_string()))?;
    write_line(out, rendered)
}

pub(crate) fn write_line<W: Write, T: Display>(out: &mut W, text: T) -> Result<(), AppError> {
    writeln!(out, "{text}").map_err(|err| AppError::io(err.to_string()))
}
