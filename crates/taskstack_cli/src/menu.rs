use crate::commands::write_line;
use crate::render::Renderer;
use std::io::{BufRead, Write};
use taskstack_core::model::{parse_due_date, parse_task_id};
use taskstack_core::{AppError, Completion, NewTask, Priority, SortKey, TaskStore};

const RULE_WIDTH: usize = 50;

/// The numbered menu loop. Reads one line per prompt from `input` and writes
/// everything, errors included, to `output`.
pub struct Menu<'a, R, W> {
    store: &'a mut TaskStore,
    renderer: Renderer,
    input: R,
    output: W,
    at_eof: bool,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(store: &'a mut TaskStore, renderer: Renderer, input: R, output: W) -> Self {
        Self {
            store,
            renderer,
            input,
            output,
            at_eof: false,
        }
    }

    /// Runs until choice 10 or end of input; the store is saved on the way out.
    pub fn run(&mut self, load_error: Option<&AppError>) -> Result<(), AppError> {
        match load_error {
            Some(err) => self.say(format!(
                "Error loading tasks (file may be corrupted): {err}"
            ))?,
            None if self.store.is_empty() => {
                self.say("No existing tasks found. Starting fresh.")?
            }
            None => self.say(format!("Loaded {} existing tasks.", self.store.tasks().len()))?,
        }

        loop {
            self.print_menu()?;
            let choice = self.ask("Enter your choice (1-10): ")?;
            if self.at_eof && choice.is_empty() {
                self.exit()?;
                return Ok(());
            }

            let outcome = match choice.as_str() {
                "" => self.say("Please enter a valid option."),
                "1" => self.add_task(),
                "2" => self.view_tasks(),
                "3" => self.complete_task(),
                "4" => self.undo_last_completion(),
                "5" => self.delete_task(),
                "6" => self.sort_tasks(),
                "7" => self.search_tasks(),
                "8" => self.view_by_category(),
                "9" => self.view_statistics(),
                "10" => {
                    self.exit()?;
                    return Ok(());
                }
                _ => self.say("Invalid choice. Please enter a number from 1 to 10."),
            };

            if let Err(err) = outcome {
                if matches!(err, AppError::Io(_)) {
                    return Err(err);
                }
                self.say(format!("ERROR: {err}"))?;
            }
            if let Some(err) = self.store.take_persist_error() {
                self.say(format!("WARNING: changes were not saved: {err}"))?;
            }
        }
    }

    fn print_menu(&mut self) -> Result<(), AppError> {
        let rule = "=".repeat(RULE_WIDTH);
        let title = self.renderer.heading("          TASKSTACK TODO LIST");
        self.say(format!("\n{rule}\n{title}\n{rule}"))?;
        for line in [
            "1. Add New Task",
            "2. View All Tasks",
            "3. Mark Task as Completed",
            "4. Undo Last Completion",
            "5. Delete Task",
            "6. Sort Tasks",
            "7. Search Tasks",
            "8. View by Category",
            "9. View Statistics",
            "10. Exit",
        ] {
            self.say(line)?;
        }
        self.say("-".repeat(RULE_WIDTH))
    }

    fn add_task(&mut self) -> Result<(), AppError> {
        self.say("\n--- Add New Task ---")?;
        let title = self.ask("Enter task title: ")?;
        if title.is_empty() {
            return Err(AppError::invalid_input("task title cannot be empty"));
        }

        let description = self.ask("Enter description (optional): ")?;
        let priority = self.ask("Priority (1-High, 2-Medium, 3-Low) [default 2]: ")?;
        let category =
            self.ask("Category (work/personal/study/shopping/other) [default other]: ")?;
        let due = self.ask("Due date (DD-MM-YYYY) or leave blank: ")?;
        if self.at_eof {
            return self.say("Input ended before the task was complete; nothing was added.");
        }
        if !due.is_empty() && parse_due_date(&due).is_none() {
            self.say("Invalid due date format. It will be saved as blank.")?;
        }

        let task = self.store.add(NewTask {
            title,
            description: Some(description),
            priority: Priority::from_menu_choice(&priority),
            category: Some(category),
            due_date: Some(due),
        })?;
        self.say(format!("Task '{}' added (ID {}).", task.title, task.id))
    }

    fn view_tasks(&mut self) -> Result<(), AppError> {
        let view = self.renderer.task_view("All Tasks", self.store.tasks());
        self.say(view)
    }

    fn complete_task(&mut self) -> Result<(), AppError> {
        if self.store.is_empty() {
            return self.say("No tasks available to complete.");
        }
        self.view_tasks()?;
        let raw = self.ask("Enter Task ID to mark as completed: ")?;
        let id = parse_task_id(&raw)?;
        match self.store.complete(id)? {
            Completion::Completed(task) => {
                self.say(format!("Task '{}' marked as completed.", task.title))
            }
            Completion::AlreadyCompleted(_) => self.say("Task already completed."),
        }
    }

    fn undo_last_completion(&mut self) -> Result<(), AppError> {
        let task = self.store.undo_last_completion()?;
        self.say(format!("Undid completion of task '{}'.", task.title))
    }

    fn delete_task(&mut self) -> Result<(), AppError> {
        if self.store.is_empty() {
            return self.say("No tasks to delete.");
        }
        self.view_tasks()?;
        let raw = self.ask("Enter Task ID to delete: ")?;
        let id = parse_task_id(&raw)?;
        let removed = self.store.delete(id)?;
        self.say(format!("Deleted task '{}'.", removed.title))
    }

    fn sort_tasks(&mut self) -> Result<(), AppError> {
        if self.store.is_empty() {
            return self.say("No tasks to sort.");
        }
        self.say(
            "\nSort by:\n\
             1. Priority (High -> Low)\n\
             2. Due date (earliest first)\n\
             3. Category (A-Z)\n\
             4. Created date (newest first)",
        )?;
        let raw = self.ask("Choice (1-4): ")?;
        let key = SortKey::from_menu_choice(&raw)
            .ok_or_else(|| AppError::invalid_input("sort option must be 1-4"))?;
        let sorted = self.store.sort(key);
        let view = self.renderer.task_view(key.heading(), &sorted);
        self.say(view)
    }

    fn search_tasks(&mut self) -> Result<(), AppError> {
        if self.store.is_empty() {
            return self.say("No tasks to search.");
        }
        let keyword = self
            .ask("Enter keyword to search (title/description/category): ")?
            .to_lowercase();
        if keyword.is_empty() {
            return Err(AppError::invalid_input("no keyword entered"));
        }
        let found = self.store.search(&keyword);
        let view = self
            .renderer
            .task_view(&format!("Search results for '{keyword}'"), &found);
        self.say(view)
    }

    fn view_by_category(&mut self) -> Result<(), AppError> {
        if self.store.is_empty() {
            return self.say("No tasks to show.");
        }
        let groups = self.store.group_by_category();
        let view = self.renderer.category_groups(&groups);
        self.say(view)
    }

    fn view_statistics(&mut self) -> Result<(), AppError> {
        if self.store.is_empty() {
            return self.say("No tasks for statistics.");
        }
        let view = self.renderer.statistics(&self.store.statistics());
        self.say(view)
    }

    fn exit(&mut self) -> Result<(), AppError> {
        self.say("\nSaving and exiting. Goodbye!")?;
        if let Err(err) = self.store.save() {
            self.say(format!("ERROR: {err}"))?;
        }
        Ok(())
    }

    /// Prompts and reads one trimmed line; end of input reads as blank.
    fn ask(&mut self, prompt: &str) -> Result<String, AppError> {
        write!(self.output, "{prompt}").map_err(|err| AppError::io(err.to_string()))?;
        self.output
            .flush()
            .map_err(|err| AppError::io(err.to_string()))?;

        let mut line = String::new();
        let bytes = self
            .input
            .read_line(&mut line)
            .map_err(|err| AppError::io(err.to_string()))?;
        if bytes == 0 {
            self.at_eof = true;
            self.say("")?;
        }
        Ok(line.trim().to_string())
    }

    fn say<T: std::fmt::Display>(&mut self, text: T) -> Result<(), AppError> {
        write_line(&mut self.output, text)
    }
}

#[cfg(test)]
mod tests {
    use super::Menu;
    use crate::render::Renderer;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};
    use taskstack_core::config::Palette;
    use taskstack_core::storage::json_store;
    use taskstack_core::{AppError, TaskStore};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("taskstack-{nanos}-{file_name}"))
    }

    fn run_menu(store: &mut TaskStore, script: &str) -> String {
        run_menu_with(store, script, None)
    }

    fn run_menu_with(
        store: &mut TaskStore,
        script: &str,
        load_error: Option<&AppError>,
    ) -> String {
        let mut output = Vec::new();
        Menu::new(
            store,
            Renderer::new(Palette::PLAIN, 38),
            Cursor::new(script.as_bytes().to_vec()),
            &mut output,
        )
        .run(load_error)
        .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn add_then_view_lists_task() {
        let path = temp_path("menu-add.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(&mut store, "1\nbuy milk\n\n1\nshopping\n24-12-2026\n2\n10\n");
        let saved = json_store::load_state(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(out.contains("No existing tasks found. Starting fresh."));
        assert!(out.contains("Task 'buy milk' added (ID 1)."));
        assert!(out.contains("--- All Tasks ---"));
        assert!(out.contains("Shopping"));
        assert!(out.contains("Saving and exiting. Goodbye!"));
        assert_eq!(saved.tasks.len(), 1);
        assert_eq!(saved.tasks[0].due_date.as_deref(), Some("24-12-2026"));
    }

    #[test]
    fn add_reports_invalid_due_date_and_empty_title() {
        let path = temp_path("menu-add-bad.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(&mut store, "1\n\n1\ndemo\n\n\n\nsoon\n10\n");
        std::fs::remove_file(&path).ok();

        assert!(out.contains("ERROR: invalid_input - task title cannot be empty"));
        assert!(out.contains("Invalid due date format. It will be saved as blank."));
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].due_date, None);
        assert_eq!(store.tasks()[0].category, "Other");
    }

    #[test]
    fn complete_and_undo_round_trip() {
        let path = temp_path("menu-complete.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(
            &mut store,
            "1\nwrite report\n\n\n\n\n3\n1\n3\n1\n4\n4\n10\n",
        );
        std::fs::remove_file(&path).ok();

        assert!(out.contains("Task 'write report' marked as completed."));
        assert!(out.contains("Task already completed."));
        assert!(out.contains("Undid completion of task 'write report'."));
        assert!(out.contains("ERROR: empty_undo"));
        assert!(!store.tasks()[0].completed);
    }

    #[test]
    fn complete_rejects_non_numeric_and_unknown_ids() {
        let path = temp_path("menu-complete-bad.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(&mut store, "1\ndemo\n\n\n\n\n3\nabc\n3\n9\n10\n");
        std::fs::remove_file(&path).ok();

        assert!(out.contains("ERROR: invalid_input"));
        assert!(out.contains("ERROR: not_found - task 9 not found"));
    }

    #[test]
    fn delete_renumbers_tasks() {
        let path = temp_path("menu-delete.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(
            &mut store,
            "1\nfirst\n\n\n\n\n1\nsecond\n\n\n\n\n1\nthird\n\n\n\n\n5\n1\n10\n",
        );
        std::fs::remove_file(&path).ok();

        assert!(out.contains("Deleted task 'first'."));
        let ids: Vec<_> = store.tasks().iter().map(|task| task.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(store.tasks()[0].title, "second");
    }

    #[test]
    fn empty_store_short_circuits_views() {
        let path = temp_path("menu-empty.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(&mut store, "2\n3\n5\n6\n7\n8\n9\n10\n");
        std::fs::remove_file(&path).ok();

        assert!(out.contains("No tasks to show."));
        assert!(out.contains("No tasks available to complete."));
        assert!(out.contains("No tasks to delete."));
        assert!(out.contains("No tasks to sort."));
        assert!(out.contains("No tasks to search."));
        assert!(out.contains("No tasks for statistics."));
    }

    #[test]
    fn invalid_choices_redisplay_menu() {
        let path = temp_path("menu-invalid.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(&mut store, "\n42\nabc\n10\n");
        std::fs::remove_file(&path).ok();

        assert!(out.contains("Please enter a valid option."));
        assert_eq!(
            out.matches("Invalid choice. Please enter a number from 1 to 10.")
                .count(),
            2
        );
        assert_eq!(out.matches("10. Exit").count(), 4);
    }

    #[test]
    fn sort_search_and_statistics_render() {
        let path = temp_path("menu-views.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(
            &mut store,
            "1\nlow one\n\n3\nwork\n\n1\nhigh one\nurgent\n1\nhome\n\n6\n1\n6\n7\n7\nURGENT\n7\n\n8\n9\n10\n",
        );
        std::fs::remove_file(&path).ok();

        assert!(out.contains("--- Tasks sorted by Priority ---"));
        assert!(out.contains("ERROR: invalid_input - sort option must be 1-4"));
        assert!(out.contains("--- Search results for 'urgent' ---"));
        assert!(out.contains("ERROR: invalid_input - no keyword entered"));
        assert!(out.contains("Work (1 tasks):"));
        assert!(out.contains("Home (1 tasks):"));
        assert!(out.contains("Completion rate : 0.0%"));

        let sorted_at = out.find("--- Tasks sorted by Priority ---").unwrap();
        let after = &out[sorted_at..];
        assert!(after.find("high one").unwrap() < after.find("low one").unwrap());
    }

    #[test]
    fn end_of_input_saves_and_exits() {
        let path = temp_path("menu-eof.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(&mut store, "1\ndemo\n\n\n\n\n");
        let saved = json_store::load_state(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(out.contains("Saving and exiting. Goodbye!"));
        assert_eq!(saved.tasks.len(), 1);
    }

    #[test]
    fn end_of_input_inside_add_discards_the_task() {
        let path = temp_path("menu-eof-add.json");
        let mut store = TaskStore::open(path.clone()).store;

        let out = run_menu(&mut store, "1\nhalf typed\n");
        let saved = json_store::load_state(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(out.contains("nothing was added"));
        assert!(!out.contains("added (ID"));
        assert!(out.contains("Saving and exiting. Goodbye!"));
        assert!(store.is_empty());
        assert!(saved.tasks.is_empty());
    }

    #[test]
    fn load_error_is_reported_at_start() {
        let path = temp_path("menu-load-error.json");
        let mut store = TaskStore::open(path).store;
        let err = AppError::invalid_data("invalid JSON");

        let out = run_menu_with(&mut store, "10\n", Some(&err));

        assert!(out.contains("Error loading tasks (file may be corrupted): invalid_data"));
    }
}
