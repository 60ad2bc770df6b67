use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskstack_core::config::{Config, Palette};
use taskstack_core::{CategoryGroup, Priority, Statistics, Task};

const CATEGORY_WIDTH: usize = 9;

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Pri")]
    priority: char,
    #[tabled(rename = "Cat")]
    category: String,
    #[tabled(rename = "Status")]
    status: &'static str,
    #[tabled(rename = "Title")]
    title: String,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    palette: Palette,
    title_width: usize,
}

impl Renderer {
    pub fn new(palette: Palette, title_width: usize) -> Self {
        Self {
            palette,
            title_width,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.palette(), config.title_width())
    }

    pub fn heading(&self, text: &str) -> String {
        self.palette.heading(text)
    }

    pub fn task_table(&self, tasks: &[Task]) -> String {
        let rows = tasks.iter().map(|task| TaskRow {
            id: task.id,
            priority: task.priority.initial(),
            category: task.category.chars().take(CATEGORY_WIDTH).collect(),
            status: task.status_label(),
            title: truncate(&task.title, self.title_width),
        });
        Table::new(rows).with(Style::psql()).to_string()
    }

    /// A headed table, or the empty-list notice.
    pub fn task_view(&self, header: &str, tasks: &[Task]) -> String {
        if tasks.is_empty() {
            return "No tasks to show.".to_string();
        }
        format!(
            "{}\n{}",
            self.heading(&format!("--- {header} ---")),
            self.task_table(tasks)
        )
    }

    pub fn category_groups(&self, groups: &[CategoryGroup]) -> String {
        if groups.is_empty() {
            return "No tasks to show.".to_string();
        }
        groups
            .iter()
            .map(|group| {
                format!(
                    "{} ({} tasks):\n{}",
                    group.category,
                    group.tasks.len(),
                    self.task_view(&format!("{} tasks", group.category), &group.tasks)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn statistics(&self, stats: &Statistics) -> String {
        let mut lines = vec![
            self.heading("--- Task Statistics ---"),
            format!("Total tasks     : {}", stats.total),
            format!("Completed       : {}", stats.completed),
            format!("Pending         : {}", stats.pending),
        ];
        for priority in Priority::ALL {
            lines.push(format!(
                "{:<16}: {}",
                format!("{priority} priority"),
                stats.count_for(priority)
            ));
        }
        lines.push(format!("Completion rate : {:.1}%", stats.completion_rate));
        lines.join("\n")
    }

    pub fn task_detail(&self, task: &Task) -> String {
        let mut lines = vec![
            format!("{} ({})", task.title, task.id),
            self.palette.dim(&format!(
                "{} | {} | {}",
                task.priority,
                task.category,
                task.status_label()
            )),
        ];
        if let Some(description) = task.description.as_deref() {
            lines.push(description.to_string());
        }
        if let Some(due) = task.due_date.as_deref() {
            lines.push(format!("Due: {due}"));
        }
        lines.join("\n")
    }
}

/// Cuts `text` to `width` characters, ending in `...` when shortened.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}
