use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use taskstack_core::config::ConfigOverrides;
use taskstack_core::{Priority, SortKey};

/// Local task list with priorities, categories, due dates and undo.
///
/// Run without a subcommand for the numbered menu.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Task file to use instead of the configured one
    #[arg(long, value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: taskstack add "Buy milk" --priority high --category shopping --due 24-12-2026
    Add {
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
        #[arg(short, long)]
        category: Option<String>,
        /// Due date as DD-MM-YYYY; anything else is dropped
        #[arg(long, value_name = "DD-MM-YYYY")]
        due: Option<String>,
    },
    /// List tasks in stored order
    ///
    /// Example: taskstack list --pending --priority high
    List {
        #[arg(long, conflicts_with = "completed")]
        pending: bool,
        #[arg(long)]
        completed: bool,
        #[arg(long, value_enum)]
        priority: Option<PriorityArg>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Show details of a task
    ///
    /// Example: taskstack show 1
    Show { id: String },
    /// Mark a task as completed
    ///
    /// Example: taskstack done 1
    Done { id: String },
    /// Undo the most recent completion
    Undo,
    /// Delete a task and renumber the rest
    ///
    /// Example: taskstack delete 2
    Delete { id: String },
    /// Show tasks in a sorted order without changing the stored order
    ///
    /// Example: taskstack sort due
    Sort {
        #[arg(value_enum)]
        by: SortArg,
    },
    /// Search titles, descriptions and categories
    ///
    /// Example: taskstack search report
    Search { keyword: String },
    /// Show tasks grouped by category
    Categories,
    /// Show task statistics
    Stats,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityArg {
    High,
    Medium,
    Low,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::High => Priority::High,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::Low => Priority::Low,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    /// High to Low
    Priority,
    /// Earliest first
    Due,
    /// A to Z
    Category,
    /// Newest first
    Created,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Priority => SortKey::Priority,
            SortArg::Due => SortKey::DueDate,
            SortArg::Category => SortKey::Category,
            SortArg::Created => SortKey::CreatedAt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    TitleWidth,
    StorePath,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let (key_raw, value_raw) = raw
        .trim()
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "title_width" | "width" => ConfigOverrideTarget::TitleWidth,
        "store_path" | "store" => ConfigOverrideTarget::StorePath,
        other => return Err(format!("unknown config field '{other}'")),
    };

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` into one set; later values win.
pub fn collect_overrides(raw: &[String]) -> Result<ConfigOverrides, String> {
    let mut overrides = ConfigOverrides::default();
    for entry in raw {
        let parsed = parse_config_override(entry)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => overrides.theme = Some(parsed.value),
            ConfigOverrideTarget::TitleWidth => {
                let width = parsed
                    .value
                    .parse::<usize>()
                    .map_err(|_| format!("title_width must be a number, got '{}'", parsed.value))?;
                overrides.title_width = Some(width);
            }
            ConfigOverrideTarget::StorePath => {
                if parsed.value.is_empty() {
                    return Err("store_path cannot be empty".to_string());
                }
                overrides.store_path = Some(PathBuf::from(parsed.value));
            }
        }
    }
    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Cli, Command, ConfigOverrideTarget, SortArg, collect_overrides, parse_config_override,
    };
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn parse_config_override_canonicalizes_field_names() {
        let parsed = parse_config_override(" Title-Width = 24 ").unwrap();

        assert_eq!(parsed.target, ConfigOverrideTarget::TitleWidth);
        assert_eq!(parsed.value, "24");
    }

    #[test]
    fn parse_config_override_rejects_unknown_fields() {
        let err = parse_config_override("colour=red").unwrap_err();
        assert!(err.contains("unknown config field"));
    }

    #[test]
    fn parse_config_override_rejects_missing_equals() {
        let err = parse_config_override("theme").unwrap_err();
        assert!(err.contains("KEY=VALUE"));
    }

    #[test]
    fn parse_config_override_rejects_empty_key() {
        let err = parse_config_override(" = noir").unwrap_err();
        assert!(err.contains("cannot be empty"));
    }

    #[test]
    fn collect_overrides_keeps_last_value() {
        let raw = vec![
            "theme=light".to_string(),
            "store_path=/tmp/a.json".to_string(),
            "THEME=noir".to_string(),
        ];

        let overrides = collect_overrides(&raw).unwrap();

        assert_eq!(overrides.theme.as_deref(), Some("noir"));
        assert_eq!(overrides.store_path, Some(PathBuf::from("/tmp/a.json")));
        assert_eq!(overrides.title_width, None);
    }

    #[test]
    fn collect_overrides_rejects_non_numeric_width() {
        let err = collect_overrides(&["title_width=wide".to_string()]).unwrap_err();
        assert!(err.contains("title_width"));
    }

    #[test]
    fn no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["taskstack"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn sort_subcommand_parses_key() {
        let cli = Cli::try_parse_from(["taskstack", "sort", "due", "--json"]).unwrap();
        assert!(cli.json);
        match cli.command {
            Some(Command::Sort { by }) => assert_eq!(by, SortArg::Due),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_rejects_pending_with_completed() {
        assert!(Cli::try_parse_from(["taskstack", "list", "--pending", "--completed"]).is_err());
    }
}
