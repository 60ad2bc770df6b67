use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

pub const DEFAULT_CATEGORY: &str = "Other";

const DATE_INPUT: &[BorrowedFormatItem<'static>] =
    format_description!("[day padding:none]-[month padding:none]-[year]");
const TIMESTAMP_INPUT: &[BorrowedFormatItem<'static>] = format_description!(
    "[day padding:none]-[month padding:none]-[year] [hour padding:none]:[minute]"
);
const TIMESTAMP_OUTPUT: &[BorrowedFormatItem<'static>] =
    format_description!("[day]-[month]-[year] [hour]:[minute]");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub title: String,
    #[serde(default, with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
    /// `DD-MM-YYYY`, written as an empty string when unset.
    #[serde(default, with = "blank_as_none")]
    pub due_date: Option<String>,
    /// `DD-MM-YYYY HH:MM` in local time.
    pub created_at: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl Task {
    pub fn status_label(&self) -> &'static str {
        if self.completed { "Done" } else { "Pending" }
    }

    pub fn due(&self) -> Option<Date> {
        self.due_date.as_deref().and_then(parse_due_date)
    }

    pub fn created(&self) -> Option<PrimitiveDateTime> {
        parse_timestamp(&self.created_at)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    /// Higher rank sorts first.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    pub fn initial(self) -> char {
        match self {
            Self::High => 'H',
            Self::Medium => 'M',
            Self::Low => 'L',
        }
    }

    /// Maps the menu answer `1`/`2`/`3`; anything else is Medium.
    pub fn from_menu_choice(raw: &str) -> Self {
        match raw.trim() {
            "1" => Self::High,
            "3" => Self::Low,
            _ => Self::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Self::High),
            "medium" | "m" => Ok(Self::Medium),
            "low" | "l" => Ok(Self::Low),
            other => Err(AppError::invalid_input(format!("unknown priority '{other}'"))),
        }
    }
}

/// Input for `TaskStore::add`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub category: Option<String>,
    pub due_date: Option<String>,
}

impl NewTask {
    pub fn new<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn category<T: Into<String>>(mut self, category: T) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn due_date<T: Into<String>>(mut self, due_date: T) -> Self {
        self.due_date = Some(due_date.into());
        self
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Upper-cases the first letter of every alphabetic run and lower-cases the rest.
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut previous_alphabetic = false;

    for ch in raw.chars() {
        if ch.is_alphabetic() {
            if previous_alphabetic {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_alphabetic = true;
        } else {
            out.push(ch);
            previous_alphabetic = false;
        }
    }

    out
}

pub fn normalize_category(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        default_category()
    } else {
        title_case(trimmed)
    }
}

pub fn parse_due_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), DATE_INPUT).ok()
}

pub fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    PrimitiveDateTime::parse(raw.trim(), TIMESTAMP_INPUT).ok()
}

pub fn format_timestamp(moment: OffsetDateTime) -> Result<String, AppError> {
    moment
        .format(TIMESTAMP_OUTPUT)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

pub fn now_timestamp() -> Result<String, AppError> {
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    format_timestamp(OffsetDateTime::now_utc().to_offset(local_offset))
}

pub fn parse_task_id(raw: &str) -> Result<u32, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }

    trimmed
        .parse::<u32>()
        .map_err(|_| AppError::invalid_input(format!("'{trimmed}' is not a numeric id")))
}

mod blank_as_none {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.filter(|text| !text.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        NewTask, Priority, Task, format_timestamp, normalize_category, parse_due_date,
        parse_task_id, parse_timestamp, title_case,
    };
    use time::macros::datetime;
    use time::{Date, Month};

    #[test]
    fn title_case_matches_word_boundaries() {
        assert_eq!(title_case("work"), "Work");
        assert_eq!(title_case("HOME office"), "Home Office");
        assert_eq!(title_case("self-study"), "Self-Study");
        assert_eq!(title_case("2nd try"), "2Nd Try");
    }

    #[test]
    fn blank_category_defaults_to_other() {
        assert_eq!(normalize_category(None), "Other");
        assert_eq!(normalize_category(Some("   ")), "Other");
        assert_eq!(normalize_category(Some(" shopping ")), "Shopping");
    }

    #[test]
    fn due_date_accepts_day_month_year() {
        assert_eq!(
            parse_due_date("05-03-2026"),
            Some(Date::from_calendar_date(2026, Month::March, 5).unwrap())
        );
        assert_eq!(
            parse_due_date("5-3-2026"),
            Some(Date::from_calendar_date(2026, Month::March, 5).unwrap())
        );
    }

    #[test]
    fn due_date_rejects_other_shapes() {
        assert_eq!(parse_due_date("2026-03-05"), None);
        assert_eq!(parse_due_date("31-02-2026"), None);
        assert_eq!(parse_due_date("tomorrow"), None);
        assert_eq!(parse_due_date("05-03-2026x"), None);
    }

    #[test]
    fn timestamps_format_and_parse_back() {
        let formatted = format_timestamp(datetime!(2026-01-09 07:04 UTC)).unwrap();
        assert_eq!(formatted, "09-01-2026 07:04");
        assert_eq!(
            parse_timestamp(&formatted),
            Some(datetime!(2026-01-09 07:04))
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn priority_menu_choice_defaults_to_medium() {
        assert_eq!(Priority::from_menu_choice("1"), Priority::High);
        assert_eq!(Priority::from_menu_choice("3"), Priority::Low);
        assert_eq!(Priority::from_menu_choice(""), Priority::Medium);
        assert_eq!(Priority::from_menu_choice("9"), Priority::Medium);
    }

    #[test]
    fn priority_parses_names_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert_eq!("urgent".parse::<Priority>().unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn parse_task_id_rejects_non_numeric_input() {
        assert_eq!(parse_task_id(" 7 ").unwrap(), 7);
        assert_eq!(parse_task_id("seven").unwrap_err().code(), "invalid_input");
        assert_eq!(parse_task_id("-1").unwrap_err().code(), "invalid_input");
        assert_eq!(parse_task_id("").unwrap_err().code(), "invalid_input");
    }

    #[test]
    fn task_serializes_blank_optionals_as_empty_strings() {
        let task = Task {
            id: 1,
            title: "demo".to_string(),
            description: None,
            priority: Priority::High,
            category: "Work".to_string(),
            due_date: None,
            created_at: "01-02-2026 09:30".to_string(),
            completed: false,
            completed_at: None,
        };

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["description"], "");
        assert_eq!(value["due_date"], "");
        assert_eq!(value["priority"], "High");
        assert!(value.get("completed_at").is_none());
    }

    #[test]
    fn task_reads_records_with_missing_optional_fields() {
        let value = serde_json::json!({
            "id": 3,
            "title": "demo",
            "priority": "Low",
            "created_at": "01-02-2026 09:30",
            "due_date": ""
        });

        let task: Task = serde_json::from_value(value).unwrap();
        assert_eq!(task.description, None);
        assert_eq!(task.due_date, None);
        assert_eq!(task.category, "Other");
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn new_task_builder_sets_fields() {
        let input = NewTask::new("pay rent")
            .priority(Priority::High)
            .category("home")
            .due_date("01-05-2026");

        assert_eq!(input.title, "pay rent");
        assert_eq!(input.priority, Priority::High);
        assert_eq!(input.category.as_deref(), Some("home"));
        assert_eq!(input.due_date.as_deref(), Some("01-05-2026"));
        assert_eq!(input.description, None);
    }
}
