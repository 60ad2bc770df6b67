mod task;

pub use task::{
    DEFAULT_CATEGORY, NewTask, Priority, Task, format_timestamp, normalize_category,
    now_timestamp, parse_due_date, parse_task_id, parse_timestamp, title_case,
};
