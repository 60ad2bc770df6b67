pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod task_store;

pub use error::AppError;
pub use model::{NewTask, Priority, Task};
pub use task_store::{
    CategoryGroup, Completion, SortKey, Statistics, StoreLoad, TaskFilter, TaskStore,
};
