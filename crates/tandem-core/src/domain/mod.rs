//! Domain model (task ids and task views).

pub mod ids;
pub mod task;

pub use ids::TaskId;
pub use task::{ANONYMOUS_TASK, TaskInfo};
