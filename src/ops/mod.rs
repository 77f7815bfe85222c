pub mod list_ops;
pub mod task_ops;
