pub mod config;
pub mod page;
pub mod task;

pub use config::*;
pub use page::*;
pub use task::*;
