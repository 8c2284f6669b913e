pub mod advance;
pub mod bucket;
pub mod clock;
pub mod due_input;
pub mod error;
pub mod recurrence;
pub mod search;
pub mod store;
pub mod task;

pub use bucket::Bucket;
pub use error::TaskError;
pub use store::TaskStore;
pub use task::{Task, TaskDraft, TaskPatch};
