pub mod backup;
pub mod check;
pub mod machine;
pub mod task_status;

pub use backup::*;
pub use check::*;
pub use machine::*;
pub use task_status::*;
