pub mod handler;
mod job;
pub mod scheduler;
pub mod tasks;
pub mod worker;

pub use job::*;
