pub mod error;
pub mod export_job;
pub mod selection;
pub mod student;
