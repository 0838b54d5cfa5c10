pub mod export_job;
pub mod export_responses;
pub mod selection;
pub mod student_lookup;
