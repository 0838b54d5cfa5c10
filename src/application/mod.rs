pub mod use_cases;

pub use use_cases::export_job::{ExportJobRunner, PollPolicy};
pub use use_cases::export_responses::{ExportReport, ExportResponsesUseCase};
pub use use_cases::selection::SelectionUseCase;
pub use use_cases::student_lookup::StudentLookupUseCase;
