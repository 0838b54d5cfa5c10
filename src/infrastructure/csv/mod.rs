// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// Dataset parsing, student snapshots and the append-only selection log

mod append_log;
mod csv_parser;
mod csv_store;

pub use append_log::AppendLog;
pub use csv_parser::{CsvParser, ParsedCsv};
pub use csv_store::{CsvStore, StudentDirectory};
