// src/process/mod.rs
//
// Turning fetched page snapshots into structured results.

pub mod case_status;
pub mod cause_list;
pub mod classify;
pub mod normalize;
pub mod raw_table;
pub mod utils;

pub use case_status::parse_case_details;
pub use cause_list::extract_cause_list;
pub use normalize::{normalize_columns, Normalized};
pub use raw_table::{CaseDetails, CauseList, CauseListRow, TableVerdict};
