//! I/O module
//!
//! Handles the durable event log and report output.
//!
//! # Components
//!
//! - `line_codec` - Newline framing with byte offsets for log reads
//! - `event_log` - Append-only JSONL event log (serialized appends, ranged reads)
//! - `report` - CSV reconciliation report

pub mod event_log;
pub mod line_codec;
pub mod report;

pub use event_log::{log_len, read_range, EventLog, RecordStream};
pub use line_codec::{LogLineCodec, LogRecord};
pub use report::write_report_csv;
