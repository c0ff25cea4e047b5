//! Ingestion side of the watcher: turning raw access-log lines into
//! [`LogRecord`](poolwatch_common::types::LogRecord)s and producing those
//! lines from a followed file.
//!
//! The [`LogSource`] trait is the seam the watcher loop reads through;
//! [`tail::FileTail`] follows a growing, rotating file and
//! [`source::LinesSource`] replays a fixed set of lines.

pub mod error;
pub mod parser;
pub mod source;
pub mod tail;

pub use error::{ParseError, SourceError};
pub use parser::parse_line;
pub use source::LogSource;
