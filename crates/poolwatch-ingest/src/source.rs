use crate::error::SourceError;
use async_trait::async_trait;
use std::collections::VecDeque;

/// A producer of raw access-log lines.
///
/// Live sources block until the next line is available and never end;
/// finite sources (replays, tests) return `Ok(None)` once exhausted.
#[async_trait]
pub trait LogSource: Send {
    /// Waits for the next complete line, without its trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying file cannot be read.
    async fn next_line(&mut self) -> Result<Option<String>, SourceError>;

    /// Short description used in log output (e.g. the followed path).
    fn describe(&self) -> String;
}

/// Fixed, in-memory sequence of lines.
pub struct LinesSource {
    lines: VecDeque<String>,
}

impl LinesSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Splits a whole document into lines.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.lines())
    }

    pub fn remaining(&self) -> usize {
        self.lines.len()
    }
}

#[async_trait]
impl LogSource for LinesSource {
    async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        Ok(self.lines.pop_front())
    }

    fn describe(&self) -> String {
        format!("{} buffered lines", self.lines.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_source_yields_in_order_then_ends() {
        let mut source = LinesSource::from_text("a\nb\n\nc");
        assert_eq!(source.remaining(), 4);
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("a"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("b"));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some(""));
        assert_eq!(source.next_line().await.unwrap().as_deref(), Some("c"));
        assert!(source.next_line().await.unwrap().is_none());
        assert!(source.next_line().await.unwrap().is_none());
    }
}
