use std::path::Path;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use super::MessageSource;
use crate::{error::SourceError, message::ChatMessage};

/// Replays `ChatMessage` records stored one JSON object per line.
///
/// Blank lines are skipped. A malformed line yields
/// [`SourceError::Malformed`]; reading may continue afterwards.
pub struct JsonLinesSource<R> {
    name: String,
    lines: Lines<R>,
    line_no: usize,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            lines: reader.lines(),
            line_no: 0,
        }
    }

    /// Lines consumed so far, blank ones included
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a chat log file for replay
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        Ok(Self::new(path.display().to_string(), BufReader::new(file)))
    }
}

#[async_trait]
impl<R> MessageSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<ChatMessage>, SourceError> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return serde_json::from_str(line).map(Some).map_err(|e| SourceError::Malformed {
                line: self.line_no,
                reason: e.to_string(),
            });
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = r#"{"channel":"lcs","author":"a","text":"first"}

not json at all
{"platform":"twitch","channel":"lcs","author":"b","text":"second","badges":["moderator"]}
"#;

    #[tokio::test]
    async fn replays_records_and_reports_bad_lines() {
        let mut source = JsonLinesSource::new("log", LOG.as_bytes());
        source.connect().await.unwrap();

        let first = source.next_message().await.unwrap().unwrap();
        assert_eq!(first.text, "first");

        match source.next_message().await {
            Err(SourceError::Malformed { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected malformed line, got {other:?}"),
        }

        let second = source.next_message().await.unwrap().unwrap();
        assert!(second.is_moderator());
        assert!(source.next_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = JsonLinesSource::open("/definitely/not/here.jsonl").await;
        assert!(matches!(result, Err(SourceError::Io(_))));
    }
}
