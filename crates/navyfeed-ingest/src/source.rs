//! JSONL event source adapter.
//!
//! The transport that authenticates and decodes the upstream event stream
//! is an external collaborator. This adapter accepts its output in the
//! simplest decoded form: one JSON [`RepoEvent`] per line, read from a file
//! or from stdin, and forwards each event into the ingestor's channel.
//! Malformed lines are logged and skipped.

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use navyfeed_core::RepoEvent;

use crate::error::Result;

/// Reads decoded events as JSON lines and forwards them to the ingestor.
pub struct JsonlSource {
    /// Input file, or stdin when `None`.
    input: Option<PathBuf>,
}

impl JsonlSource {
    /// Source reading from the given file.
    pub fn from_file(path: PathBuf) -> Self {
        Self { input: Some(path) }
    }

    /// Source reading from stdin.
    pub fn from_stdin() -> Self {
        Self { input: None }
    }

    /// Read all lines, sending decoded events into `events`.
    ///
    /// Stops when the input is exhausted or the receiver side is dropped.
    pub async fn run(self, events: mpsc::Sender<RepoEvent>) -> Result<()> {
        match &self.input {
            Some(path) => {
                tracing::info!(path = %path.display(), "reading events from file");
                let file = tokio::fs::File::open(path).await?;
                self.pump(BufReader::new(file), events).await
            }
            None => {
                tracing::info!("reading events from stdin");
                self.pump(BufReader::new(tokio::io::stdin()), events).await
            }
        }
    }

    async fn pump<R>(&self, reader: BufReader<R>, events: mpsc::Sender<RepoEvent>) -> Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut line_num: usize = 0;

        while let Some(line) = lines.next_line().await? {
            line_num += 1;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RepoEvent>(&line) {
                Ok(event) => {
                    if events.send(event).await.is_err() {
                        tracing::info!("event receiver dropped, stopping source");
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(line = line_num, error = %e, "skipping malformed event line");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_events_and_skips_malformed_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"kind": "commit"}}"#).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"kind": "identity"}}"#).unwrap();
        file.flush().unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        JsonlSource::from_file(file.path().to_path_buf())
            .run(tx)
            .await
            .unwrap();

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            received.push(event);
        }
        assert_eq!(received.len(), 2);
        assert!(matches!(received[0], RepoEvent::Commit(_)));
        assert!(matches!(received[1], RepoEvent::Other));
    }
}
