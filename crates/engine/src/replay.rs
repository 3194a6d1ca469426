use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use common::{Bar, Result};

use crate::lifecycle::EngineHandle;

/// Replays recorded bars from a JSONL file onto the market channel, one
/// JSON bar object per line.
///
/// Runs at full speed — replay pacing is out of scope. A malformed line is
/// logged and dropped; replay continues with the next line.
pub struct BarReplay {
    path: String,
    handle: EngineHandle,
}

impl BarReplay {
    pub fn new(path: impl Into<String>, handle: EngineHandle) -> Self {
        Self {
            path: path.into(),
            handle,
        }
    }

    /// Run the replay to the end of the file. Call from `tokio::spawn`.
    pub async fn run(self) {
        info!(path = %self.path, "Replaying bars");
        let file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %self.path, error = %e, "Failed to open replay file");
                return;
            }
        };

        let mut lines = BufReader::new(file).lines();
        let mut published = 0u64;
        let mut dropped = 0u64;
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match parse_bar(&line) {
                Ok(bar) => {
                    self.handle.publish_bar(bar);
                    published += 1;
                    // let strategy tasks drain between bars
                    tokio::task::yield_now().await;
                }
                Err(e) => {
                    dropped += 1;
                    warn!(error = %e, "Malformed bar dropped");
                }
            }
        }

        info!(published, dropped, "Replay finished");
    }
}

fn parse_bar(line: &str) -> Result<Bar> {
    Ok(serde_json::from_str(line)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_bar_line() {
        let line = r#"{"symbol":"SPY","time":"2024-01-02T14:30:00Z","open":470.1,"high":470.9,"low":469.8,"close":470.5,"volume":120000}"#;
        let bar = parse_bar(line).unwrap();
        assert_eq!(bar.symbol, "SPY");
        assert_eq!(bar.volume, 120_000);
        assert!((bar.close - 470.5).abs() < 1e-12);
    }

    #[test]
    fn malformed_lines_are_errors_not_panics() {
        assert!(parse_bar("not json").is_err());
        assert!(parse_bar(r#"{"symbol":"SPY"}"#).is_err());
    }
}
