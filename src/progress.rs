//! Analysis progress reporting.
//!
//! A run reports when discovery starts, after every evaluated query, and
//! when the table is complete. Human and JSON reporters write to **stderr**
//! so stdout stays clean; the tracing reporter feeds the log instead.

use std::io::Write;

/// A single progress event for an analysis run.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalysisProgressEvent {
    /// Queries are being generated for these categories. Total unknown.
    Discovering { categories: usize },
    /// `n` of `total` queries have been checked; `query` is the latest.
    Evaluating {
        query: String,
        n: usize,
        total: usize,
    },
    /// The run finished with `rows` results.
    Complete {
        rows: usize,
        share_of_voice: Option<f64>,
    },
}

impl AnalysisProgressEvent {
    /// Fraction of queries processed, when known.
    pub fn fraction(&self) -> Option<f64> {
        match self {
            AnalysisProgressEvent::Discovering { .. } => None,
            AnalysisProgressEvent::Evaluating { n, total, .. } => {
                if *total == 0 {
                    None
                } else {
                    Some(*n as f64 / *total as f64)
                }
            }
            AnalysisProgressEvent::Complete { .. } => Some(1.0),
        }
    }
}

/// Receives progress events from the orchestrator.
pub trait AnalysisProgressReporter: Send + Sync {
    fn report(&self, event: AnalysisProgressEvent);
}

/// Human-friendly progress on stderr: "analyze  evaluating  3 / 24  gold foil anarkali price".
pub struct StderrProgress;

impl AnalysisProgressReporter for StderrProgress {
    fn report(&self, event: AnalysisProgressEvent) {
        let line = match &event {
            AnalysisProgressEvent::Discovering { categories } => {
                format!("analyze  discovering queries for {} categories...\n", categories)
            }
            AnalysisProgressEvent::Evaluating { query, n, total } => {
                format!("analyze  evaluating  {} / {}  {}\n", n, total, query)
            }
            AnalysisProgressEvent::Complete {
                rows,
                share_of_voice,
            } => format!(
                "analyze  complete  {} rows  share of voice {}\n",
                rows,
                crate::report::format_share_of_voice(*share_of_voice)
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl AnalysisProgressReporter for JsonProgress {
    fn report(&self, event: AnalysisProgressEvent) {
        let obj = match &event {
            AnalysisProgressEvent::Discovering { categories } => serde_json::json!({
                "event": "progress",
                "phase": "discovering",
                "categories": categories
            }),
            AnalysisProgressEvent::Evaluating { query, n, total } => serde_json::json!({
                "event": "progress",
                "phase": "evaluating",
                "query": query,
                "n": n,
                "total": total
            }),
            AnalysisProgressEvent::Complete {
                rows,
                share_of_voice,
            } => serde_json::json!({
                "event": "progress",
                "phase": "complete",
                "rows": rows,
                "share_of_voice": share_of_voice
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// Routes progress into the `tracing` log at info level.
pub struct TracingProgress;

impl AnalysisProgressReporter for TracingProgress {
    fn report(&self, event: AnalysisProgressEvent) {
        match event {
            AnalysisProgressEvent::Discovering { categories } => {
                tracing::info!(categories, "discovering queries");
            }
            AnalysisProgressEvent::Evaluating { query, n, total } => {
                tracing::info!(n, total, query = %query, "evaluated query");
            }
            AnalysisProgressEvent::Complete {
                rows,
                share_of_voice,
            } => {
                tracing::info!(rows, share_of_voice = ?share_of_voice, "analysis complete");
            }
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl AnalysisProgressReporter for NoProgress {
    fn report(&self, _event: AnalysisProgressEvent) {}
}

/// Progress mode for the CLI.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
    Log,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise the log.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Log
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            "log" => Some(ProgressMode::Log),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn AnalysisProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
            ProgressMode::Log => Box::new(TracingProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_tracks_processed_over_total() {
        let ev = AnalysisProgressEvent::Evaluating {
            query: "q".to_string(),
            n: 3,
            total: 4,
        };
        assert_eq!(ev.fraction(), Some(0.75));
        assert_eq!(
            AnalysisProgressEvent::Discovering { categories: 2 }.fraction(),
            None
        );
    }

    #[test]
    fn parse_modes() {
        assert_eq!(ProgressMode::parse("json"), Some(ProgressMode::Json));
        assert_eq!(ProgressMode::parse("log"), Some(ProgressMode::Log));
        assert_eq!(ProgressMode::parse("loud"), None);
    }
}
