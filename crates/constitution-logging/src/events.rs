use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the critique/revision loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    LoopStarted {
        principles: usize,
        input_preview: String,
    },
    PrimaryCompleted {
        output_preview: String,
        duration_secs: f64,
    },
    CritiqueStarted {
        index: usize,
        principle: String,
    },
    CritiqueCompleted {
        index: usize,
        principle: String,
        verdict: String,
        critique: Option<String>,
    },
    RevisionCompleted {
        index: usize,
        principle: String,
        revision_preview: String,
        duration_secs: f64,
    },
    LoopCompleted {
        critiques: usize,
        revisions: usize,
        duration_secs: f64,
    },
    ErrorEncountered {
        principle: Option<String>,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for loop events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        let mut stderr = std::io::stderr();
        match self.format {
            LogFormat::Json => {
                if let Ok(json) = serde_json::to_string(event) {
                    let _ = writeln!(stderr, "{}", json);
                }
            }
            LogFormat::Pretty => {
                for line in Self::pretty_lines(event) {
                    let _ = writeln!(stderr, "{}", line);
                }
            }
            LogFormat::Compact => {
                let timestamp = chrono::Utc::now().format("%H:%M:%S");
                let _ = writeln!(stderr, "[{}] {}", timestamp, Self::compact_line(event));
            }
        }
    }

    fn pretty_lines(event: &LogEvent) -> Vec<String> {
        match event {
            LogEvent::LoopStarted {
                principles,
                input_preview,
            } => vec![
                String::new(),
                format!(
                    "{} {}",
                    "╭─".bright_blue(),
                    "constitution".bold().bright_white()
                ),
                format!(
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Input:".dimmed(),
                    truncate(input_preview, 60).dimmed()
                ),
                format!(
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Principles:".dimmed(),
                    principles
                ),
                "╰─".bright_blue().to_string(),
                String::new(),
            ],
            LogEvent::PrimaryCompleted { duration_secs, .. } => vec![format!(
                "  {} {} ({:.1}s)",
                "▶".bright_cyan(),
                "INITIAL RESPONSE".bright_cyan().bold(),
                duration_secs
            )],
            LogEvent::CritiqueStarted { index, principle } => vec![
                String::new(),
                format!(
                    "  {} {} {}",
                    "▶".bright_magenta(),
                    format!("CRITIQUE {}", index + 1).bright_magenta().bold(),
                    principle.dimmed()
                ),
            ],
            LogEvent::CritiqueCompleted {
                verdict, critique, ..
            } => {
                let styled = if verdict == "REVISE" {
                    format!("→ {}", verdict).bright_yellow().to_string()
                } else {
                    format!("✓ {}", verdict).bright_green().to_string()
                };
                let mut lines = vec![format!("    {}", styled)];
                if let Some(critique) = critique {
                    lines.push(format!("    {} {}", "│".dimmed(), truncate(critique, 100)));
                }
                lines
            }
            LogEvent::RevisionCompleted { duration_secs, .. } => vec![format!(
                "    {} Revised ({:.1}s)",
                "✎".bright_cyan(),
                duration_secs
            )],
            LogEvent::LoopCompleted {
                critiques,
                revisions,
                duration_secs,
            } => vec![
                String::new(),
                format!(
                    "{} {} critique(s), {} revision(s) in {:.1}s",
                    "✓".bright_green(),
                    critiques,
                    revisions,
                    duration_secs
                ),
            ],
            LogEvent::ErrorEncountered { principle, error } => {
                let location = principle
                    .as_deref()
                    .map(|p| format!(" in {}", p))
                    .unwrap_or_default();
                vec![
                    String::new(),
                    format!(
                        "{} Error{}: {}",
                        "✗".bright_red(),
                        location,
                        error.bright_red()
                    ),
                ]
            }
        }
    }

    fn compact_line(event: &LogEvent) -> String {
        match event {
            LogEvent::LoopStarted { principles, .. } => {
                format!("loop:start principles={}", principles)
            }
            LogEvent::PrimaryCompleted { duration_secs, .. } => {
                format!("primary:done {:.1}s", duration_secs)
            }
            LogEvent::CritiqueStarted { index, principle } => {
                format!("critique:start:{} {}", index + 1, principle)
            }
            LogEvent::CritiqueCompleted { index, verdict, .. } => {
                format!("critique:done:{} {}", index + 1, verdict)
            }
            LogEvent::RevisionCompleted {
                index,
                duration_secs,
                ..
            } => format!("revision:done:{} {:.1}s", index + 1, duration_secs),
            LogEvent::LoopCompleted {
                critiques,
                revisions,
                duration_secs,
            } => format!(
                "loop:done critiques={} revisions={} {:.1}s",
                critiques, revisions, duration_secs
            ),
            LogEvent::ErrorEncountered { error, .. } => format!("error:{}", error),
        }
    }
}

/// Shorten a single-line preview, respecting char boundaries
pub fn truncate(s: &str, max_chars: usize) -> String {
    let flat: String = s
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_event_json_is_tagged() {
        let event = LogEvent::CritiqueStarted {
            index: 0,
            principle: "harmful1".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "critique_started");
        assert_eq!(json["principle"], "harmful1");
    }

    #[test]
    fn test_compact_lines_are_one_based() {
        let line = Logger::compact_line(&LogEvent::CritiqueCompleted {
            index: 1,
            principle: "p".into(),
            verdict: "REVISE".into(),
            critique: Some("bad".into()),
        });
        assert_eq!(line, "critique:done:2 REVISE");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("line\nbreak", 20), "line break");
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }

    #[test]
    fn test_file_log_appends_timestamped_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.jsonl");
        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();

        logger.log(&LogEvent::LoopCompleted {
            critiques: 2,
            revisions: 1,
            duration_secs: 0.5,
        });
        logger.log(&LogEvent::ErrorEncountered {
            principle: None,
            error: "boom".into(),
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "loop_completed");
        assert_eq!(lines[0]["revisions"], 1);
        assert!(lines[1]["timestamp"].is_string());
    }
}
