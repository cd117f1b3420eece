use console::{style, StyledObject};
use serde::Serialize;
use std::fmt::Display;

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Writes command results either as styled terminal text or as JSON envelopes
/// of the form `{"status": ..., "data" | "message": ...}`.
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        let format = if json { OutputFormat::Json } else { OutputFormat::Human };
        Self { format }
    }

    pub fn success(&self, message: impl Display) {
        self.status_line("success", style("✓").green().bold(), message, false);
    }

    pub fn info(&self, message: impl Display) {
        self.status_line("info", style("ℹ").blue().bold(), message, false);
    }

    /// Warnings go to stderr in both modes
    pub fn warning(&self, message: impl Display) {
        self.status_line("warning", style("⚠").yellow().bold(), message, true);
    }

    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let rendered = match self.format {
            OutputFormat::Human => serde_json::to_string_pretty(&data)?,
            OutputFormat::Json => {
                serde_json::to_string_pretty(&serde_json::json!({ "status": "success", "data": data }))?
            }
        };
        println!("{}", rendered);
        Ok(())
    }

    /// Labelled value; silent in JSON mode, where callers emit `result` instead
    pub fn kv(&self, key: impl Display, value: impl Display) {
        if self.format == OutputFormat::Human {
            println!("  {:<18} {}", style(format!("{}:", key)).bold(), value);
        }
    }

    pub fn section(&self, title: impl Display) {
        if self.format == OutputFormat::Human {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    fn status_line(&self, status: &str, icon: StyledObject<&str>, message: impl Display, stderr: bool) {
        let line = match self.format {
            OutputFormat::Human => format!("{} {}", icon, message),
            OutputFormat::Json => {
                format!("{:#}", serde_json::json!({ "status": status, "message": message.to_string() }))
            }
        };
        if stderr {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// Check mark or cross for a yes/no value
pub fn mark(ok: bool) -> String {
    if ok {
        style("✓").green().to_string()
    } else {
        style("✗").red().to_string()
    }
}
