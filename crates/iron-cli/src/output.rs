//! Output formatting for CLI commands.
//!
//! Text output uses the `-----> message` / `       detail` layout. JSON output
//! suppresses every banner and writes a single object per command.

use std::io::Write;

use serde::{Serialize, Serializer};

use crate::cli::Format;
use crate::error::CliError;

/// Prefix of progress lines.
pub const LINES: &str = "----->";

/// Prefix of detail lines, aligned under the text of a progress line.
pub const BLANKS: &str = "      ";

/// Output formatter that handles both text and JSON output.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Check if JSON format is selected.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.format, Format::Json)
    }

    /// Write a progress line. Nothing is written in JSON mode.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn banner<W: Write>(&self, writer: &mut W, message: &str) -> Result<(), CliError> {
        if !self.is_json() {
            writeln!(writer, "{LINES} {message}")?;
        }
        Ok(())
    }

    /// Write a detail line. Nothing is written in JSON mode.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn detail<W: Write>(&self, writer: &mut W, message: &str) -> Result<(), CliError> {
        if !self.is_json() {
            writeln!(writer, "{BLANKS} {message}")?;
        }
        Ok(())
    }

    /// Write a command result.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TextDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Text => {
                value.write_text(writer)?;
            }
        }
        Ok(())
    }

    /// Write a command result to a string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_string<T>(&self, value: &T) -> Result<String, CliError>
    where
        T: Serialize + TextDisplay,
    {
        let mut buf = Vec::new();
        self.write(&mut buf, value)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("UTF-8 error: {e}")))
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Text)
    }
}

/// Trait for results that have a human-readable form.
pub trait TextDisplay {
    /// Write the value as human-readable text.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

/// A queued task or created schedule.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    /// Assigned id.
    pub id: String,
    /// Dashboard link.
    pub url: String,
    /// Log of the finished task, when waited for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
    #[serde(skip)]
    what: &'static str,
}

impl Submission {
    /// A queued task.
    #[must_use]
    pub fn queued(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            log: None,
            what: "Queued task",
        }
    }

    /// A created schedule.
    #[must_use]
    pub fn scheduled(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            log: None,
            what: "Scheduled task",
        }
    }
}

impl TextDisplay for Submission {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{BLANKS} {} with id='{}'", self.what, self.id)?;
        writeln!(writer, "{BLANKS} Check {}", self.url)?;
        Ok(())
    }
}

/// Status of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusReport {
    /// Task id.
    pub id: String,
    /// Status value as reported by the service.
    pub status: String,
}

impl TextDisplay for TaskStatusReport {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.status)?;
        Ok(())
    }
}

/// Log of one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskLog {
    /// Task id.
    pub id: String,
    /// Log content exactly as returned by the service.
    #[serde(serialize_with = "lossy_utf8")]
    pub log: Vec<u8>,
}

impl TextDisplay for TaskLog {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writer.write_all(&self.log)?;
        writeln!(writer)?;
        Ok(())
    }
}

fn lossy_utf8<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

/// An uploaded code package.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedCode {
    /// Code package id.
    pub id: String,
    /// Host the package is served at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Dashboard link.
    pub url: String,
}

impl TextDisplay for UploadedCode {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{BLANKS} Uploaded code package with id='{}'", self.id)?;
        if let Some(host) = &self.host {
            writeln!(writer, "{BLANKS} Hosted at: '{host}'")?;
        }
        writeln!(writer, "{BLANKS} Check {}", self.url)?;
        Ok(())
    }
}

/// Result of storing docker registry credentials.
#[derive(Debug, Clone, Serialize)]
pub struct StoredCredentials {
    /// Registry URL.
    pub url: String,
    /// Service message.
    pub msg: String,
}

impl TextDisplay for StoredCredentials {
    fn write_text<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{BLANKS} Added docker repo credentials: {}", self.msg)?;
        Ok(())
    }
}
