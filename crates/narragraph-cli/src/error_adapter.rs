//! Error adapter for converting NarragraphError to miette diagnostics.
//!
//! This module provides the bridge between the library's standard error types
//! and miette's graphical report formatting used in the CLI. Each error
//! variant gets a stable diagnostic code and, where there is something useful
//! to say, a help message.

use std::fmt;

use miette::{Diagnostic as MietteDiagnostic, LabeledSpan};

use narragraph::{ConfigError, NarragraphError};

/// Adapter that renders a [`NarragraphError`] as a miette diagnostic
pub struct ErrorAdapter<'a>(pub &'a NarragraphError);

impl fmt::Debug for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for ErrorAdapter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for ErrorAdapter<'_> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl MietteDiagnostic for ErrorAdapter<'_> {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = match self.0 {
            NarragraphError::Io(_) => "narragraph::io",
            NarragraphError::Config(_) => "narragraph::config",
            NarragraphError::Layout(_) => "narragraph::layout",
            NarragraphError::Serialization(_) => "narragraph::serialization",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help = match self.0 {
            NarragraphError::Config(ConfigError::InvalidValue { field, .. }) => {
                format!("check `{field}` in your configuration file")
            }
            NarragraphError::Serialization(_) => {
                "JSON input must be an array of {\"text\", \"start_ms\", \"end_ms\"} objects"
                    .to_string()
            }
            _ => return None,
        };
        Some(Box::new(help))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        None
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        None
    }
}

/// Wrap an error for rendering
pub fn to_reportable(err: &NarragraphError) -> ErrorAdapter<'_> {
    ErrorAdapter(err)
}
