use std::fmt;

/// Severity of a non-fatal resolution issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
	/// Informational provenance notes.
	Info,
	/// Something was skipped or substituted; resolution continued.
	Warning,
	/// A whole subsystem degraded (e.g. validation disabled entirely).
	Critical,
}

impl Severity {
	pub fn as_str(&self) -> &'static str {
		match self {
			Severity::Info => "info",
			Severity::Warning => "warning",
			Severity::Critical => "critical",
		}
	}
}

/// A non-fatal issue observed during configuration resolution.
///
/// Diagnostics are returned alongside results rather than written to a
/// process-wide logger, so callers decide how to surface them. The CLI prints
/// them to stderr; a successful conversion's exit code is unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
	pub severity: Severity,
	pub message: String,
}

impl Diagnostic {
	pub fn info(message: impl Into<String>) -> Self {
		Diagnostic {
			severity: Severity::Info,
			message: message.into(),
		}
	}

	pub fn warning(message: impl Into<String>) -> Self {
		Diagnostic {
			severity: Severity::Warning,
			message: message.into(),
		}
	}

	pub fn critical(message: impl Into<String>) -> Self {
		Diagnostic {
			severity: Severity::Critical,
			message: message.into(),
		}
	}
}

impl fmt::Display for Diagnostic {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.severity.as_str(), self.message)
	}
}
