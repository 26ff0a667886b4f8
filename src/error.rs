//! Typed failures carried inside `eyre::Report`.

use crate::types::ValidationError;

/// Errors that can occur while talking to the external store.
#[derive(Debug)]
pub enum LinksError {
    /// The clink binary could not be found.
    ToolNotFound { program: String },
    /// clink ran but exited non-zero.
    ProcessFailed { code: Option<i32>, stderr: String },
    /// clink output did not match the record grammar.
    Parse(String),
    /// Caller supplied a malformed restriction or substitution.
    Validation(ValidationError),
    /// Nothing matched.
    NotFound(String),
}

impl std::fmt::Display for LinksError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinksError::ToolNotFound { program } => {
                write!(
                    f,
                    "LinkDB not available: {} command not found. Please install link-cli.",
                    program
                )
            }
            LinksError::ProcessFailed { code, stderr } => match code {
                Some(code) => write!(f, "LinkDB query failed with exit code {}: {}", code, stderr.trim()),
                None => write!(f, "LinkDB query terminated by signal: {}", stderr.trim()),
            },
            LinksError::Parse(msg) => write!(f, "failed to parse clink output: {}", msg),
            LinksError::Validation(e) => write!(f, "validation error: {}", e),
            LinksError::NotFound(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LinksError {}

impl From<ValidationError> for LinksError {
    fn from(e: ValidationError) -> Self {
        LinksError::Validation(e)
    }
}

impl LinksError {
    /// Recover the typed error from an `eyre::Report`, looking through context layers.
    pub fn from_report(report: &eyre::Report) -> Option<&LinksError> {
        report.chain().find_map(|e| e.downcast_ref::<LinksError>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_not_found_message() {
        let err = LinksError::ToolNotFound {
            program: "clink".to_string(),
        };
        assert!(err.to_string().contains("clink command not found"));
    }

    #[test]
    fn test_from_report_through_context() {
        use eyre::WrapErr;

        let result: eyre::Result<()> = Err(eyre::eyre!(LinksError::NotFound("gone".to_string())));
        let report = result.wrap_err("while reading").unwrap_err();

        assert!(matches!(
            LinksError::from_report(&report),
            Some(LinksError::NotFound(msg)) if msg == "gone"
        ));
    }

    #[test]
    fn test_validation_wraps() {
        let err: LinksError = ValidationError::SubstitutionTooShort(1).into();
        assert!(err.to_string().starts_with("validation error"));
    }
}
