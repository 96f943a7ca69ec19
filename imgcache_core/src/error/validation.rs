//! Validation related error types

use thiserror::Error;

/// Input validation and profile errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Malformed input to a cache call
    #[error("Invalid argument '{parameter}': {reason}")]
    InvalidArgument { parameter: String, reason: String },

    /// Platform profile value out of range
    #[error("Invalid profile setting '{field}': {reason}")]
    InvalidProfile { field: String, reason: String },
}

impl ValidationError {
    /// Create an invalid argument error
    pub fn invalid_argument(parameter: &str, reason: &str) -> Self {
        Self::InvalidArgument {
            parameter: parameter.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid profile error
    pub fn invalid_profile(field: &str, reason: &str) -> Self {
        Self::InvalidProfile {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Check that `url` is something the prefetch primitive can be handed
///
/// Accepts `scheme://rest` URLs and absolute filesystem paths. Rejects empty
/// strings and anything containing whitespace.
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    if url.trim().is_empty() {
        return Err(ValidationError::invalid_argument("url", "must not be empty"));
    }

    if url.chars().any(char::is_whitespace) {
        return Err(ValidationError::invalid_argument(
            "url",
            "must not contain whitespace",
        ));
    }

    if let Some((scheme, rest)) = url.split_once("://") {
        let scheme_ok = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok {
            return Err(ValidationError::invalid_argument("url", "invalid scheme"));
        }
        if rest.is_empty() {
            return Err(ValidationError::invalid_argument("url", "missing location"));
        }
        return Ok(());
    }

    if url.starts_with('/') {
        return Ok(());
    }

    Err(ValidationError::invalid_argument(
        "url",
        "expected scheme://location or an absolute path",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_error() {
        let error = ValidationError::invalid_argument("batch_size", "must be greater than 0");
        assert!(error.to_string().contains("Invalid argument"));
        assert!(error.to_string().contains("batch_size"));
        assert!(error.to_string().contains("must be greater than 0"));
    }

    #[test]
    fn test_invalid_profile_error() {
        let error = ValidationError::invalid_profile("chunk_size", "must be at least 1");
        assert!(error.to_string().contains("chunk_size"));
    }

    #[test]
    fn test_validate_url_accepts_remote_and_paths() {
        assert!(validate_url("https://picsum.photos/200/300").is_ok());
        assert!(validate_url("http://localhost:8080/a.png").is_ok());
        assert!(validate_url("file:///tmp/a.png").is_ok());
        assert!(validate_url("/var/assets/logo.png").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_malformed() {
        assert!(validate_url("").is_err());
        assert!(validate_url("   ").is_err());
        assert!(validate_url("https://exa mple.com/a.png").is_err());
        assert!(validate_url("://nohost").is_err());
        assert!(validate_url("https://").is_err());
        assert!(validate_url("relative/path.png").is_err());
    }
}
