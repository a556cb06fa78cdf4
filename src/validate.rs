use axum::http::StatusCode;
use regex::Regex;
use std::sync::LazyLock;

/// CRAN package names: letters, digits and dots, starting with a letter and
/// not ending with a dot.
static PACKAGE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9.]*[A-Za-z0-9]$").expect("valid regex"));

const MAX_PACKAGE_NAME_LEN: usize = 64;
const MAX_AUTHOR_NAME_LEN: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid package name: {0:?}")]
    PackageName(String),
    #[error("invalid author name")]
    AuthorName,
    #[error("query is required")]
    EmptyQuery,
}

impl From<ValidationError> for (StatusCode, String) {
    fn from(err: ValidationError) -> Self {
        (StatusCode::BAD_REQUEST, err.to_string())
    }
}

pub fn package_name(name: &str) -> Result<&str, ValidationError> {
    if name.len() > MAX_PACKAGE_NAME_LEN || !PACKAGE_NAME.is_match(name) {
        return Err(ValidationError::PackageName(name.to_string()));
    }
    Ok(name)
}

/// Trimmed author name, rejecting blanks, control characters and overlong
/// input.
pub fn author_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty()
        || name.chars().count() > MAX_AUTHOR_NAME_LEN
        || name.chars().any(char::is_control)
    {
        return Err(ValidationError::AuthorName);
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_package_names() {
        for name in ["ggplot2", "data.table", "R6", "Rcpp"] {
            assert_eq!(package_name(name), Ok(name));
        }
    }

    #[test]
    fn test_invalid_package_names() {
        for name in ["", "a", "2fast", "trailing.", "has space", "../etc", "dash-name"] {
            assert!(package_name(name).is_err(), "{name:?} should be rejected");
        }
        assert!(package_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_author_name_trimmed() {
        assert_eq!(author_name("  Hadley Wickham "), Ok("Hadley Wickham"));
    }

    #[test]
    fn test_invalid_author_names() {
        assert_eq!(author_name("   "), Err(ValidationError::AuthorName));
        assert_eq!(author_name("bad\u{0}name"), Err(ValidationError::AuthorName));
        assert!(author_name(&"x".repeat(257)).is_err());
    }

    #[test]
    fn test_validation_error_maps_to_bad_request() {
        let (status, message): (StatusCode, String) = ValidationError::EmptyQuery.into();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "query is required");
    }
}
