//! Name validation, run before any I/O.

use crate::errors::{Result, StrataError};

/// Longest accepted project or file name.
pub const MAX_NAME_LEN: usize = 255;

/// Validate a project name: non-empty, bounded, no path separators or
/// control characters.
pub fn validate_project_name(name: &str) -> Result<()> {
    check_common("project", name)?;
    if name.contains(['/', '\\']) {
        return Err(StrataError::validation(format!(
            "project name must not contain path separators: {name:?}"
        )));
    }
    Ok(())
}

/// Validate a file name: non-empty, bounded, relative, no `..` segments or
/// control characters. Nested paths (`docs/intro.md`) are allowed.
pub fn validate_file_name(name: &str) -> Result<()> {
    check_common("file", name)?;
    if name.starts_with('/') || name.starts_with('\\') {
        return Err(StrataError::validation(format!(
            "file name must be relative: {name:?}"
        )));
    }
    if name.split(['/', '\\']).any(|segment| segment == ".." || segment.is_empty()) {
        return Err(StrataError::validation(format!(
            "file name has an empty or parent segment: {name:?}"
        )));
    }
    Ok(())
}

fn check_common(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(StrataError::validation(format!("{kind} name is empty")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(StrataError::validation(format!(
            "{kind} name exceeds {MAX_NAME_LEN} characters"
        )));
    }
    if name.chars().any(char::is_control) {
        return Err(StrataError::validation(format!(
            "{kind} name contains control characters"
        )));
    }
    if name == "." || name == ".." {
        return Err(StrataError::validation(format!("{kind} name is reserved: {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(validate_project_name("alpha-2").is_ok());
        assert!(validate_file_name("README.md").is_ok());
        assert!(validate_file_name("docs/guide/intro.md").is_ok());
    }

    #[test]
    fn invalid_project_names() {
        let long = "x".repeat(256);
        for name in ["", "   ", "a/b", "a\\b", "..", "tab\there", long.as_str()] {
            assert!(validate_project_name(name).is_err(), "{name:?} should fail");
        }
    }

    #[test]
    fn invalid_file_names() {
        for name in ["", "/etc/passwd", "../secret", "docs/../../x", "a//b", "nul\0byte"] {
            assert!(validate_file_name(name).is_err(), "{name:?} should fail");
        }
    }
}
