//! Input validation for strings passed to git
//!
//! Everything the user types (ref names, revisions, ranges, paths) ends up
//! as a git argument. Validation rejects anything git could read as an
//! option or that does not have the expected shape.

use gittree_core::{GitTreeError, Result};

/// Characters git forbids anywhere in a ref name
const REF_FORBIDDEN: &[char] = &[' ', '~', '^', ':', '?', '*', '[', '\\'];

/// Characters never accepted in a revision expression
const REV_FORBIDDEN: &[char] = &[';', '`', '$', '|', '&', '<', '>', '\'', '"', '(', ')', '\\', '*', '?', '['];

/// Validate a new branch or tag name against git's ref-name rules
pub fn validate_ref_name(input: &str) -> Result<&str> {
    let reject = |why: &str| Err(GitTreeError::InvalidRefName(format!("'{}' {}", input, why)));

    if input.is_empty() {
        return Err(GitTreeError::InvalidRefName("name cannot be empty".to_string()));
    }
    if input.starts_with('-') {
        return reject("cannot start with '-'");
    }
    if input == "@" || input == "HEAD" {
        return reject("is reserved");
    }
    if input.chars().any(|c| c.is_control() || REF_FORBIDDEN.contains(&c)) {
        return reject("contains a forbidden character");
    }
    if input.contains("..") || input.contains("@{") || input.contains("//") {
        return reject("contains a forbidden sequence");
    }
    if input.ends_with('/') || input.ends_with('.') || input.ends_with(".lock") {
        return reject("has a forbidden ending");
    }
    if input.starts_with('/') || input.split('/').any(|part| part.starts_with('.')) {
        return reject("has a component starting with '.'");
    }
    Ok(input)
}

/// Validate a single revision (`main`, `v1.2`, `HEAD~3`, `abc123^2`)
pub fn validate_revision(input: &str) -> Result<&str> {
    if input.is_empty() {
        return Err(GitTreeError::InvalidFilter("empty revision".to_string()));
    }
    if input.starts_with('-') {
        return Err(GitTreeError::InvalidFilter(format!(
            "revision cannot start with '-': '{}'",
            input
        )));
    }
    if input
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || REV_FORBIDDEN.contains(&c))
    {
        return Err(GitTreeError::InvalidFilter(format!(
            "revision contains unsafe characters: '{}'",
            input
        )));
    }
    Ok(input)
}

/// Validate a rev range: `A`, `A..B`, `A...B`, `A..` or `..B`
pub fn validate_range(input: &str) -> Result<&str> {
    let (left, right) = match input.split_once("...") {
        Some(parts) => parts,
        None => match input.split_once("..") {
            Some(parts) => parts,
            None => {
                validate_revision(input)?;
                return Ok(input);
            }
        },
    };

    if left.is_empty() && right.is_empty() {
        return Err(GitTreeError::InvalidFilter(format!(
            "range needs at least one revision: '{}'",
            input
        )));
    }
    if right.contains("..") {
        return Err(GitTreeError::InvalidFilter(format!(
            "malformed range: '{}'",
            input
        )));
    }
    for side in [left, right] {
        if !side.is_empty() {
            validate_revision(side)?;
        }
    }
    Ok(input)
}

/// Validate a path filter
pub fn validate_path(input: &str) -> Result<&str> {
    if input.is_empty() {
        return Err(GitTreeError::InvalidFilter("empty path".to_string()));
    }
    if input.starts_with('-') {
        return Err(GitTreeError::InvalidFilter(format!(
            "path cannot start with '-': '{}'",
            input
        )));
    }
    if input.contains('\0') {
        return Err(GitTreeError::InvalidFilter("path contains null byte".to_string()));
    }
    if input.split(['/', '\\']).any(|part| part == "..") {
        return Err(GitTreeError::InvalidFilter(format!(
            "path contains directory traversal: '{}'",
            input
        )));
    }
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ref_names() {
        assert!(validate_ref_name("feature").is_ok());
        assert!(validate_ref_name("feature/login-form").is_ok());
        assert!(validate_ref_name("v1.2.3").is_ok());
        assert!(validate_ref_name("release_2024").is_ok());
    }

    #[test]
    fn test_invalid_ref_names() {
        for bad in [
            "", "-f", "has space", "a..b", "a@{1}", "end/", "end.", "x.lock", ".hidden",
            "a/.b", "a//b", "what?", "tilde~1", "caret^", "colon:x", "HEAD", "tab\tname",
        ] {
            assert!(validate_ref_name(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_ranges() {
        for good in ["main", "main..feature", "v1.0...v2.0", "v1.2..", "..HEAD", "HEAD~3", "abc123^2"] {
            assert!(validate_range(good).is_ok(), "rejected {:?}", good);
        }
        for bad in ["..", "...", "--all", "main..--x", "a b", "a;b", "a..b..c", "$(x)"] {
            assert!(validate_range(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_paths() {
        assert!(validate_path("src/main.rs").is_ok());
        assert!(validate_path("docs/my file.md").is_ok());
        assert!(validate_path("a..b.txt").is_ok());
        assert!(validate_path("../etc/passwd").is_err());
        assert!(validate_path("src/../../x").is_err());
        assert!(validate_path("--output=x").is_err());
        assert!(validate_path("a\0b").is_err());
        assert!(validate_path("").is_err());
    }
}
