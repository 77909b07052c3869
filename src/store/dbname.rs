use crate::error::{Error, Result};

/// Namespace tag prefixed to every backend database name.
pub const DB_NAME_PREFIX: &str = "proj_";

/// Longest accepted project name. Keeps the derived database name within the
/// 64-character identifier limit shared by the supported backends.
pub const MAX_PROJECT_NAME_LEN: usize = 58;

/// Derives the backend database name for a project: every character outside
/// `[A-Za-z0-9_]` is replaced 1:1 with `_`, then the namespace prefix is
/// applied. `"My Proj!"` becomes `"proj_My_Proj_"`.
///
/// Distinct project names can sanitize to the same database name; creation
/// rejects those as collisions (see the store's uniqueness constraint).
#[must_use]
pub fn derive_db_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    format!("{DB_NAME_PREFIX}{sanitized}")
}

pub fn validate_project_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::BadRequest("Project name cannot be empty".to_string()));
    }
    if name.len() > MAX_PROJECT_NAME_LEN {
        return Err(Error::BadRequest(format!(
            "Project name cannot exceed {MAX_PROJECT_NAME_LEN} characters"
        )));
    }
    const INVALID_CHARS: &[char] = &['\0', '\n', '\r'];
    if name.chars().any(|c| INVALID_CHARS.contains(&c)) {
        return Err(Error::BadRequest(
            "Project name contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_db_name_basic() {
        assert_eq!(derive_db_name("Sales"), "proj_Sales");
        assert_eq!(derive_db_name("my_proj"), "proj_my_proj");
    }

    #[test]
    fn test_derive_db_name_replaces_one_to_one() {
        assert_eq!(derive_db_name("My Proj!"), "proj_My_Proj_");
        assert_eq!(derive_db_name("a-b.c"), "proj_a_b_c");
    }

    #[test]
    fn test_derive_db_name_collisions_are_possible() {
        // Creation must treat these as the same backend database.
        assert_eq!(derive_db_name("My Proj!"), derive_db_name("My_Proj_"));
    }

    #[test]
    fn test_validate_project_name() {
        assert!(validate_project_name("Sales").is_ok());
        assert!(validate_project_name("My Proj!").is_ok());
        assert!(validate_project_name("").is_err());
        assert!(validate_project_name(&"x".repeat(59)).is_err());
        assert!(validate_project_name("bad\nname").is_err());
    }
}
