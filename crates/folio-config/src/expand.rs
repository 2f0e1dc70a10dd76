//! `${VAR}` and `${VAR:-default}` expansion for configuration strings.

use crate::ConfigError;

/// Variable referenced without a default and not set.
struct UnsetVar(String);

/// Expand `${VAR}` references in `value`; `field` names the setting in errors.
///
/// Strings without `${` are returned as is, so bare `$` survives.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| match std::env::var(var) {
        Ok(val) => Ok(Some(val)),
        Err(_) => Err(UnsetVar(var.to_owned())),
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{}}} not set", e.cause.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_set_var_inside_path() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::set_var("FOLIO_TEST_CONTENT_HOME", "/srv");
        }
        let result = expand_env("${FOLIO_TEST_CONTENT_HOME}/content", "content.root_dir").unwrap();
        assert_eq!(result, "/srv/content");
        unsafe {
            std::env::remove_var("FOLIO_TEST_CONTENT_HOME");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("FOLIO_TEST_UNSET_ROOT");
        }
        let result = expand_env("${FOLIO_TEST_UNSET_ROOT:-site}", "content.root_dir").unwrap();
        assert_eq!(result, "site");
    }

    #[test]
    fn test_expand_unset_var_names_field() {
        // SAFETY: the variable name is unique to this test
        unsafe {
            std::env::remove_var("FOLIO_TEST_MISSING_ROOT");
        }
        let err = expand_env("${FOLIO_TEST_MISSING_ROOT}", "content.root_dir").unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("FOLIO_TEST_MISSING_ROOT"));
        assert!(err.to_string().contains("content.root_dir"));
    }

    #[test]
    fn test_expand_without_braces_is_literal() {
        assert_eq!(expand_env("/data/$HOME", "f").unwrap(), "/data/$HOME");
    }
}
