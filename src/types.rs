use std::str::FromStr;

use serde::Deserialize;

/// What happens to the dependents of a task that failed.
///
/// - `Continue`: a failed task counts as settled; dependents still run and
///   the failure is reported at the end (default).
/// - `FailFast`: dependents of a failed task are marked failed without
///   running, and the invocation exits non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    #[default]
    Continue,
    FailFast,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "fail-fast" | "fail_fast" => Ok(FailurePolicy::FailFast),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"continue\" or \"fail-fast\")"
            )),
        }
    }
}

/// How connected browsers refresh after a watch binding's tasks settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadKind {
    /// Full page reload.
    #[default]
    Full,
    /// Re-fetch stylesheets in place.
    Inject,
}

/// CI-related environment read once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// `CONTEXT`: deploy context, forwarded to the generator as `JEKYLL_ENV`.
    pub context: Option<String>,
    /// `COMMIT_REF`: present on CI, where the vendored validator is used.
    pub commit_ref: Option<String>,
}

impl Environment {
    pub fn from_env() -> Self {
        Self {
            context: std::env::var("CONTEXT").ok().filter(|s| !s.is_empty()),
            commit_ref: std::env::var("COMMIT_REF").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_failure_policy() {
        assert_eq!("continue".parse(), Ok(FailurePolicy::Continue));
        assert_eq!(" Fail-Fast ".parse(), Ok(FailurePolicy::FailFast));
        assert!("stop".parse::<FailurePolicy>().is_err());
    }
}
