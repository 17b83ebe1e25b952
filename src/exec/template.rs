// src/exec/template.rs

//! `${VAR}` expansion for tool command templates.

use std::collections::{BTreeMap, HashMap};
use std::env;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static BRACED_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid variable regex")
});

/// Values available to command templates.
///
/// Lookup order for `${NAME}`: per-invocation values passed to
/// [`Variables::expand`], then `[variables]` from the config, then
/// `ENV_<NAME>` entries built from the process environment. Unknown
/// placeholders are left untouched so the shell can still see them.
///
/// Per-invocation values are file paths and are shell-quoted; configured
/// values are inserted verbatim, as they may be shell fragments.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, String>,
}

impl Variables {
    pub fn new(configured: &BTreeMap<String, String>) -> Self {
        let mut values: HashMap<String, String> = env::vars()
            .map(|(key, value)| (format!("ENV_{key}"), value))
            .collect();
        values.extend(configured.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self { values }
    }

    /// Only the given values, without the process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn expand(&self, template: &str, local: &[(&str, &str)]) -> String {
        BRACED_VAR
            .replace_all(template, |caps: &Captures| {
                let name = &caps[1];
                local
                    .iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| shell_quote(v))
                    .or_else(|| self.values.get(name).cloned())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// Quote `value` for `sh -c` unless it is made of safe characters only.
pub fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c));
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
