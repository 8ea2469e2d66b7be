use std::collections::BTreeMap;

use anyhow::{bail, Result};

/// Default environment variable prefix for static label dimensions.
pub const DEFAULT_LABEL_PREFIX: &str = "EXPORTER_LABEL_";

/// Label names owned by the two exported families.
pub const RESERVED_LABELS: &[&str] = &[
    "state",
    "remote_address",
    "remote_port",
    "local_address",
    "local_port",
];

/// Process-wide label dimensions attached to every exported sample.
///
/// Built once at startup and never mutated. Keys are kept sorted so the
/// label order of each family is stable for the process lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticLabels {
    labels: BTreeMap<String, String>,
}

impl StaticLabels {
    /// Collects labels from the process environment.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_vars(std::env::vars(), prefix)
    }

    /// Collects labels from `(name, value)` pairs whose name starts with
    /// `prefix`. The prefix is stripped to form the label key.
    pub fn from_vars<I, K, V>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let labels = vars
            .into_iter()
            .filter_map(|(name, value)| {
                name.as_ref()
                    .strip_prefix(prefix)
                    .map(|key| (key.to_string(), value.into()))
            })
            .collect();

        Self { labels }
    }

    /// Rejects keys that are not usable as Prometheus label names.
    pub fn validate(&self) -> Result<()> {
        for key in self.labels.keys() {
            if !is_valid_label_name(key) {
                bail!("invalid static label name: {key:?}");
            }
            if key.starts_with("__") {
                bail!("static label name {key:?} uses the reserved \"__\" prefix");
            }
            if RESERVED_LABELS.contains(&key.as_str()) {
                bail!("static label name {key:?} collides with a built-in label");
            }
        }
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.labels.values().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
