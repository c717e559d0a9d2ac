//! The property store and the sources it is loaded from.
//!
//! Environment variables form the bottom layer; every other source is
//! overlaid on top in the order it was added, later sources winning per key.
//!
//! ```
//! use sunduq_container::source::PropertyStore;
//!
//! let store = PropertyStore::builder()
//!     .with_variables([("PORT", "80"), ("server.port", "8080")])
//!     .with_properties("app.properties", "server.port = 9090\n# comment\n")?
//!     .with_toml("app.toml", "[db]\nurl = \"postgres://db\"\npool = 4\n")?
//!     .build();
//!
//! assert_eq!(store.get("server.port"), Some("9090"));
//! assert_eq!(store.get("db.pool"), Some("4"));
//! assert_eq!(store.get("PORT"), Some("80"));
//! # Ok::<(), sunduq_container::error::SunduqError>(())
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{PropertyError, Result};

/// Immutable key → string mapping consulted by the property resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyStore {
    values: HashMap<String, String>,
}

impl PropertyStore {
    pub fn builder() -> PropertyStoreBuilder {
        PropertyStoreBuilder::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for PropertyStore
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Collects the layers of a [`PropertyStore`].
#[derive(Debug, Default)]
pub struct PropertyStoreBuilder {
    environment: HashMap<String, String>,
    overlay: HashMap<String, String>,
}

impl PropertyStoreBuilder {
    /// The process environment as the bottom layer.
    ///
    /// Variables whose name or value is not valid UTF-8 are skipped.
    pub fn with_environment(self) -> Self {
        let vars = std::env::vars_os().filter_map(|(key, value)| {
            match (key.into_string(), value.into_string()) {
                (Ok(key), Ok(value)) => Some((key, value)),
                (key, _) => {
                    let key = key.unwrap_or_else(|raw| raw.to_string_lossy().into_owned());
                    warn!(variable = %key, "Skipping non-UTF-8 environment variable");
                    None
                }
            }
        });
        self.with_variables(vars)
    }

    /// Explicit variables as the bottom layer, in place of the environment.
    pub fn with_variables<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.environment
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Overlays key/value pairs.
    pub fn with_map<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overlay
            .extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Overlays `.properties` text; `source_name` is used in errors.
    pub fn with_properties(self, source_name: &str, text: &str) -> Result<Self> {
        let values = parse_properties(source_name, text)?;
        debug!(source = source_name, keys = values.len(), "Loaded properties source");
        Ok(self.with_map(values))
    }

    pub fn with_properties_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read_source(path)?;
        self.with_properties(&path.display().to_string(), &text)
    }

    /// Overlays a TOML document flattened into dotted keys.
    pub fn with_toml(self, source_name: &str, text: &str) -> Result<Self> {
        let values = parse_toml(source_name, text)?;
        debug!(source = source_name, keys = values.len(), "Loaded TOML source");
        Ok(self.with_map(values))
    }

    pub fn with_toml_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read_source(path)?;
        self.with_toml(&path.display().to_string(), &text)
    }

    pub fn build(self) -> PropertyStore {
        let mut values = self.environment;
        values.extend(self.overlay);
        debug!(keys = values.len(), "Property store built");
        PropertyStore { values }
    }
}

fn invalid_source(source_name: &str, reason: impl Into<String>) -> PropertyError {
    PropertyError::InvalidSource {
        source_name: source_name.to_string(),
        reason: reason.into(),
    }
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| invalid_source(&path.display().to_string(), e.to_string()).into())
}

// ═══════════════════════════════════════════
// .properties
// ═══════════════════════════════════════════

/// Parses Java-style `.properties` text.
///
/// Supports `=`, `:` and whitespace separators, `#`/`!` comment lines,
/// backslash line continuations and the usual escapes including `\uXXXX`.
fn parse_properties(source_name: &str, text: &str) -> Result<Vec<(String, String)>> {
    let mut values = Vec::new();
    let mut logical = String::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim_start();
        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }

        if ends_with_continuation(line) {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }
        logical.push_str(line);

        let (key, value) = split_entry(&logical);
        let key = unescape(key).map_err(|reason| invalid_source(source_name, format!("line {}: {reason}", index + 1)))?;
        let value = unescape(value).map_err(|reason| invalid_source(source_name, format!("line {}: {reason}", index + 1)))?;
        values.push((key, value));
        logical.clear();
    }

    if !logical.is_empty() {
        let (key, value) = split_entry(&logical);
        let key = unescape(key).map_err(|reason| invalid_source(source_name, reason))?;
        let value = unescape(value).map_err(|reason| invalid_source(source_name, reason))?;
        values.push((key, value));
    }

    Ok(values)
}

/// An odd number of trailing backslashes continues the line.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (line[..i].trim_end(), line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..i], rest.trim_start());
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(text: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("malformed \\u escape {hex:?}"))?;
                out.push(code);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

// ═══════════════════════════════════════════
// TOML
// ═══════════════════════════════════════════

fn parse_toml(source_name: &str, text: &str) -> Result<Vec<(String, String)>> {
    let table: toml::Table = text
        .parse()
        .map_err(|e: toml::de::Error| invalid_source(source_name, e.message().to_string()))?;
    let mut values = Vec::new();
    flatten_table("", &table, &mut values);
    Ok(values)
}

fn flatten_table(prefix: &str, table: &toml::Table, out: &mut Vec<(String, String)>) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        flatten_value(key, value, out);
    }
}

fn flatten_value(key: String, value: &toml::Value, out: &mut Vec<(String, String)>) {
    match value {
        toml::Value::String(s) => out.push((key, s.clone())),
        toml::Value::Integer(i) => out.push((key, i.to_string())),
        toml::Value::Float(f) => out.push((key, f.to_string())),
        toml::Value::Boolean(b) => out.push((key, b.to_string())),
        toml::Value::Datetime(d) => out.push((key, d.to_string())),
        toml::Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(format!("{key}[{i}]"), item, out);
            }
        }
        toml::Value::Table(table) => flatten_table(&key, table, out),
    }
}
