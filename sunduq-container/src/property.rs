//! Property key expressions and typed property resolution.
//!
//! ```
//! use sunduq_container::property::PropertyResolver;
//! use sunduq_container::source::PropertyStore;
//!
//! let store = PropertyStore::builder().with_map([("server.port", "9090")]).build();
//! let resolver = PropertyResolver::new(store);
//!
//! let port: u16 = resolver.get_required("${server.port:8080}")?;
//! let timeout: u64 = resolver.get_required("${server.timeout:30}")?;
//! let host: Option<String> = resolver.get("${server.host}")?;
//!
//! assert_eq!((port, timeout, host), (9090, 30, None));
//! # Ok::<(), sunduq_container::error::SunduqError>(())
//! ```

use std::any::type_name;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::trace;

use crate::bean::Value;
use crate::convert::ConverterTable;
use crate::error::{PropertyError, Result, SunduqError};
use crate::key::TypeKey;
use crate::source::PropertyStore;

/// A parsed `${name}` or `${name:default}` expression.
///
/// The name ends at the first `:`; everything after it up to the closing
/// brace is the default. An empty default counts as no default.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    name: String,
    default: Option<String>,
}

impl PropertyKey {
    /// # Errors
    /// [`PropertyError::InvalidKey`] unless the expression is wrapped in
    /// `${` and `}` with a non-empty name.
    pub fn parse(expression: &str) -> std::result::Result<Self, PropertyError> {
        let invalid = || PropertyError::InvalidKey {
            expression: expression.to_string(),
        };

        let inner = expression
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
            .ok_or_else(invalid)?;

        let (name, default) = match inner.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (inner, None),
        };
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            default: default.filter(|d| !d.is_empty()).map(str::to_string),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

impl FromStr for PropertyKey {
    type Err = PropertyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "${{{}:{default}}}", self.name),
            None => write!(f, "${{{}}}", self.name),
        }
    }
}

/// Resolves key expressions against a [`PropertyStore`] and converts the text.
#[derive(Debug, Clone)]
pub struct PropertyResolver {
    store: Arc<PropertyStore>,
    converters: ConverterTable,
}

impl PropertyResolver {
    /// A resolver with the standard converter table.
    pub fn new(store: impl Into<Arc<PropertyStore>>) -> Self {
        Self {
            store: store.into(),
            converters: ConverterTable::standard(),
        }
    }

    pub fn with_converters(mut self, converters: ConverterTable) -> Self {
        self.converters = converters;
        self
    }

    /// Adds a converter for a further target type.
    pub fn register_converter<T, E>(&mut self, parse: impl Fn(&str) -> std::result::Result<T, E> + Send + Sync + 'static)
    where
        T: Send + Sync + 'static,
        E: fmt::Display,
    {
        self.converters.register(parse);
    }

    pub fn store(&self) -> &PropertyStore {
        &self.store
    }

    /// The raw stored value of `name`, without defaults or conversion.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.store.get(name)
    }

    /// The text an expression resolves to: the stored value, or the default
    /// when the value is missing or empty.
    pub fn get_text(&self, expression: &str) -> Result<Option<String>> {
        let key = PropertyKey::parse(expression)?;
        Ok(self.lookup(&key).map(str::to_string))
    }

    /// Resolves and converts `expression`; `None` if neither a value nor a
    /// default is present.
    ///
    /// # Errors
    /// [`PropertyError::InvalidKey`], [`PropertyError::UnsupportedType`] or
    /// [`PropertyError::ConversionFailed`].
    pub fn get<T: 'static>(&self, expression: &str) -> Result<Option<T>> {
        self.resolve(expression, TypeKey::of::<T>())?
            .map(|value| downcast::<T>(expression, value))
            .transpose()
    }

    /// Like [`get`](Self::get), failing with [`PropertyError::NotFound`] when absent.
    pub fn get_required<T: 'static>(&self, expression: &str) -> Result<T> {
        let value = self.resolve_required(expression, TypeKey::of::<T>())?;
        downcast::<T>(expression, value)
    }

    /// Resolves `expression` to a boxed value of type `target`.
    pub(crate) fn resolve_required(&self, expression: &str, target: TypeKey) -> Result<Value> {
        let key = PropertyKey::parse(expression)?;
        self.resolve_key(&key, target)?.ok_or_else(|| {
            PropertyError::NotFound {
                key: key.name().to_string(),
            }
            .into()
        })
    }

    fn resolve(&self, expression: &str, target: TypeKey) -> Result<Option<Value>> {
        let key = PropertyKey::parse(expression)?;
        self.resolve_key(&key, target)
    }

    fn resolve_key(&self, key: &PropertyKey, target: TypeKey) -> Result<Option<Value>> {
        if !self.converters.supports(target) {
            return Err(PropertyError::UnsupportedType {
                key: key.name().to_string(),
                target,
            }
            .into());
        }

        let Some(text) = self.lookup(key) else {
            trace!(key = key.name(), "Property absent");
            return Ok(None);
        };

        trace!(key = key.name(), target_type = %target, "Converting property");
        Ok(Some(self.converters.convert(key.name(), text, target)?))
    }

    fn lookup<'a>(&'a self, key: &'a PropertyKey) -> Option<&'a str> {
        self.store
            .get(key.name())
            .filter(|value| !value.is_empty())
            .or_else(|| key.default_value())
    }
}

fn downcast<T: 'static>(expression: &str, value: Value) -> Result<T> {
    value
        .downcast::<T>()
        .map(|v| *v)
        .map_err(|_| SunduqError::TypeMismatch {
            context: format!("property {expression}"),
            expected: type_name::<T>(),
        })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn resolver(pairs: &[(&str, &str)]) -> PropertyResolver {
        PropertyResolver::new(PropertyStore::builder().with_map(pairs.iter().copied()).build())
    }

    #[test]
    fn parse_plain_key() {
        let key = PropertyKey::parse("${db.url}").unwrap();
        assert_eq!(key.name(), "db.url");
        assert_eq!(key.default_value(), None);
    }

    #[test]
    fn default_excludes_separator() {
        let key: PropertyKey = "${port:8080}".parse().unwrap();
        assert_eq!(key.name(), "port");
        assert_eq!(key.default_value(), Some("8080"));
    }

    #[test]
    fn default_keeps_later_colons() {
        let key = PropertyKey::parse("${db.url:jdbc:h2:mem}").unwrap();
        assert_eq!(key.name(), "db.url");
        assert_eq!(key.default_value(), Some("jdbc:h2:mem"));
        assert_eq!(key.to_string(), "${db.url:jdbc:h2:mem}");
    }

    #[test]
    fn empty_default_is_absent() {
        let key = PropertyKey::parse("${port:}").unwrap();
        assert_eq!(key.default_value(), None);
    }

    #[test]
    fn malformed_keys() {
        for expression in ["", "port", "${port", "port}", "${}", "${:8080}", "$port"] {
            match PropertyKey::parse(expression) {
                Err(PropertyError::InvalidKey { expression: e }) => assert_eq!(e, expression),
                other => panic!("Expected InvalidKey for {expression:?}, got: {other:?}"),
            }
        }
    }

    #[test]
    fn default_fallback() {
        let absent = resolver(&[]);
        assert_eq!(absent.get_required::<u16>("${port:8080}").unwrap(), 8080);

        let present = resolver(&[("port", "9090")]);
        assert_eq!(present.get_required::<u16>("${port:8080}").unwrap(), 9090);

        let empty = resolver(&[("port", "")]);
        assert_eq!(empty.get_required::<u16>("${port:8080}").unwrap(), 8080);
    }

    #[test]
    fn missing_without_default() {
        let resolver = resolver(&[]);
        assert_eq!(resolver.get::<String>("${name}").unwrap(), None);

        match resolver.get_required::<String>("${name}") {
            Err(SunduqError::Property(PropertyError::NotFound { key })) => assert_eq!(key, "name"),
            other => panic!("Expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn unsupported_type_fails_even_when_absent() {
        struct Endpoint;
        let resolver = resolver(&[]);
        assert!(matches!(
            resolver.get::<Endpoint>("${endpoint}"),
            Err(SunduqError::Property(PropertyError::UnsupportedType { .. }))
        ));
    }

    #[test]
    fn typed_values() {
        let resolver = resolver(&[("debug", "true"), ("since", "2024-12-06"), ("name", "shop")]);
        assert!(resolver.get_required::<bool>("${debug}").unwrap());
        assert_eq!(
            resolver.get_required::<NaiveDate>("${since}").unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 6).unwrap()
        );
        assert_eq!(resolver.get_text("${name}").unwrap().as_deref(), Some("shop"));
        assert_eq!(resolver.property("name"), Some("shop"));
    }

    #[test]
    fn registered_converter() {
        #[derive(Debug, PartialEq)]
        struct Percent(u8);

        let mut resolver = resolver(&[("load", "75%")]);
        resolver.register_converter::<Percent, String>(|text| {
            text.strip_suffix('%')
                .and_then(|n| n.parse().ok())
                .map(Percent)
                .ok_or_else(|| format!("not a percentage: {text}"))
        });

        assert_eq!(resolver.get_required::<Percent>("${load}").unwrap(), Percent(75));
        assert_eq!(resolver.get_required::<Percent>("${idle:5%}").unwrap(), Percent(5));
    }
}
