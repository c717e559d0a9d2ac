//! Text-to-value converters for property injection.
//!
//! The table is closed: a target type without a converter is an
//! [`UnsupportedType`](crate::error::PropertyError::UnsupportedType) error.
//! Applications add types with [`ConverterTable::register`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::trace;

use crate::bean::Value;
use crate::error::PropertyError;
use crate::key::TypeKey;

type Converter = Arc<dyn Fn(&str) -> std::result::Result<Value, String> + Send + Sync>;

/// Converters keyed by target type.
#[derive(Clone)]
pub struct ConverterTable {
    converters: HashMap<TypeKey, Converter>,
}

macro_rules! register_from_str {
    ($table:expr; $($ty:ty),* $(,)?) => {
        $( $table.register::<$ty, _>(|text| text.trim().parse::<$ty>()); )*
    };
}

impl ConverterTable {
    /// A table with no converters at all.
    pub fn empty() -> Self {
        Self {
            converters: HashMap::new(),
        }
    }

    /// Strings, booleans, integers, floats, `char` and the `chrono` date/time types.
    ///
    /// Everything but `String` is parsed from the trimmed text.
    pub fn standard() -> Self {
        let mut table = Self::empty();

        table.register::<String, std::convert::Infallible>(|text| Ok(text.to_string()));
        table.register::<bool, String>(parse_bool);
        register_from_str!(table; i8, i16, i32, i64, i128, isize);
        register_from_str!(table; u8, u16, u32, u64, u128, usize);
        register_from_str!(table; f32, f64, char);
        register_from_str!(table; NaiveDate, NaiveTime, NaiveDateTime, DateTime<Utc>);
        table.register::<DateTime<FixedOffset>, _>(|text| DateTime::parse_from_rfc3339(text.trim()));

        table
    }

    /// Adds or replaces the converter for `T`.
    pub fn register<T, E>(&mut self, parse: impl Fn(&str) -> std::result::Result<T, E> + Send + Sync + 'static)
    where
        T: Send + Sync + 'static,
        E: fmt::Display,
    {
        let key = TypeKey::of::<T>();
        trace!(target_type = %key, "Registered property converter");
        self.converters.insert(
            key,
            Arc::new(move |text: &str| {
                parse(text)
                    .map(|value| Box::new(value) as Value)
                    .map_err(|e| e.to_string())
            }),
        );
    }

    pub fn supports(&self, target: TypeKey) -> bool {
        self.converters.contains_key(&target)
    }

    /// Converts the value of property `key` to `target`.
    pub(crate) fn convert(&self, key: &str, text: &str, target: TypeKey) -> Result<Value, PropertyError> {
        let converter = self
            .converters
            .get(&target)
            .ok_or_else(|| PropertyError::UnsupportedType {
                key: key.to_string(),
                target,
            })?;

        converter(text).map_err(|reason| PropertyError::ConversionFailed {
            key: key.to_string(),
            value: text.to_string(),
            target,
            reason,
        })
    }
}

impl Default for ConverterTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for ConverterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut targets: Vec<String> = self.converters.keys().map(TypeKey::short_name).collect();
        targets.sort();
        f.debug_struct("ConverterTable").field("targets", &targets).finish()
    }
}

fn parse_bool(text: &str) -> std::result::Result<bool, String> {
    match text.trim() {
        t if t.eq_ignore_ascii_case("true") => Ok(true),
        t if t.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(format!("expected true or false, got {other:?}")),
    }
}
