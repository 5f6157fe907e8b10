//! Expiry Accessor Module
//!
//! How the scheduler reads an expiration timestamp out of a stored value.

use serde_json::Value;

use crate::config::{Config, DEFAULT_EXPIRY_FIELD};
use crate::error::{CleanerError, Result};

// == Expiry ==
/// Reads the expiration timestamp (Unix milliseconds) of a value.
///
/// Any `Fn(&V) -> i64` closure is an `Expiry<V>`.
pub trait Expiry<V>: Send + Sync + 'static {
    fn expires_at(&self, value: &V) -> Result<i64>;
}

impl<V, F> Expiry<V> for F
where
    F: Fn(&V) -> i64 + Send + Sync + 'static,
{
    fn expires_at(&self, value: &V) -> Result<i64> {
        Ok(self(value))
    }
}

// == Max Age ==
/// Values exposing a `maxAge` expiration timestamp.
pub trait MaxAge {
    /// Expiration timestamp in Unix milliseconds.
    fn max_age(&self) -> i64;
}

/// Reads expirations through [`MaxAge`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxAgeExpiry;

impl<V: MaxAge> Expiry<V> for MaxAgeExpiry {
    fn expires_at(&self, value: &V) -> Result<i64> {
        Ok(value.max_age())
    }
}

// == Field Expiry ==
/// Reads expirations from a named numeric field of a JSON object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExpiry {
    field: String,
}

impl FieldExpiry {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Uses the field named in the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.expiry_field.clone())
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for FieldExpiry {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_FIELD)
    }
}

impl Expiry<Value> for FieldExpiry {
    fn expires_at(&self, value: &Value) -> Result<i64> {
        let object = value
            .as_object()
            .ok_or_else(|| CleanerError::invalid_expiry(&self.field, "value is not an object"))?;
        let raw = object
            .get(&self.field)
            .ok_or_else(|| CleanerError::invalid_expiry(&self.field, "field is missing"))?;

        if let Some(ms) = raw.as_i64() {
            return Ok(ms);
        }
        match raw.as_f64() {
            // Round up so an entry never expires before its timestamp;
            // u64 values past i64::MAX saturate.
            Some(ms) if ms.is_finite() => Ok(ms.ceil() as i64),
            _ => Err(CleanerError::invalid_expiry(
                &self.field,
                format!("expected a numeric timestamp, found {raw}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Session {
        expires: i64,
    }

    impl MaxAge for Session {
        fn max_age(&self) -> i64 {
            self.expires
        }
    }

    #[test]
    fn test_closure_expiry() {
        let expiry = |session: &Session| session.expires;
        assert_eq!(expiry.expires_at(&Session { expires: 7 }), Ok(7));
    }

    #[test]
    fn test_max_age_expiry() {
        assert_eq!(MaxAgeExpiry.expires_at(&Session { expires: 99 }), Ok(99));
    }

    #[test]
    fn test_field_expiry_default_field() {
        let expiry = FieldExpiry::default();
        assert_eq!(expiry.field(), "maxAge");
        assert_eq!(expiry.expires_at(&json!({"maxAge": 1000, "data": "🦄"})), Ok(1000));
    }

    #[test]
    fn test_field_expiry_other_field() {
        let expiry = FieldExpiry::from_config(&Config::with_field("timestamp"));
        assert_eq!(expiry.expires_at(&json!({"timestamp": 1500})), Ok(1500));
    }

    #[test]
    fn test_field_expiry_fraction_rounds_up() {
        let expiry = FieldExpiry::default();
        assert_eq!(expiry.expires_at(&json!({"maxAge": 1500.9})), Ok(1501));
        assert_eq!(expiry.expires_at(&json!({"maxAge": 1500.1})), Ok(1501));
        assert_eq!(expiry.expires_at(&json!({"maxAge": 1500.0})), Ok(1500));
        assert_eq!(expiry.expires_at(&json!({"maxAge": -0.5})), Ok(0));
    }

    #[test]
    fn test_field_expiry_missing_field() {
        let err = FieldExpiry::default()
            .expires_at(&json!({"timestamp": 1}))
            .unwrap_err();
        assert_eq!(err, CleanerError::invalid_expiry("maxAge", "field is missing"));
    }

    #[test]
    fn test_field_expiry_not_numeric() {
        let expiry = FieldExpiry::default();
        assert!(expiry.expires_at(&json!({"maxAge": "soon"})).is_err());
        assert!(expiry.expires_at(&json!({"maxAge": null})).is_err());
        assert!(expiry.expires_at(&json!("maxAge")).is_err());
    }
}
