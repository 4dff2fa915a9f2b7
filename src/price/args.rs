//! Typed arguments for a price lookup.

use serde::Serialize;
use serde_json::Value;

use crate::error::TaskError;

/// Currency used when the request does not name one.
pub const DEFAULT_CURRENCY: &str = "BTC";

/// Validated price lookup arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceArgs {
    /// Upper-cased currency code.
    pub currency: String,
}

impl PriceArgs {
    pub fn new(currency: impl AsRef<str>) -> Self {
        Self {
            currency: currency.as_ref().to_uppercase(),
        }
    }

    /// Coerce loosely-typed request arguments.
    ///
    /// Anything other than a JSON object counts as "no arguments". Only an
    /// absent `currency` falls back to [`DEFAULT_CURRENCY`]. Scalars are
    /// stringified as-is (`null` reads as `"NONE"`), so padded, empty or
    /// unknown codes simply price at zero. Arrays and objects are rejected.
    pub fn from_value(arguments: &Value) -> Result<Self, TaskError> {
        let currency = match arguments.as_object().and_then(|args| args.get("currency")) {
            None => DEFAULT_CURRENCY.to_string(),
            Some(Value::Null) => "none".to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => {
                return Err(TaskError::InvalidArguments {
                    reason: format!("currency must be a string, got {other}"),
                });
            }
        };

        Ok(Self::new(currency))
    }
}
