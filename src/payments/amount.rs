//! Cart amount validation and normalization.
//!
//! Amounts arrive from the storefront as JSON numbers or strings and leave
//! here as exact two-decimal strings, the only form the provider accepts.
//! All arithmetic is decimal; floats never touch the money path.

use bigdecimal::{BigDecimal, RoundingMode};
use serde_json::Value as JsonValue;
use std::str::FromStr;

use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::types::Money;

/// Validates the raw amount field of an order request and pairs it with a
/// validated currency code.
pub fn validate_order_amount(raw: &JsonValue, currency: &str) -> PaymentResult<Money> {
    let value = match raw {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.clone(),
        _ => {
            return Err(PaymentError::InvalidAmount {
                message: "amount must be a number or a numeric string".to_string(),
            })
        }
    };
    let currency = validate_currency(currency)?;
    let value = normalize_amount(&value)?;
    Ok(Money { currency, value })
}

/// Normalizes a decimal string to exactly two fraction digits, rounding
/// half-up: `19.999` becomes `20.00`, `12` becomes `12.00`.
pub fn normalize_amount(raw: &str) -> PaymentResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PaymentError::InvalidAmount {
            message: "amount is required".to_string(),
        });
    }

    let parsed = BigDecimal::from_str(trimmed).map_err(|_| PaymentError::InvalidAmount {
        message: format!("'{trimmed}' is not a valid amount"),
    })?;

    if parsed <= BigDecimal::from(0) {
        return Err(PaymentError::InvalidAmount {
            message: "amount must be greater than zero".to_string(),
        });
    }

    let rounded = parsed.with_scale_round(2, RoundingMode::HalfUp);
    // Sub-cent inputs round down to 0.00, which the provider would reject.
    if rounded == BigDecimal::from(0) {
        return Err(PaymentError::InvalidAmount {
            message: "amount rounds to zero".to_string(),
        });
    }

    Ok(rounded.to_string())
}

/// Validates a currency code: exactly three ASCII letters, upper-cased.
/// Whether the code names a real currency is left to the provider.
pub fn validate_currency(code: &str) -> PaymentResult<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(PaymentError::InvalidAmount {
            message: "currency is required".to_string(),
        });
    }
    if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(PaymentError::InvalidAmount {
            message: format!("'{trimmed}' is not a valid currency code"),
        });
    }
    Ok(trimmed.to_ascii_uppercase())
}
