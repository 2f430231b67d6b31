//! Currency helpers for the Paystack integration.
//!
//! Amounts are always integer minor units (kobo, pesewas, cents); nothing in
//! this crate does decimal arithmetic.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::ValidationError;

/// Currencies Paystack can settle.
pub const SUPPORTED_CURRENCIES: [&str; 6] = ["NGN", "GHS", "ZAR", "USD", "XOF", "KES"];

/// Fallback authorization minimum for currencies missing from the table.
pub const DEFAULT_AUTHORIZATION_MINIMUM: i64 = 100;

/// Gateway-mandated minimum charge per currency, in minor units.
///
/// Used when a subscription's first payment is zero (pure trial): the charge
/// is bumped to this minimum purely to establish a payment method, then
/// refunded after confirmation.
static AUTHORIZATION_MINIMUMS: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    HashMap::from([
        ("NGN", 5_000),
        ("GHS", 10),
        ("ZAR", 100),
        ("KES", 300),
        ("USD", 200),
    ])
});

/// Uppercases and trims a currency code.
pub fn normalize_currency(currency: &str) -> String {
    currency.trim().to_uppercase()
}

/// Checks whether Paystack supports the given currency.
pub fn is_supported_currency(currency: &str) -> bool {
    let normalized = normalize_currency(currency);
    SUPPORTED_CURRENCIES.contains(&normalized.as_str())
}

/// Fails with `UnsupportedCurrency` when the currency is outside Paystack's set.
pub fn ensure_supported_currency(currency: &str) -> Result<(), ValidationError> {
    if is_supported_currency(currency) {
        Ok(())
    } else {
        Err(ValidationError::unsupported_currency(normalize_currency(
            currency,
        )))
    }
}

/// Minimum authorization amount for a currency, in minor units.
///
/// Unknown currencies fall back to [`DEFAULT_AUTHORIZATION_MINIMUM`].
pub fn minimum_authorization_amount(currency: &str) -> i64 {
    let normalized = normalize_currency(currency);
    AUTHORIZATION_MINIMUMS
        .get(normalized.as_str())
        .copied()
        .unwrap_or(DEFAULT_AUTHORIZATION_MINIMUM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_currencies_pass_the_guard() {
        for currency in SUPPORTED_CURRENCIES {
            assert!(ensure_supported_currency(currency).is_ok());
        }
    }

    #[test]
    fn unsupported_currency_is_rejected() {
        let err = ensure_supported_currency("EUR").unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedCurrency { .. }));
    }

    #[test]
    fn currency_check_is_case_insensitive() {
        assert!(is_supported_currency("ngn"));
        assert!(is_supported_currency(" usd "));
    }

    #[test]
    fn known_currencies_use_the_table() {
        assert_eq!(minimum_authorization_amount("NGN"), 5_000);
        assert_eq!(minimum_authorization_amount("GHS"), 10);
        assert_eq!(minimum_authorization_amount("ZAR"), 100);
        assert_eq!(minimum_authorization_amount("KES"), 300);
        assert_eq!(minimum_authorization_amount("USD"), 200);
    }

    #[test]
    fn unknown_currency_falls_back_to_default() {
        assert_eq!(
            minimum_authorization_amount("XOF"),
            DEFAULT_AUTHORIZATION_MINIMUM
        );
        assert_eq!(
            minimum_authorization_amount("JPY"),
            DEFAULT_AUTHORIZATION_MINIMUM
        );
    }

    #[test]
    fn lookup_normalizes_case() {
        assert_eq!(minimum_authorization_amount("usd"), 200);
    }
}
