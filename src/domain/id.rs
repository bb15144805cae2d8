use {
    derive_more::Display,
    serde::{Deserialize, Serialize},
    uuid::Uuid,
};

use super::error::BookingError;

pub const REFERENCE_LEN: usize = 10;

/// Gateway transaction identifier (`pi_xxx` for Stripe).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Result<Self, BookingError> {
        let id = id.into();
        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(BookingError::Validation(format!(
                "TransactionId must be non-empty without whitespace, got: {id:?}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Stripe event identifier (`evt_xxx`).
#[derive(Debug, Clone, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Result<Self, BookingError> {
        let id = id.into();
        if !id.starts_with("evt_") {
            return Err(BookingError::Validation(format!(
                "EventId must start with evt_, got: {id}"
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Human-readable booking reference: uppercase hex, fixed length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingReference(String);

impl BookingReference {
    /// Derived from a random 128-bit id, truncated.
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string().to_uppercase();
        Self(raw[..REFERENCE_LEN].to_string())
    }

    pub fn parse(raw: impl Into<String>) -> Result<Self, BookingError> {
        let raw = raw.into();
        let well_formed = raw.len() == REFERENCE_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase());
        if !well_formed {
            return Err(BookingError::Validation(format!(
                "malformed booking reference: {raw}"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Discount codes compare case-insensitively; stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountCode(String);

impl DiscountCode {
    pub fn new(raw: &str) -> Result<Self, BookingError> {
        let normalized = raw.trim().to_uppercase();
        if normalized.is_empty() {
            return Err(BookingError::Validation("discount code is empty".into()));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_reference_is_upper_fixed_length() {
        let r = BookingReference::generate();
        assert_eq!(r.as_str().len(), REFERENCE_LEN);
        assert!(BookingReference::parse(r.as_str()).is_ok());
    }

    #[test]
    fn discount_code_is_normalized() {
        assert_eq!(DiscountCode::new("  save10 ").unwrap().as_str(), "SAVE10");
        assert!(DiscountCode::new("   ").is_err());
    }

    #[test]
    fn transaction_id_rejects_blank() {
        assert!(TransactionId::new("").is_err());
        assert!(TransactionId::new("pi 1").is_err());
        assert!(TransactionId::new("pi_123").is_ok());
    }
}
