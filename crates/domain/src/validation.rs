//! Boundary validation for free-text inputs.

use thiserror::Error;

/// Longest accepted shipping text, in characters.
pub const MAX_SHIPPING_INFO_CHARS: usize = 1000;

/// Longest accepted review text, in characters.
pub const MAX_REVIEW_CHARS: usize = 500;

/// Malformed input, rejected before any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Shipping info is required")]
    MissingShippingInfo,

    #[error("Shipping info is too long: {chars} characters (max {max})")]
    ShippingInfoTooLong { chars: usize, max: usize },

    #[error("Review is too long: {chars} characters (max {max})")]
    ReviewTooLong { chars: usize, max: usize },
}

/// Validated shipping text.
///
/// The text is opaque to the order, but it is formatted as `Key: value`
/// lines; an `Address:` line, when present, is the address to remember for
/// the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingInfo(String);

impl ShippingInfo {
    /// Validates raw shipping text.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(ValidationError::MissingShippingInfo);
        }
        let chars = text.chars().count();
        if chars > MAX_SHIPPING_INFO_CHARS {
            return Err(ValidationError::ShippingInfoTooLong {
                chars,
                max: MAX_SHIPPING_INFO_CHARS,
            });
        }
        Ok(Self(text.to_string()))
    }

    /// Returns the value of the first non-empty `Address:` line.
    pub fn address(&self) -> Option<&str> {
        self.0.lines().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            let value = value.trim();
            (key.trim().eq_ignore_ascii_case("address") && !value.is_empty()).then_some(value)
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Trims a review, maps blank text to `None` and enforces the length limit.
pub fn normalize_review(review: Option<String>) -> Result<Option<String>, ValidationError> {
    let Some(review) = review else {
        return Ok(None);
    };
    let review = review.trim();
    if review.is_empty() {
        return Ok(None);
    }
    let chars = review.chars().count();
    if chars > MAX_REVIEW_CHARS {
        return Err(ValidationError::ReviewTooLong {
            chars,
            max: MAX_REVIEW_CHARS,
        });
    }
    Ok(Some(review.to_string()))
}
