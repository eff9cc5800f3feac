//! Strongly-typed identifiers used across the domain.
//!
//! Catalog identifiers are opaque strings owned by upstream systems, so the
//! newtypes only trim surrounding whitespace and reject empty values.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DomainError;

/// Internal identifier of a product record (used for cache tags).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

/// Merchant-facing stock keeping unit; the key jobs refer to products by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

/// Language code of a localized record (e.g. `en`, `ar`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LangCode(String);

/// Identifier of a promotion.
///
/// Upstream producers enqueue it either as an integer or as a string; both
/// normalise to the same textual form, so `42`, `"42"` and `"042"` compare
/// equal. Non-numeric identifiers are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PromotionId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal, $normalize:path) => {
        impl $t {
            /// Wrap a raw value without validation.
            ///
            /// Prefer `try_new`/`parse` for input that crosses a trust boundary.
            pub fn new(value: impl Into<String>) -> Self {
                Self($normalize(value.into()))
            }

            /// Wrap a raw value, trimming it and rejecting empty input.
            pub fn try_new(value: impl AsRef<str>) -> Result<Self, DomainError> {
                let trimmed = value.as_ref().trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty", $name)));
                }
                Ok(Self($normalize(trimmed.to_string())))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::try_new(s)
            }
        }
    };
}

fn verbatim(value: String) -> String {
    value
}

/// Strip leading zeros from all-digit values (`"042"` -> `"42"`, `"000"` -> `"0"`).
fn canonical_numeric(value: String) -> String {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return value;
    }
    match value.trim_start_matches('0') {
        "" => "0".to_string(),
        stripped => stripped.to_string(),
    }
}

impl_string_newtype!(ProductId, "ProductId", verbatim);
impl_string_newtype!(Sku, "Sku", verbatim);
impl_string_newtype!(LangCode, "LangCode", verbatim);
impl_string_newtype!(PromotionId, "PromotionId", canonical_numeric);

impl From<u64> for PromotionId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for PromotionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Unsigned(u64),
            Signed(i64),
            Str(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Unsigned(n) => Ok(Self::from(n)),
            Raw::Signed(n) => Ok(Self(n.to_string())),
            Raw::Str(s) => Self::try_new(s).map_err(serde::de::Error::custom),
        }
    }
}
