//! Content hashes.
//!
//! A [`ContentHash`] is the lowercase hex SHA-256 of a file's bytes. It is
//! both the integrity checksum and the file's primary identity, so it is
//! validated once at the boundary and carried as a typed value afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Length of a hex-encoded 256-bit digest.
pub const HASH_HEX_LEN: usize = 64;

/// Hex-encoded SHA-256 digest identifying stored content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Parse a hex digest, accepting either case and normalizing to lowercase.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.len() != HASH_HEX_LEN || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(AppError::validation(
                "Expected a 64-character hex SHA-256 digest",
            ));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Wrap a digest already known to be lowercase hex.
    ///
    /// Used by the checksum routine, which produces canonical output.
    pub fn from_canonical(hex: String) -> Self {
        debug_assert_eq!(hex.len(), HASH_HEX_LEN);
        Self(hex)
    }

    /// Borrow the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ContentHash {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> String {
        hash.0
    }
}

impl AsRef<str> for ContentHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Postgres> for ContentHash {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::Postgres> for ContentHash {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ContentHash {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let raw = <String as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn test_parse_normalizes_case() {
        let upper = EMPTY_SHA256.to_ascii_uppercase();
        let hash = ContentHash::parse(&upper).expect("valid digest");
        assert_eq!(hash.as_str(), EMPTY_SHA256);
    }

    #[test]
    fn test_parse_rejects_wrong_length_and_alphabet() {
        assert!(ContentHash::parse("abc").is_err());
        assert!(ContentHash::parse(&"g".repeat(64)).is_err());
        assert!(ContentHash::parse("").is_err());
    }

    #[test]
    fn test_serde_rejects_malformed() {
        let result: Result<ContentHash, _> = serde_json::from_str("\"not-a-hash\"");
        assert!(result.is_err());
        let ok: ContentHash =
            serde_json::from_str(&format!("\"{EMPTY_SHA256}\"")).expect("deserialize");
        assert_eq!(ok.as_str(), EMPTY_SHA256);
    }
}
