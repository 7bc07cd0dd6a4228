//! Country identifier type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CountryId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CountryIdError {
    /// The input string is empty.
    #[error("country cannot be empty")]
    Empty,
    /// The input is not two ASCII letters.
    #[error("country must be a two-letter ISO 3166-1 code, got {0:?}")]
    InvalidCode(String),
}

/// An ISO 3166-1 alpha-2 country code, stored uppercase.
///
/// Delivery addresses carry their country as a reference into the `country`
/// table rather than as free text.
///
/// ## Examples
///
/// ```
/// use tienda_core::CountryId;
///
/// assert_eq!(CountryId::parse("mx").unwrap().as_str(), "MX");
/// assert!(CountryId::parse("").is_err());
/// assert!(CountryId::parse("Mexico").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CountryId(String);

impl CountryId {
    /// Parse a `CountryId` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or is not two ASCII letters.
    pub fn parse(s: &str) -> Result<Self, CountryIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CountryIdError::Empty);
        }

        if s.len() != 2 || !s.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CountryIdError::InvalidCode(s.to_owned()));
        }

        Ok(Self(s.to_ascii_uppercase()))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CountryId {
    type Err = CountryIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CountryId {
    type Error = CountryIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryId> for String {
    fn from(id: CountryId) -> Self {
        id.0
    }
}

impl AsRef<str> for CountryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// SQLx support (with postgres feature)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CountryId {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CountryId {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CountryId {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uppercases() {
        assert_eq!(CountryId::parse("cr").unwrap().as_str(), "CR");
        assert_eq!(CountryId::parse(" us ").unwrap().as_str(), "US");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert_eq!(CountryId::parse("  "), Err(CountryIdError::Empty));
        assert!(matches!(
            CountryId::parse("USA"),
            Err(CountryIdError::InvalidCode(_))
        ));
        assert!(matches!(
            CountryId::parse("1A"),
            Err(CountryIdError::InvalidCode(_))
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let id: CountryId = serde_json::from_str("\"mx\"").unwrap();
        assert_eq!(id.as_str(), "MX");
        assert!(serde_json::from_str::<CountryId>("\"Mexico\"").is_err());
    }
}
