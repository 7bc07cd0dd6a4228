//! Garment sizes offered by the catalog.

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown size label.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid size: {0}")]
pub struct SizeError(String);

/// Garment size selected for a cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.size", rename_all = "UPPERCASE")
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Size {
    XS,
    S,
    M,
    L,
    XL,
    XXL,
    XXXL,
}

impl Size {
    /// Every size, smallest first.
    pub const ALL: [Self; 7] = [
        Self::XS,
        Self::S,
        Self::M,
        Self::L,
        Self::XL,
        Self::XXL,
        Self::XXXL,
    ];

    /// Label as stored and displayed.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::XS => "XS",
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
            Self::XL => "XL",
            Self::XXL => "XXL",
            Self::XXXL => "XXXL",
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Size {
    type Err = SizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SizeError(s.to_owned()))
    }
}
