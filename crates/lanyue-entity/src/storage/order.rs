//! Listing order for mounted directories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use lanyue_core::AppError;

/// Field a mount's directory listings are ordered by.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "order_field", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderField {
    /// Entry name.
    #[default]
    Name,
    /// File size in bytes.
    Size,
    /// Last modification time.
    Modified,
    /// Creation time.
    Created,
    /// Inferred media type.
    FileType,
}

impl OrderField {
    /// Every selectable field, in presentation order.
    pub const ALL: [OrderField; 5] = [
        Self::Name,
        Self::Size,
        Self::Modified,
        Self::Created,
        Self::FileType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Size => "size",
            Self::Modified => "modified",
            Self::Created => "created",
            Self::FileType => "file_type",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Size => "Size",
            Self::Modified => "Modified time",
            Self::Created => "Created time",
            Self::FileType => "File type",
        }
    }
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| AppError::validation(format!("Unknown order field: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_field() {
        for field in OrderField::ALL {
            assert_eq!(field.as_str().parse::<OrderField>().ok(), Some(field));
        }
        assert!("colour".parse::<OrderField>().is_err());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&OrderField::FileType).unwrap();
        assert_eq!(json, "\"file_type\"");
    }
}
