//! Tenant and file identifiers.
//!
//! Both identifiers are caller-supplied strings that end up as path
//! segments in the artifact key `{tenant}/{file}`, so parsing enforces
//! that they can never traverse outside the bundle root.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum identifier length in characters
pub const MAX_ID_LEN: usize = 128;

/// Identifier parse error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// Identifier is empty
    Empty,
    /// Identifier exceeds [`MAX_ID_LEN`]
    TooLong {
        /// Actual length
        len: usize,
    },
    /// Identifier contains a disallowed character
    InvalidChar {
        /// The offending character
        ch: char,
    },
    /// Identifier starts with a dot
    LeadingDot,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Identifier is empty"),
            Self::TooLong { len } => {
                write!(f, "Identifier too long: {} chars (limit: {})", len, MAX_ID_LEN)
            }
            Self::InvalidChar { ch } => write!(f, "Invalid character in identifier: {:?}", ch),
            Self::LeadingDot => write!(f, "Identifier must not start with a dot"),
        }
    }
}

impl std::error::Error for IdError {}

fn validate_segment(s: &str) -> Result<(), IdError> {
    if s.is_empty() {
        return Err(IdError::Empty);
    }
    if s.len() > MAX_ID_LEN {
        return Err(IdError::TooLong { len: s.len() });
    }
    if s.starts_with('.') {
        return Err(IdError::LeadingDot);
    }
    for ch in s.chars() {
        if !(ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || ch == '-') {
            return Err(IdError::InvalidChar { ch });
        }
    }
    Ok(())
}

/// Tenant identifier - names the tenant that registered a bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parse a tenant identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] if the string is not a safe path segment.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        validate_segment(s)?;
        Ok(Self(s.to_string()))
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// File identifier - names one bundle artifact within a tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FileId(String);

impl FileId {
    /// Parse a file identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdError`] if the string is not a safe path segment.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        validate_segment(s)?;
        Ok(Self(s.to_string()))
    }

    /// Get as string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FileId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FileId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FileId> for String {
    fn from(id: FileId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_id_parse() {
        let id = TenantId::parse("acme-shop_01").unwrap();
        assert_eq!(id.as_str(), "acme-shop_01");
    }

    #[test]
    fn test_tenant_id_rejects_empty() {
        assert_eq!(TenantId::parse(""), Err(IdError::Empty));
    }

    #[test]
    fn test_tenant_id_rejects_traversal() {
        assert!(TenantId::parse("../etc").is_err());
        assert!(TenantId::parse("a/b").is_err());
        assert!(TenantId::parse("a\\b").is_err());
    }

    #[test]
    fn test_tenant_id_rejects_leading_dot() {
        assert_eq!(TenantId::parse(".."), Err(IdError::LeadingDot));
        assert_eq!(TenantId::parse(".hidden"), Err(IdError::LeadingDot));
    }

    #[test]
    fn test_file_id_allows_interior_dot() {
        let id = FileId::parse("checkout.v2").unwrap();
        assert_eq!(id.as_str(), "checkout.v2");
    }

    #[test]
    fn test_id_too_long() {
        let long = "a".repeat(MAX_ID_LEN + 1);
        assert!(matches!(FileId::parse(&long), Err(IdError::TooLong { .. })));
    }

    #[test]
    fn test_id_serde_round_trip() {
        let id = TenantId::parse("acme").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"acme\"");
        let back: TenantId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_id_serde_rejects_invalid() {
        let res: Result<FileId, _> = serde_json::from_str("\"../x\"");
        assert!(res.is_err());
    }

    proptest::proptest! {
        #[test]
        fn prop_allowed_charset_parses(s in "[A-Za-z0-9_-][A-Za-z0-9._-]{0,127}") {
            prop_parse_ok(&s);
        }

        #[test]
        fn prop_parsed_id_is_a_single_path_segment(s in "\\PC{1,64}") {
            if let Ok(id) = TenantId::parse(&s) {
                proptest::prop_assert!(!id.as_str().contains('/'));
                proptest::prop_assert!(!id.as_str().contains('\\'));
                proptest::prop_assert!(!id.as_str().starts_with('.'));
            }
        }
    }

    fn prop_parse_ok(s: &str) {
        assert!(TenantId::parse(s).is_ok());
        assert!(FileId::parse(s).is_ok());
    }
}
