use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::BookgrabError;

/// Opaque site-assigned identifier for one catalog entry.
///
/// Guaranteed non-empty: listings whose title link does not yield an id are
/// dropped during extraction instead of being surfaced with a blank id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogId(String);

impl CatalogId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CatalogId {
    type Err = BookgrabError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return Err(BookgrabError::InvalidInput(format!(
                "catalog id must be a non-empty alphanumeric token, got {value:?}"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// One search-result row. Created per search, discarded on the next one.
#[derive(Debug, Clone)]
pub struct Listing {
    pub author: String,
    pub title: String,
    /// Human-readable size, e.g. "3.2 MB". Empty when the page omitted it.
    pub size_label: String,
    pub catalog_id: CatalogId,
    pub isbn_url: Option<Url>,
}

/// Search language filter. The catalog query always carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "English",
        }
    }
}

/// Book file format, used both as a search filter and a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookFormat {
    Epub,
}

impl BookFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            BookFormat::Epub => "epub",
        }
    }

    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for BookFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_catalog_id_valid() {
        let id: CatalogId = " 5A2F91 ".parse().unwrap();
        assert_eq!(id.as_str(), "5A2F91");
    }

    #[test]
    fn parse_catalog_id_empty() {
        let err = "   ".parse::<CatalogId>().unwrap_err();
        assert_matches!(err, BookgrabError::InvalidInput(_));
    }

    #[test]
    fn parse_catalog_id_rejects_path_fragments() {
        let err = "/fiction/5A2F91".parse::<CatalogId>().unwrap_err();
        assert_matches!(err, BookgrabError::InvalidInput(_));
    }

    #[test]
    fn format_strings() {
        assert_eq!(BookFormat::Epub.as_str(), "epub");
        assert_eq!(BookFormat::Epub.extension(), "epub");
        assert_eq!(Language::English.as_str(), "English");
    }
}
