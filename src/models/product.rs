use serde::{Deserialize, Serialize};

/// Placeholder written for a field that could not be extracted.
pub const NOT_AVAILABLE: &str = "N/A";

/// One product listing scraped from the storefront.
///
/// Fields stay `None` until the CSV boundary, where they become [`NOT_AVAILABLE`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductRecord {
    pub name: Option<String>,
    pub price: Option<String>,
    pub link: Option<String>,
}

/// Borrowed view of a [`ProductRecord`] with the sentinel applied.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProductRow<'a> {
    pub name: &'a str,
    pub price: &'a str,
    pub link: &'a str,
}

impl ProductRecord {
    pub fn new(name: Option<String>, price: Option<String>, link: Option<String>) -> Self {
        Self { name, price, link }
    }

    /// Record produced by the page-wide fallback scan: a name and nothing else.
    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn as_row(&self) -> ProductRow<'_> {
        ProductRow {
            name: self.name.as_deref().unwrap_or(NOT_AVAILABLE),
            price: self.price.as_deref().unwrap_or(NOT_AVAILABLE),
            link: self.link.as_deref().unwrap_or(NOT_AVAILABLE),
        }
    }
}
