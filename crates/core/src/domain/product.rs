use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// A priced product as it appears in a catalog table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ProductId,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(alias = "price")]
    pub unit_price: Decimal,
    /// Ordered variation names; empty when the product has none.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variations: Vec<String>,
}

impl CatalogEntry {
    pub fn new(id: &str, display_name: &str, unit_price: Decimal) -> Self {
        Self {
            id: ProductId::from(id),
            display_name: display_name.to_string(),
            unit_price,
            variations: Vec::new(),
        }
    }

    pub fn with_variations(mut self, variations: &[&str]) -> Self {
        self.variations = variations.iter().map(|name| (*name).to_string()).collect();
        self
    }

    pub fn offers_variation(&self, name: &str) -> bool {
        self.variations.iter().any(|variation| variation == name)
    }
}
