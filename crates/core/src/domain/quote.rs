use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cpq::pricing::format_money;
use crate::domain::product::{CategoryId, ProductId};

pub const DEFAULT_NOTES: &str = "No additional notes.";

/// One user-entered row before it is resolved against the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRequest {
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default, alias = "product")]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub variation: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

impl Default for LineRequest {
    fn default() -> Self {
        Self { category: None, product_id: None, variation: None, quantity: default_quantity() }
    }
}

impl LineRequest {
    pub fn categorized(category: &str, product_id: &str, quantity: i64) -> Self {
        Self {
            category: Some(CategoryId::from(category)),
            product_id: Some(ProductId::from(product_id)),
            variation: None,
            quantity,
        }
    }

    pub fn with_variation(product_id: &str, variation: &str, quantity: i64) -> Self {
        Self {
            category: None,
            product_id: Some(ProductId::from(product_id)),
            variation: Some(variation.to_string()),
            quantity,
        }
    }

    /// Selected category, treating an empty selection as none.
    pub fn selected_category(&self) -> Option<&CategoryId> {
        self.category.as_ref().filter(|category| !category.0.trim().is_empty())
    }

    pub fn selected_product(&self) -> Option<&ProductId> {
        self.product_id.as_ref().filter(|product| !product.0.trim().is_empty())
    }

    pub fn selected_variation(&self) -> Option<&str> {
        self.variation.as_deref().filter(|variation| !variation.trim().is_empty())
    }
}

/// A resolved, priced row of a generated quotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variation: Option<String>,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quotation {
    pub customer_name: String,
    pub customer_email: String,
    pub lines: Vec<LineItem>,
    pub total_price: Decimal,
    pub notes: String,
    pub generated_at: DateTime<Utc>,
}

impl Quotation {
    /// Total with exactly two fraction digits, e.g. `850.00`.
    pub fn formatted_total(&self) -> String {
        format_money(self.total_price)
    }
}
