use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

use crate::cpq::catalog::CatalogKind;
use crate::cpq::pricing::format_money;
use crate::domain::quote::{LineItem, Quotation};
use crate::errors::DispatchError;

pub const DEFAULT_CURRENCY_SYMBOL: &str = "£";

/// Flat, fully stringified parameter set handed to an email template.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TemplateParams(BTreeMap<String, String>);

impl TemplateParams {
    pub fn from_quotation(quotation: &Quotation, kind: CatalogKind, currency_symbol: &str) -> Self {
        let products = quotation
            .lines
            .iter()
            .map(|line| describe_line(line, kind, currency_symbol))
            .collect::<Vec<_>>()
            .join("\n");

        let mut params = Self::default();
        params.insert("customer_name", &quotation.customer_name);
        params.insert("customer_email", &quotation.customer_email);
        params.insert("products", &products);
        params.insert("total_price", &format!("{currency_symbol}{}", quotation.formatted_total()));
        params.insert("notes", &quotation.notes);
        params
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

fn describe_line(line: &LineItem, kind: CatalogKind, currency_symbol: &str) -> String {
    let qualifier = match (kind, &line.variation) {
        (CatalogKind::Categorized, _) => format!("Category: {}", line.category),
        (CatalogKind::Variations, Some(variation)) => format!("Variation: {variation}"),
        (CatalogKind::Variations, None) => "Variation: n/a".to_string(),
    };
    format!(
        "Product: {} ({qualifier}), Quantity: {}, Unit Price: {currency_symbol}{}, Total Price: {currency_symbol}{}",
        line.name,
        line.quantity,
        format_money(line.unit_price),
        format_money(line.line_total),
    )
}

/// Hands a rendered quotation to an external email provider. One call is one
/// delivery attempt.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, params: &TemplateParams) -> Result<(), DispatchError>;
}
