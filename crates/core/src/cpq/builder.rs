use chrono::Utc;

use crate::cpq::catalog::{Catalog, CatalogKind};
use crate::cpq::pricing::{line_total, quotation_total, TotalRounding};
use crate::domain::quote::{LineItem, LineRequest, Quotation, DEFAULT_NOTES};
use crate::errors::{QuotationError, ValidationError};

/// Validates form input and turns it into an immutable [`Quotation`].
#[derive(Clone, Debug)]
pub struct QuotationBuilder {
    catalog: Catalog,
    rounding: TotalRounding,
}

impl QuotationBuilder {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog, rounding: TotalRounding::default() }
    }

    pub fn with_rounding(mut self, rounding: TotalRounding) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rounding(&self) -> TotalRounding {
        self.rounding
    }

    /// Reports the first violation found, checking customer fields before rows
    /// and rows in order.
    pub fn validate(
        &self,
        customer_name: &str,
        customer_email: &str,
        lines: &[LineRequest],
    ) -> Result<(), ValidationError> {
        if customer_name.trim().is_empty() {
            return Err(ValidationError::MissingCustomerName);
        }
        if customer_email.trim().is_empty() {
            return Err(ValidationError::MissingCustomerEmail);
        }
        if lines.is_empty() {
            return Err(ValidationError::NoLines);
        }

        for (row, line) in lines.iter().enumerate() {
            self.validate_row(row, line)?;
        }
        Ok(())
    }

    fn validate_row(&self, row: usize, line: &LineRequest) -> Result<(), ValidationError> {
        let kind = self.catalog.kind();
        if kind == CatalogKind::Categorized && line.selected_category().is_none() {
            return Err(ValidationError::MissingCategory { row });
        }

        let Some(product_id) = line.selected_product() else {
            return Err(ValidationError::MissingProduct { row });
        };

        if kind == CatalogKind::Variations && line.selected_variation().is_none() {
            let offers_variations = self
                .catalog
                .variations(product_id)
                .is_some_and(|variations| !variations.is_empty());
            if offers_variations {
                return Err(ValidationError::MissingVariation {
                    row,
                    product_id: product_id.clone(),
                });
            }
        }

        if line.quantity <= 0 {
            return Err(ValidationError::NonPositiveQuantity { row, quantity: line.quantity });
        }
        if u32::try_from(line.quantity).is_err() {
            return Err(ValidationError::QuantityTooLarge { row, quantity: line.quantity });
        }

        Ok(())
    }

    /// Either every line resolves and a complete quotation is returned, or
    /// nothing is produced.
    pub fn build_quotation(
        &self,
        customer_name: &str,
        customer_email: &str,
        lines: &[LineRequest],
        notes: &str,
    ) -> Result<Quotation, QuotationError> {
        self.validate(customer_name, customer_email, lines)?;

        let items = lines
            .iter()
            .enumerate()
            .map(|(row, request)| self.price_line(row, request))
            .collect::<Result<Vec<_>, _>>()?;
        let total_price =
            quotation_total(&items, self.rounding).ok_or(QuotationError::TotalOverflow)?;

        let notes = if notes.trim().is_empty() { DEFAULT_NOTES } else { notes };

        Ok(Quotation {
            customer_name: customer_name.trim().to_string(),
            customer_email: customer_email.trim().to_string(),
            lines: items,
            total_price,
            notes: notes.to_string(),
            generated_at: Utc::now(),
        })
    }

    fn price_line(&self, row: usize, request: &LineRequest) -> Result<LineItem, QuotationError> {
        let resolved = self
            .catalog
            .resolve(request)
            .map_err(|source| QuotationError::Resolution { row, source })?;
        let quantity = u32::try_from(request.quantity).map_err(|_| {
            ValidationError::QuantityTooLarge { row, quantity: request.quantity }
        })?;
        let total = line_total(resolved.entry.unit_price, quantity)
            .ok_or(QuotationError::LineOverflow { row })?;

        Ok(LineItem {
            name: resolved.entry.display_name.clone(),
            category: resolved.category,
            variation: resolved.variation,
            quantity,
            unit_price: resolved.entry.unit_price,
            line_total: total,
        })
    }
}
