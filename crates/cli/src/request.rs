//! Quotation request files: the form contents as TOML.
//!
//! ```toml
//! customer_name = "Jane Doe"
//! customer_email = "jane@x.com"
//! notes = "Install before March"
//!
//! [[lines]]
//! category = "electrical"
//! product = "product_electric_b"
//! quantity = 2
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use quoteform_core::cpq::QuotationBuilder;
use quoteform_core::domain::quote::LineRequest;
use quoteform_core::errors::{QuotationError, SessionError};
use quoteform_core::flows::QuoteSession;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct QuotationRequest {
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub lines: Vec<LineRequest>,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("could not read request file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse request file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
}

impl QuotationRequest {
    pub fn from_file(path: &Path) -> Result<Self, RequestError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| RequestError::ReadFile { path: path.to_path_buf(), source })?;
        toml::from_str(&raw)
            .map_err(|source| RequestError::ParseFile { path: path.to_path_buf(), source })
    }

    /// Replays the request through a fresh session and generates the
    /// quotation. Rows are validated as written first, so a zero quantity in
    /// the file is reported rather than clamped.
    pub fn into_session(
        self,
        builder: QuotationBuilder,
        currency_symbol: &str,
    ) -> Result<QuoteSession, SessionError> {
        builder
            .validate(&self.customer_name, &self.customer_email, &self.lines)
            .map_err(QuotationError::from)?;

        let mut session = QuoteSession::new(builder, currency_symbol);
        session.set_customer_name(self.customer_name)?;
        session.set_customer_email(self.customer_email)?;
        session.set_notes(self.notes)?;

        for (index, line) in self.lines.into_iter().enumerate() {
            if index > 0 {
                session.add_row()?;
            }
            session.select_category(index, line.category)?;
            session.select_product(index, line.product_id)?;
            session.select_variation(index, line.variation)?;
            session.set_quantity(index, line.quantity)?;
        }

        session.generate()?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use quoteform_core::cpq::{Catalog, CatalogKind, QuotationBuilder};
    use quoteform_core::errors::{QuotationError, SessionError, ValidationError};
    use quoteform_core::flows::SessionState;

    use super::QuotationRequest;

    fn parse(raw: &str) -> QuotationRequest {
        toml::from_str(raw).expect("request parses")
    }

    fn builder() -> QuotationBuilder {
        QuotationBuilder::new(Catalog::builtin(CatalogKind::Categorized))
    }

    #[test]
    fn replays_rows_into_a_generated_session() {
        let request = parse(
            r#"
customer_name = "Jane Doe"
customer_email = "jane@x.com"

[[lines]]
category = "electrical"
product = "product_electric_a"

[[lines]]
category = "fire"
product = "product_fire_b"
quantity = 3
"#,
        );

        let session = request.into_session(builder(), "£").expect("session");
        assert_eq!(session.state(), SessionState::Generated);
        assert_eq!(session.form().rows.len(), 2);
        let quotation = session.quotation().expect("quotation");
        assert_eq!(quotation.formatted_total(), "850.00");
    }

    #[test]
    fn zero_quantity_in_file_is_rejected() {
        let request = parse(
            r#"
customer_name = "Jane Doe"
customer_email = "jane@x.com"

[[lines]]
category = "cctv"
product = "product_cctv_a"
quantity = 0
"#,
        );

        let error = request.into_session(builder(), "£").err().expect("invalid quantity");
        assert_eq!(
            error,
            SessionError::Quotation(QuotationError::Validation(
                ValidationError::NonPositiveQuantity { row: 0, quantity: 0 }
            ))
        );
    }

    #[test]
    fn request_without_lines_is_rejected() {
        let request = parse("customer_name = \"A\"\ncustomer_email = \"a@b.c\"\n");
        let error = request.into_session(builder(), "£").err().expect("no lines");
        assert!(matches!(
            error,
            SessionError::Quotation(QuotationError::Validation(ValidationError::NoLines))
        ));
    }
}
