use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::{CategoryId, ProductId};
use crate::flows::states::{SessionEvent, SessionState};

pub const GENERIC_DISPATCH_FAILURE: &str = "An unknown error occurred.";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("customer name is required")]
    MissingCustomerName,
    #[error("customer email is required")]
    MissingCustomerEmail,
    #[error("at least one product row is required")]
    NoLines,
    #[error("row {row}: no category selected")]
    MissingCategory { row: usize },
    #[error("row {row}: no product selected")]
    MissingProduct { row: usize },
    #[error("row {row}: no variation selected for product `{product_id}`")]
    MissingVariation { row: usize, product_id: ProductId },
    #[error("row {row}: quantity must be positive, got {quantity}")]
    NonPositiveQuantity { row: usize, quantity: i64 },
    #[error("row {row}: quantity {quantity} is too large")]
    QuantityTooLarge { row: usize, quantity: i64 },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("category `{0}` does not exist")]
    UnknownCategory(CategoryId),
    #[error("product `{product_id}` not found{}", in_category(.category))]
    UnknownProduct { category: Option<CategoryId>, product_id: ProductId },
    #[error("variation `{variation}` is not offered for product `{product_id}`")]
    UnknownVariation { product_id: ProductId, variation: String },
}

fn in_category(category: &Option<CategoryId>) -> String {
    category.as_ref().map(|category| format!(" in category `{category}`")).unwrap_or_default()
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QuotationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("row {row}: {source}")]
    Resolution {
        row: usize,
        #[source]
        source: ResolutionError,
    },
    #[error("row {row}: line total is too large to represent")]
    LineOverflow { row: usize },
    #[error("quotation total is too large to represent")]
    TotalOverflow,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("email provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("email transport failed: {0}")]
    Transport(String),
    #[error("email dispatch is not configured: {0}")]
    NotConfigured(String),
}

impl DispatchError {
    /// Provider text when available, otherwise a generic message.
    pub fn user_text(&self) -> &str {
        let text = match self {
            Self::Rejected { message, .. } => message.as_str(),
            Self::Transport(message) | Self::NotConfigured(message) => message.as_str(),
        };
        if text.trim().is_empty() {
            GENERIC_DISPATCH_FAILURE
        } else {
            text
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Quotation(#[from] QuotationError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("no quotation has been generated")]
    NoQuotation,
    #[error("a send is already in progress")]
    SendInProgress,
    #[error("row {index} does not exist (form has {len} rows)")]
    RowOutOfRange { index: usize, len: usize },
    #[error("invalid session transition from {from:?} using event {event:?}")]
    InvalidTransition { from: SessionState, event: SessionEvent },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// A blocking, user-facing status message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { kind: NoticeKind::Error, message: message.into() }
    }
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCustomerName | Self::MissingCustomerEmail => {
                "Please fill in all required fields (Customer Name, Customer Email)."
            }
            Self::NoLines => "Please add at least one product row.",
            Self::MissingVariation { .. } => {
                "Please ensure all product rows have a valid product, variation, and positive quantity."
            }
            Self::MissingCategory { .. }
            | Self::MissingProduct { .. }
            | Self::NonPositiveQuantity { .. }
            | Self::QuantityTooLarge { .. } => {
                "Please ensure all product rows have a valid category, product, and positive quantity."
            }
        }
    }
}

impl QuotationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(error) => error.user_message(),
            Self::Resolution { .. } => {
                "An error occurred while processing the products. Please check your selections."
            }
            Self::LineOverflow { .. } | Self::TotalOverflow => {
                "The quotation total is too large. Please check the quantities and prices."
            }
        }
    }
}

impl SessionError {
    pub fn notice(&self) -> Notice {
        match self {
            Self::Quotation(error) => Notice::error(error.user_message()),
            Self::Dispatch(error) => {
                Notice::error(format!("Failed to send email: {}", error.user_text()))
            }
            Self::NoQuotation => Notice::error("Please generate a quotation first."),
            Self::SendInProgress => Notice::info("The quotation email is already being sent."),
            Self::RowOutOfRange { .. } | Self::InvalidTransition { .. } => {
                Notice::error(self.to_string())
            }
        }
    }
}
