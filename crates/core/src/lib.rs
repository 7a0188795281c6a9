pub mod config;
pub mod cpq;
pub mod dispatch;
pub mod domain;
pub mod errors;
pub mod flows;

pub use cpq::{Catalog, CatalogKind, QuotationBuilder, TotalRounding};
pub use dispatch::{EmailDispatcher, TemplateParams};
pub use domain::product::{CatalogEntry, CategoryId, ProductId};
pub use domain::quote::{LineItem, LineRequest, Quotation};
pub use errors::{
    DispatchError, Notice, NoticeKind, QuotationError, ResolutionError, SessionError,
    ValidationError,
};
pub use flows::{FormState, QuoteSession, SessionEvent, SessionState};
