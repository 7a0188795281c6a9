pub mod builder;
pub mod catalog;
pub mod pricing;

pub use builder::QuotationBuilder;
pub use catalog::{Catalog, CatalogError, CatalogKind, CatalogSchema, CategoryTable, ResolvedLine};
pub use pricing::{format_money, round_money, TotalRounding};
