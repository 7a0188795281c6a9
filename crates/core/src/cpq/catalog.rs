//! Product catalogs a quotation is resolved against.
//!
//! Two shapes are supported:
//! - `categorized`: independent category tables whose product ids may overlap,
//!   keyed by (category, product id)
//! - `variations`: one flat table keyed by product id, where each product may
//!   offer an ordered list of variation names

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::product::{CatalogEntry, CategoryId, ProductId};
use crate::domain::quote::LineRequest;
use crate::errors::ResolutionError;

/// Category label carried by line items resolved from a flat catalog.
pub const FLAT_CATALOG_CATEGORY: &str = "general";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    #[default]
    Categorized,
    Variations,
}

impl std::str::FromStr for CatalogKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "categorized" => Ok(Self::Categorized),
            "variations" => Ok(Self::Variations),
            other => {
                Err(format!("unsupported catalog schema `{other}` (expected categorized|variations)"))
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTable {
    pub id: CategoryId,
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default)]
    pub products: Vec<CatalogEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "schema", rename_all = "snake_case")]
pub enum CatalogSchema {
    Categorized { categories: Vec<CategoryTable> },
    Variations { products: Vec<CatalogEntry> },
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not read catalog file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse catalog file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("catalog file `{path}` declares schema {found:?} but {expected:?} is configured")]
    SchemaMismatch { path: PathBuf, expected: CatalogKind, found: CatalogKind },
    #[error("duplicate category `{0}`")]
    DuplicateCategory(CategoryId),
    #[error("duplicate product `{product_id}` in {table}")]
    DuplicateProduct { table: String, product_id: ProductId },
    #[error("product `{0}` has a negative unit price")]
    NegativePrice(ProductId),
}

/// A product resolved from a line request, borrowed from the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedLine<'a> {
    pub entry: &'a CatalogEntry,
    pub category: String,
    pub variation: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    schema: CatalogSchema,
}

impl Catalog {
    pub fn new(schema: CatalogSchema) -> Result<Self, CatalogError> {
        check_schema(&schema)?;
        Ok(Self { schema })
    }

    pub fn builtin(kind: CatalogKind) -> Self {
        let schema = match kind {
            CatalogKind::Categorized => builtin_categorized(),
            CatalogKind::Variations => builtin_variations(),
        };
        Self { schema }
    }

    pub fn from_toml_str(raw: &str, path: &Path) -> Result<Self, CatalogError> {
        let schema = toml::from_str::<CatalogSchema>(raw)
            .map_err(|source| CatalogError::ParseFile { path: path.to_path_buf(), source })?;
        Self::new(schema)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| CatalogError::ReadFile { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&raw, path)
    }

    /// Loads `path` when given, otherwise the built-in catalog for `kind`.
    pub fn load(kind: CatalogKind, path: Option<&Path>) -> Result<Self, CatalogError> {
        let Some(path) = path else {
            return Ok(Self::builtin(kind));
        };
        let catalog = Self::from_toml_file(path)?;
        if catalog.kind() != kind {
            return Err(CatalogError::SchemaMismatch {
                path: path.to_path_buf(),
                expected: kind,
                found: catalog.kind(),
            });
        }
        Ok(catalog)
    }

    pub fn kind(&self) -> CatalogKind {
        match self.schema {
            CatalogSchema::Categorized { .. } => CatalogKind::Categorized,
            CatalogSchema::Variations { .. } => CatalogKind::Variations,
        }
    }

    pub fn schema(&self) -> &CatalogSchema {
        &self.schema
    }

    /// Category tables; empty for a flat catalog.
    pub fn categories(&self) -> &[CategoryTable] {
        match &self.schema {
            CatalogSchema::Categorized { categories } => categories,
            CatalogSchema::Variations { .. } => &[],
        }
    }

    /// Products selectable for a row. A flat catalog ignores `category`.
    pub fn products_in(&self, category: Option<&CategoryId>) -> &[CatalogEntry] {
        match &self.schema {
            CatalogSchema::Categorized { categories } => category
                .and_then(|id| categories.iter().find(|table| &table.id == id))
                .map(|table| table.products.as_slice())
                .unwrap_or(&[]),
            CatalogSchema::Variations { products } => products,
        }
    }

    pub fn lookup(
        &self,
        category: Option<&CategoryId>,
        product_id: &ProductId,
    ) -> Option<&CatalogEntry> {
        self.products_in(category).iter().find(|entry| &entry.id == product_id)
    }

    /// Valid variation names for a product in a flat catalog.
    pub fn variations(&self, product_id: &ProductId) -> Option<&[String]> {
        match &self.schema {
            CatalogSchema::Variations { products } => products
                .iter()
                .find(|entry| &entry.id == product_id)
                .map(|entry| entry.variations.as_slice()),
            CatalogSchema::Categorized { .. } => None,
        }
    }

    pub fn resolve(&self, request: &LineRequest) -> Result<ResolvedLine<'_>, ResolutionError> {
        let category = match self.kind() {
            CatalogKind::Categorized => request.selected_category(),
            CatalogKind::Variations => None,
        };
        if let Some(category) = category {
            if !self.categories().iter().any(|table| &table.id == category) {
                return Err(ResolutionError::UnknownCategory(category.clone()));
            }
        }

        let product_id =
            request.selected_product().cloned().unwrap_or_else(|| ProductId(String::new()));
        let entry = self.lookup(category, &product_id).ok_or_else(|| {
            ResolutionError::UnknownProduct {
                category: category.cloned(),
                product_id: product_id.clone(),
            }
        })?;

        let variation = match self.kind() {
            CatalogKind::Categorized => None,
            CatalogKind::Variations => match request.selected_variation() {
                Some(name) if entry.offers_variation(name) => Some(name.to_string()),
                Some(name) => {
                    return Err(ResolutionError::UnknownVariation {
                        product_id: entry.id.clone(),
                        variation: name.to_string(),
                    })
                }
                None => None,
            },
        };

        let category = category
            .map(|id| id.0.clone())
            .unwrap_or_else(|| FLAT_CATALOG_CATEGORY.to_string());

        Ok(ResolvedLine { entry, category, variation })
    }
}

fn check_schema(schema: &CatalogSchema) -> Result<(), CatalogError> {
    match schema {
        CatalogSchema::Categorized { categories } => {
            let mut seen = HashSet::new();
            for table in categories {
                if !seen.insert(&table.id) {
                    return Err(CatalogError::DuplicateCategory(table.id.clone()));
                }
                check_table(&format!("category `{}`", table.id), &table.products)?;
            }
        }
        CatalogSchema::Variations { products } => check_table("catalog", products)?,
    }
    Ok(())
}

fn check_table(label: &str, products: &[CatalogEntry]) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for entry in products {
        if !seen.insert(&entry.id) {
            return Err(CatalogError::DuplicateProduct {
                table: label.to_string(),
                product_id: entry.id.clone(),
            });
        }
        if entry.unit_price < Decimal::ZERO {
            return Err(CatalogError::NegativePrice(entry.id.clone()));
        }
    }
    Ok(())
}

fn builtin_categorized() -> CatalogSchema {
    let table = |id: &str, prefix: &str, display_name: &str, first_product: &str| CategoryTable {
        id: CategoryId::from(id),
        display_name: display_name.to_string(),
        products: vec![
            CatalogEntry::new(&format!("product_{prefix}_a"), first_product, Decimal::from(100)),
            CatalogEntry::new(&format!("product_{prefix}_b"), "Premium Gizmo", Decimal::from(250)),
            CatalogEntry::new(&format!("product_{prefix}_c"), "Economy Gadget", Decimal::from(50)),
        ],
    };

    CatalogSchema::Categorized {
        categories: vec![
            table("electrical", "electric", "Electrical", "Light sockets"),
            table("fire", "fire", "Fire", "Standard Gizmo"),
            table("security", "security", "Security", "Standard Gizmo"),
            table("cctv", "cctv", "CCTV", "Standard Gizmo"),
        ],
    }
}

fn builtin_variations() -> CatalogSchema {
    CatalogSchema::Variations {
        products: vec![
            CatalogEntry::new("product_a", "Standard Gizmo", Decimal::from(100))
                .with_variations(&["Small", "Medium", "Large"]),
            CatalogEntry::new("product_b", "Premium Gizmo", Decimal::from(250))
                .with_variations(&["Silver", "Gold"]),
            CatalogEntry::new("product_c", "Economy Gadget", Decimal::from(50)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{Catalog, CatalogError, CatalogKind, FLAT_CATALOG_CATEGORY};
    use crate::domain::product::{CategoryId, ProductId};
    use crate::domain::quote::LineRequest;
    use crate::errors::ResolutionError;

    #[test]
    fn categorized_lookup_keys_by_category_and_product() {
        let catalog = Catalog::builtin(CatalogKind::Categorized);

        let entry = catalog
            .lookup(Some(&CategoryId::from("electrical")), &ProductId::from("product_electric_b"))
            .expect("premium gizmo should exist");
        assert_eq!(entry.display_name, "Premium Gizmo");
        assert_eq!(entry.unit_price, Decimal::from(250));

        let first = catalog
            .lookup(Some(&CategoryId::from("electrical")), &ProductId::from("product_electric_a"))
            .expect("light sockets should exist");
        assert_eq!(first.display_name, "Light sockets");
    }

    #[test]
    fn product_ids_do_not_leak_across_categories() {
        let catalog = Catalog::builtin(CatalogKind::Categorized);

        assert!(catalog
            .lookup(Some(&CategoryId::from("fire")), &ProductId::from("product_electric_b"))
            .is_none());
        assert!(catalog.lookup(None, &ProductId::from("product_fire_a")).is_none());
    }

    #[test]
    fn builtin_categorized_catalog_has_four_tables() {
        let catalog = Catalog::builtin(CatalogKind::Categorized);
        let ids: Vec<&str> = catalog.categories().iter().map(|table| table.id.0.as_str()).collect();
        assert_eq!(ids, ["electrical", "fire", "security", "cctv"]);
        assert_eq!(catalog.products_in(Some(&CategoryId::from("cctv"))).len(), 3);
    }

    #[test]
    fn resolve_reports_unknown_category() {
        let catalog = Catalog::builtin(CatalogKind::Categorized);
        let error = catalog
            .resolve(&LineRequest::categorized("plumbing", "product_fire_a", 1))
            .expect_err("unknown category");
        assert_eq!(error, ResolutionError::UnknownCategory(CategoryId::from("plumbing")));
    }

    #[test]
    fn flat_catalog_resolves_by_product_and_checks_variation() {
        let catalog = Catalog::builtin(CatalogKind::Variations);

        let resolved = catalog
            .resolve(&LineRequest::with_variation("product_b", "Gold", 1))
            .expect("gold premium gizmo");
        assert_eq!(resolved.entry.display_name, "Premium Gizmo");
        assert_eq!(resolved.variation.as_deref(), Some("Gold"));
        assert_eq!(resolved.category, FLAT_CATALOG_CATEGORY);

        let error = catalog
            .resolve(&LineRequest::with_variation("product_b", "Bronze", 1))
            .expect_err("bronze is not offered");
        assert!(matches!(error, ResolutionError::UnknownVariation { .. }));

        assert_eq!(
            catalog.variations(&ProductId::from("product_a")).map(<[String]>::len),
            Some(3)
        );
        assert_eq!(catalog.variations(&ProductId::from("product_c")), Some(&[][..]));
    }

    #[test]
    fn loads_custom_catalog_from_toml() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("catalog.toml");
        fs::write(
            &path,
            r#"
schema = "variations"

[[products]]
id = "kit"
name = "Starter Kit"
unit_price = "19.99"
variations = ["Blue", "Red"]
"#,
        )
        .expect("write catalog");

        let catalog = Catalog::load(CatalogKind::Variations, Some(&path)).expect("catalog loads");
        let entry = catalog.lookup(None, &ProductId::from("kit")).expect("kit exists");
        assert_eq!(entry.unit_price, Decimal::new(1999, 2));
        assert_eq!(entry.variations, vec!["Blue".to_string(), "Red".to_string()]);

        let mismatch = Catalog::load(CatalogKind::Categorized, Some(&path));
        assert!(matches!(mismatch, Err(CatalogError::SchemaMismatch { .. })));
    }

    #[test]
    fn rejects_duplicate_products_within_a_table() {
        let raw = r#"
schema = "categorized"

[[categories]]
id = "fire"
display_name = "Fire"

[[categories.products]]
id = "alarm"
display_name = "Alarm"
unit_price = "10"

[[categories.products]]
id = "alarm"
display_name = "Alarm again"
unit_price = "12"
"#;
        let error = Catalog::from_toml_str(raw, Path::new("inline.toml")).expect_err("duplicate");
        assert!(matches!(error, CatalogError::DuplicateProduct { .. }));
    }
}
