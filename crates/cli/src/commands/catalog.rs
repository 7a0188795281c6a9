use quoteform_core::config::LoadOptions;
use quoteform_core::cpq::{format_money, Catalog, CatalogSchema};
use quoteform_core::domain::product::CatalogEntry;

use super::{load_builder, CommandResult};

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let (config, builder) = match load_builder("catalog", options) {
        Ok(loaded) => loaded,
        Err(failure) => return failure,
    };
    let catalog = builder.catalog();

    if json_output {
        return match serde_json::to_value(catalog.schema()) {
            Ok(data) => CommandResult::success_with("catalog", summary(catalog), Some(data)),
            Err(error) => CommandResult::failure("catalog", "serialization", error.to_string(), 1),
        };
    }

    CommandResult { exit_code: 0, output: render_human(catalog, &config.quotation.currency_symbol) }
}

fn summary(catalog: &Catalog) -> String {
    match catalog.schema() {
        CatalogSchema::Categorized { categories } => {
            let products: usize = categories.iter().map(|table| table.products.len()).sum();
            format!("{} categories, {products} products", categories.len())
        }
        CatalogSchema::Variations { products } => format!("{} products", products.len()),
    }
}

fn render_human(catalog: &Catalog, currency_symbol: &str) -> String {
    let mut lines = vec![format!("catalog ({:?}): {}", catalog.kind(), summary(catalog))];

    match catalog.schema() {
        CatalogSchema::Categorized { categories } => {
            for table in categories {
                lines.push(format!("{} [{}]", table.display_name, table.id));
                for entry in &table.products {
                    lines.push(render_entry(entry, currency_symbol, "  "));
                }
            }
        }
        CatalogSchema::Variations { products } => {
            for entry in products {
                lines.push(render_entry(entry, currency_symbol, ""));
            }
        }
    }

    lines.join("\n")
}

fn render_entry(entry: &CatalogEntry, currency_symbol: &str, indent: &str) -> String {
    let mut line = format!(
        "{indent}- {} = {} ({currency_symbol}{})",
        entry.id,
        entry.display_name,
        format_money(entry.unit_price)
    );
    if !entry.variations.is_empty() {
        line.push_str(&format!(" variations: {}", entry.variations.join(", ")));
    }
    line
}
