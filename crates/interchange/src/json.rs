//! Low-stock JSON export.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use stockledger_infra::{LedgerStore, QueryLayer};
use stockledger_inventory::Product;

use crate::error::InterchangeResult;

/// Wire shape of one exported product.
#[derive(Debug, Serialize)]
struct LowStockRecord<'a> {
    #[serde(rename = "id_producto")]
    id: i64,
    #[serde(rename = "nombre")]
    name: &'a str,
    #[serde(rename = "categoria")]
    category: &'a str,
    #[serde(rename = "precio")]
    price: &'a str,
    stock: i64,
}

impl<'a> From<&'a Product> for LowStockRecord<'a> {
    fn from(product: &'a Product) -> Self {
        Self {
            id: product.id_typed().get(),
            name: product.name(),
            category: product.category(),
            price: product.price().as_str(),
            stock: product.stock(),
        }
    }
}

/// Serialize products as a JSON array with 4-space indentation.
pub fn write_products<W: Write>(out: W, products: &[Product]) -> InterchangeResult<()> {
    let records: Vec<LowStockRecord<'_>> = products.iter().map(LowStockRecord::from).collect();
    let mut serializer =
        serde_json::Serializer::with_formatter(out, PrettyFormatter::with_indent(b"    "));
    records.serialize(&mut serializer)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct LowStockExporter<S> {
    query: QueryLayer<S>,
}

impl<S: LedgerStore> LowStockExporter<S> {
    pub fn new(query: QueryLayer<S>) -> Self {
        Self { query }
    }

    /// Products with `stock < threshold`, ordered by id, as JSON.
    pub async fn export_to_string(&self, threshold: i64) -> InterchangeResult<String> {
        let products = self.query.low_stock(threshold).await?;
        let mut out = Vec::new();
        write_products(&mut out, &products)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Write the export to `path`, replacing any existing file. Returns how
    /// many products were exported.
    pub async fn export_to_file(&self, threshold: i64, path: &Path) -> InterchangeResult<usize> {
        let products = self.query.low_stock(threshold).await?;
        let mut out = Vec::new();
        write_products(&mut out, &products)?;
        tokio::fs::write(path, out).await?;
        tracing::info!(count = products.len(), path = %path.display(), "low-stock export written");
        Ok(products.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_core::ProductId;
    use stockledger_infra::{InMemoryLedgerStore, LedgerServices};
    use stockledger_inventory::{NewProduct, Price};

    #[test]
    fn uses_spanish_field_names_and_four_space_indent() {
        let product = Product::new(
            ProductId::new(3),
            "Tuerca \"M4\"",
            "Ferretería",
            Price::new("0.05"),
            2,
        )
        .unwrap();
        let mut out = Vec::new();
        write_products(&mut out, &[product]).unwrap();

        let expected = r#"[
    {
        "id_producto": 3,
        "nombre": "Tuerca \"M4\"",
        "categoria": "Ferretería",
        "precio": "0.05",
        "stock": 2
    }
]"#;
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn empty_export_is_an_empty_array() {
        let mut out = Vec::new();
        write_products(&mut out, &[]).unwrap();
        assert_eq!(out, b"[]");
    }

    #[tokio::test]
    async fn exports_only_products_below_threshold_in_id_order() {
        let services = LedgerServices::new(InMemoryLedgerStore::new());
        for (name, stock) in [("A", 1), ("B", 50), ("C", 4)] {
            services
                .registry
                .create(NewProduct::new(name, "Cat", "1.00", stock))
                .await
                .unwrap();
        }

        let json = LowStockExporter::new(services.query.clone())
            .export_to_string(5)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let ids: Vec<i64> = parsed
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["id_producto"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
