use serde::{Deserialize, Serialize};

use stockledger_core::{Entity, LedgerError, LedgerResult, ProductId, ValueObject};

/// Opaque price string.
///
/// The ledger stores and returns it verbatim; no numeric parsing or currency
/// handling happens anywhere in the workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(String);

impl Price {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for Price {}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Price {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Current snapshot of a product as held by the registry.
///
/// `stock` is the single source of truth for on-hand quantity and is never
/// negative. Products hold no reference to their movements. Deserialization
/// goes through [`Product::new`], so it cannot bypass validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProductRecord")]
pub struct Product {
    id: ProductId,
    name: String,
    category: String,
    price: Price,
    stock: i64,
}

impl Product {
    /// Build a validated product snapshot.
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        category: impl Into<String>,
        price: Price,
        stock: i64,
    ) -> LedgerResult<Self> {
        let name = name.into();
        let category = category.into();
        ensure_label("name", &name)?;
        ensure_label("category", &category)?;
        ensure_stock(stock)?;
        Ok(Self {
            id,
            name,
            category,
            price,
            stock,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn price(&self) -> &Price {
        &self.price
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    /// The metadata part of the product (everything but id and stock).
    pub fn fields(&self) -> ProductFields {
        ProductFields {
            name: self.name.clone(),
            category: self.category.clone(),
            price: self.price.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ProductRecord {
    id: ProductId,
    name: String,
    category: String,
    price: Price,
    stock: i64,
}

impl TryFrom<ProductRecord> for Product {
    type Error = LedgerError;

    fn try_from(record: ProductRecord) -> LedgerResult<Self> {
        Product::new(
            record.id,
            record.name,
            record.category,
            record.price,
            record.stock,
        )
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

/// Input for registry creation; the id is assigned by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: Price,
    /// Baseline stock. Recorded as the starting state, not as a movement.
    pub initial_stock: i64,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        price: impl Into<Price>,
        initial_stock: i64,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            price: price.into(),
            initial_stock,
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        ensure_label("name", &self.name)?;
        ensure_label("category", &self.category)?;
        ensure_stock(self.initial_stock)
    }

    /// Materialize the product under the id chosen by the registry.
    pub fn into_product(self, id: ProductId) -> LedgerResult<Product> {
        Product::new(id, self.name, self.category, self.price, self.initial_stock)
    }
}

/// Metadata-only update (no stock, no ledger side effect).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFields {
    pub name: String,
    pub category: String,
    pub price: Price,
}

impl ProductFields {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        price: impl Into<Price>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            price: price.into(),
        }
    }

    pub fn validate(&self) -> LedgerResult<()> {
        ensure_label("name", &self.name)?;
        ensure_label("category", &self.category)
    }
}

fn ensure_label(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::invalid_product(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn ensure_stock(stock: i64) -> LedgerResult<()> {
    if stock < 0 {
        return Err(LedgerError::invalid_product(format!(
            "stock cannot be negative (got {stock})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_product_accepts_zero_stock() {
        let new = NewProduct::new("Widget", "Tools", "9.99", 0);
        assert!(new.validate().is_ok());
        let product = new.into_product(ProductId::new(1)).unwrap();
        assert_eq!(product.stock(), 0);
        assert_eq!(product.price().as_str(), "9.99");
    }

    #[test]
    fn new_product_rejects_negative_stock() {
        let err = NewProduct::new("Widget", "Tools", "9.99", -1)
            .validate()
            .unwrap_err();
        match err {
            LedgerError::InvalidProduct(_) => {}
            _ => panic!("Expected InvalidProduct error for negative stock"),
        }
    }

    #[test]
    fn blank_labels_are_rejected() {
        assert!(NewProduct::new("  ", "Tools", "1", 1).validate().is_err());
        assert!(ProductFields::new("Widget", "", "1").validate().is_err());
    }

    #[test]
    fn price_is_kept_verbatim() {
        let product = Product::new(
            ProductId::new(2),
            "Gadget",
            "Toys",
            Price::new("  12,50 EUR "),
            3,
        )
        .unwrap();
        assert_eq!(product.price().to_string(), "  12,50 EUR ");
        assert_eq!(product.fields().price, Price::new("  12,50 EUR "));
    }

    #[test]
    fn deserialized_products_are_validated() {
        let product: Product = serde_json::from_str(
            r#"{"id":4,"name":"Nut","category":"Hardware","price":"0.05","stock":7}"#,
        )
        .unwrap();
        assert_eq!(product.stock(), 7);

        let negative = serde_json::from_str::<Product>(
            r#"{"id":4,"name":"Nut","category":"Hardware","price":"0.05","stock":-1}"#,
        );
        assert!(negative.is_err());

        let blank = serde_json::from_str::<Product>(
            r#"{"id":4,"name":" ","category":"Hardware","price":"0.05","stock":1}"#,
        );
        assert!(blank.is_err());
    }

    #[test]
    fn product_exposes_entity_id() {
        let product =
            Product::new(ProductId::new(9), "Bolt", "Hardware", Price::new("0.10"), 100).unwrap();
        assert_eq!(Entity::id(&product), ProductId::new(9));
    }
}
