//! Inventory XML export and full-replace import.
//!
//! Document layout:
//!
//! ```xml
//! <inventario>
//!     <producto id="1">
//!         <nombre>Widget</nombre>
//!         <categoria>Tools</categoria>
//!         <precio>9.99</precio>
//!         <stock>10</stock>
//!     </producto>
//! </inventario>
//! ```
//!
//! Import validates the whole document against this layout before the store
//! is touched, then replaces every product and discards all movements.

use std::collections::HashSet;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use stockledger_core::{ProductId, sort_by_id};
use stockledger_infra::{BulkLoadReport, BulkLoader, LedgerStore, ProductRegistry};
use stockledger_inventory::{Price, Product};

use crate::error::{InterchangeError, InterchangeResult};

const ROOT: &str = "inventario";
const PRODUCT: &str = "producto";
const ID_ATTR: &str = "id";
const FIELDS: [&str; 4] = ["nombre", "categoria", "precio", "stock"];

fn write_failed(err: impl std::fmt::Display) -> InterchangeError {
    InterchangeError::XmlWrite(err.to_string())
}

/// Render products (in the given order) as an indented inventory document.
pub fn write_inventory(products: &[Product]) -> InterchangeResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))
        .map_err(write_failed)?;
    writer
        .write_event(Event::Start(BytesStart::new(ROOT)))
        .map_err(write_failed)?;

    for product in products {
        let id = product.id_typed().to_string();
        let stock = product.stock().to_string();
        writer
            .write_event(Event::Start(
                BytesStart::new(PRODUCT).with_attributes([(ID_ATTR, id.as_str())]),
            ))
            .map_err(write_failed)?;
        let values = [
            product.name(),
            product.category(),
            product.price().as_str(),
            stock.as_str(),
        ];
        for (field, value) in FIELDS.iter().zip(values) {
            writer
                .write_event(Event::Start(BytesStart::new(*field)))
                .map_err(write_failed)?;
            writer
                .write_event(Event::Text(BytesText::new(value)))
                .map_err(write_failed)?;
            writer
                .write_event(Event::End(BytesEnd::new(*field)))
                .map_err(write_failed)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(PRODUCT)))
            .map_err(write_failed)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new(ROOT)))
        .map_err(write_failed)?;

    String::from_utf8(writer.into_inner()).map_err(write_failed)
}

/// Parse and validate an inventory document.
///
/// Checks the root name, one `id` attribute per product, exactly the four
/// child elements in order, integer ids (unique across the document), and a
/// non-negative integer stock. Field text is kept as written; only the
/// whitespace between elements is ignored.
pub fn parse_inventory(xml: &str) -> InterchangeResult<Vec<Product>> {
    let mut reader = Reader::from_str(xml);

    match next_significant(&mut reader)? {
        Event::Start(start) if start.name().as_ref() == ROOT.as_bytes() => {}
        Event::Empty(start) if start.name().as_ref() == ROOT.as_bytes() => {
            expect_eof(&mut reader)?;
            return Ok(Vec::new());
        }
        other => {
            return Err(InterchangeError::invalid_xml(format!(
                "expected <{ROOT}> root element, found {}",
                describe(&other)
            )));
        }
    }

    let mut products = Vec::new();
    let mut seen = HashSet::new();
    loop {
        match next_significant(&mut reader)? {
            Event::Start(start) if start.name().as_ref() == PRODUCT.as_bytes() => {
                let id = product_id(&start)?;
                if !seen.insert(id) {
                    return Err(InterchangeError::invalid_xml(format!(
                        "duplicate product id {id}"
                    )));
                }
                products.push(read_product(&mut reader, id)?);
            }
            Event::End(end) if end.name().as_ref() == ROOT.as_bytes() => break,
            other => {
                return Err(InterchangeError::invalid_xml(format!(
                    "expected <{PRODUCT}> or </{ROOT}>, found {}",
                    describe(&other)
                )));
            }
        }
    }

    expect_eof(&mut reader)?;
    Ok(products)
}

/// Next event that is not a prolog item, comment or whitespace-only text.
fn next_significant<'a>(reader: &mut Reader<&'a [u8]>) -> InterchangeResult<Event<'a>> {
    loop {
        match next_event(reader)? {
            Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => continue,
            other => return Ok(other),
        }
    }
}

/// Next event that is not a prolog item or comment. Text is returned as is.
fn next_event<'a>(reader: &mut Reader<&'a [u8]>) -> InterchangeResult<Event<'a>> {
    loop {
        let event = reader
            .read_event()
            .map_err(|e| InterchangeError::invalid_xml(e.to_string()))?;
        match event {
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => continue,
            other => return Ok(other),
        }
    }
}

fn expect_eof(reader: &mut Reader<&[u8]>) -> InterchangeResult<()> {
    match next_significant(reader)? {
        Event::Eof => Ok(()),
        other => Err(InterchangeError::invalid_xml(format!(
            "unexpected {} after </{ROOT}>",
            describe(&other)
        ))),
    }
}

fn describe(event: &Event<'_>) -> String {
    match event {
        Event::Start(e) | Event::Empty(e) => {
            format!("<{}>", String::from_utf8_lossy(e.name().as_ref()))
        }
        Event::End(e) => format!("</{}>", String::from_utf8_lossy(e.name().as_ref())),
        Event::Text(_) | Event::CData(_) => "text".to_string(),
        Event::Eof => "end of document".to_string(),
        _ => "markup".to_string(),
    }
}

fn product_id(start: &BytesStart<'_>) -> InterchangeResult<ProductId> {
    let mut id = None;
    for attr in start.attributes() {
        let attr = attr.map_err(|e| InterchangeError::invalid_xml(e.to_string()))?;
        if attr.key.as_ref() == ID_ATTR.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| InterchangeError::invalid_xml(e.to_string()))?;
            id = Some(value.trim().parse::<ProductId>().map_err(|_| {
                InterchangeError::invalid_xml(format!("product id '{value}' is not an integer"))
            })?);
        }
    }
    id.ok_or_else(|| InterchangeError::invalid_xml(format!("<{PRODUCT}> without '{ID_ATTR}'")))
}

fn read_product(reader: &mut Reader<&[u8]>, id: ProductId) -> InterchangeResult<Product> {
    let mut values: Vec<String> = Vec::with_capacity(FIELDS.len());
    for field in FIELDS {
        values.push(read_field(reader, field, id)?);
    }

    match next_significant(reader)? {
        Event::End(end) if end.name().as_ref() == PRODUCT.as_bytes() => {}
        other => {
            return Err(InterchangeError::invalid_xml(format!(
                "product {id}: expected </{PRODUCT}>, found {}",
                describe(&other)
            )));
        }
    }

    let stock = values[3].trim().parse::<i64>().map_err(|_| {
        InterchangeError::invalid_xml(format!("product {id}: stock '{}' is not an integer", values[3]))
    })?;
    if stock < 0 {
        return Err(InterchangeError::invalid_xml(format!(
            "product {id}: stock {stock} is negative"
        )));
    }

    Product::new(
        id,
        values[0].as_str(),
        values[1].as_str(),
        Price::new(values[2].as_str()),
        stock,
    )
    .map_err(|e| InterchangeError::invalid_xml(format!("product {id}: {e}")))
}

/// `<field>text</field>` or `<field/>` (empty text).
fn read_field(reader: &mut Reader<&[u8]>, field: &str, id: ProductId) -> InterchangeResult<String> {
    match next_significant(reader)? {
        Event::Empty(e) if e.name().as_ref() == field.as_bytes() => return Ok(String::new()),
        Event::Start(e) if e.name().as_ref() == field.as_bytes() => {}
        other => {
            return Err(InterchangeError::invalid_xml(format!(
                "product {id}: expected <{field}>, found {}",
                describe(&other)
            )));
        }
    }

    let mut text = String::new();
    loop {
        match next_event(reader)? {
            Event::Text(t) => {
                let value = t
                    .unescape()
                    .map_err(|e| InterchangeError::invalid_xml(e.to_string()))?;
                text.push_str(&value);
            }
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::End(e) if e.name().as_ref() == field.as_bytes() => return Ok(text),
            other => {
                return Err(InterchangeError::invalid_xml(format!(
                    "product {id}: unexpected {} inside <{field}>",
                    describe(&other)
                )));
            }
        }
    }
}

/// Exports every product, ordered by id.
#[derive(Debug, Clone)]
pub struct XmlExporter<S> {
    registry: ProductRegistry<S>,
}

impl<S: LedgerStore> XmlExporter<S> {
    pub fn new(registry: ProductRegistry<S>) -> Self {
        Self { registry }
    }

    pub async fn export_to_string(&self) -> InterchangeResult<String> {
        let mut products = self.registry.list_all().await?;
        sort_by_id(&mut products);
        write_inventory(&products)
    }

    pub async fn export_to_file(&self, path: &Path) -> InterchangeResult<()> {
        let xml = self.export_to_string().await?;
        tokio::fs::write(path, xml).await?;
        tracing::info!(path = %path.display(), "inventory xml written");
        Ok(())
    }
}

/// Destructive full replace from an inventory document.
#[derive(Debug, Clone)]
pub struct XmlImporter<S> {
    loader: BulkLoader<S>,
}

impl<S: LedgerStore> XmlImporter<S> {
    pub fn new(loader: BulkLoader<S>) -> Self {
        Self { loader }
    }

    /// Validate `xml`, then wipe movements and products and insert the
    /// document's products. An invalid document leaves the store untouched.
    pub async fn replace_from_str(&self, xml: &str) -> InterchangeResult<BulkLoadReport> {
        let products = parse_inventory(xml)?;
        Ok(self.loader.replace_all(products).await?)
    }

    pub async fn replace_from_file(&self, path: &Path) -> InterchangeResult<BulkLoadReport> {
        let xml = tokio::fs::read_to_string(path).await?;
        self.replace_from_str(&xml).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockledger_infra::{InMemoryLedgerStore, LedgerServices};
    use stockledger_inventory::NewProduct;

    fn product(id: i64, name: &str, stock: i64) -> Product {
        Product::new(ProductId::new(id), name, "Tools", Price::new("9.99"), stock).unwrap()
    }

    #[test]
    fn writes_indented_document() {
        let xml = write_inventory(&[product(1, "Widget & Co", 10)]).unwrap();
        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n\
<inventario>\n\
\x20   <producto id=\"1\">\n\
\x20       <nombre>Widget &amp; Co</nombre>\n\
\x20       <categoria>Tools</categoria>\n\
\x20       <precio>9.99</precio>\n\
\x20       <stock>10</stock>\n\
\x20   </producto>\n\
</inventario>";
        assert_eq!(xml, expected);
    }

    #[test]
    fn written_documents_parse_back() {
        let products = vec![product(4, "Nail <small>", 0), product(9, "Saw", 3)];
        let parsed = parse_inventory(&write_inventory(&products).unwrap()).unwrap();
        assert_eq!(parsed, products);
    }

    #[test]
    fn field_text_keeps_surrounding_whitespace() {
        let products = vec![product(2, "  Padded name ", 1)];
        let parsed = parse_inventory(&write_inventory(&products).unwrap()).unwrap();
        assert_eq!(parsed[0].name(), "  Padded name ");

        let xml = "<inventario>\n  <producto id=\"5\">\n    <nombre> A </nombre>\n    \
<categoria>B</categoria>\n    <precio>1</precio>\n    <stock> 7 </stock>\n  </producto>\n</inventario>\n";
        let parsed = parse_inventory(xml).unwrap();
        assert_eq!(parsed[0].name(), " A ");
        assert_eq!(parsed[0].stock(), 7);
    }

    #[test]
    fn blank_field_text_is_rejected() {
        let xml = "<inventario><producto id=\"1\"><nombre>   </nombre><categoria>B</categoria><precio>1</precio><stock>1</stock></producto></inventario>";
        assert!(matches!(
            parse_inventory(xml).unwrap_err(),
            InterchangeError::InvalidXml(_)
        ));
    }

    #[test]
    fn empty_inventory_is_valid() {
        assert!(parse_inventory("<inventario/>").unwrap().is_empty());
        assert!(parse_inventory("<inventario></inventario>").unwrap().is_empty());
    }

    #[test]
    fn rejects_layout_violations() {
        let cases = [
            ("<stock/>", "root"),
            (
                "<inventario><producto><nombre>A</nombre><categoria>B</categoria><precio>1</precio><stock>1</stock></producto></inventario>",
                "missing id",
            ),
            (
                "<inventario><producto id=\"1\"><categoria>B</categoria><nombre>A</nombre><precio>1</precio><stock>1</stock></producto></inventario>",
                "order",
            ),
            (
                "<inventario><producto id=\"1\"><nombre>A</nombre><categoria>B</categoria><precio>1</precio><stock>-1</stock></producto></inventario>",
                "negative stock",
            ),
            (
                "<inventario><producto id=\"x\"><nombre>A</nombre><categoria>B</categoria><precio>1</precio><stock>1</stock></producto></inventario>",
                "bad id",
            ),
            (
                "<inventario><producto id=\"1\"><nombre>A</nombre><categoria>B</categoria><precio>1</precio><stock>1</stock><extra/></producto></inventario>",
                "extra child",
            ),
            ("<inventario></inventario><inventario/>", "trailing root"),
        ];
        for (xml, case) in cases {
            let err = parse_inventory(xml).unwrap_err();
            assert!(matches!(err, InterchangeError::InvalidXml(_)), "{case}: {err}");
        }
    }

    #[test]
    fn rejects_duplicate_ids() {
        let xml = write_inventory(&[product(1, "A", 1), product(1, "B", 2)]).unwrap();
        let err = parse_inventory(&xml).unwrap_err();
        assert_eq!(err.to_string(), "invalid inventory xml: duplicate product id 1");
    }

    #[tokio::test]
    async fn invalid_document_leaves_store_untouched() {
        let services = LedgerServices::new(InMemoryLedgerStore::new());
        let id = services
            .registry
            .create(NewProduct::new("Widget", "Tools", "9.99", 10))
            .await
            .unwrap();
        services.engine.apply_entry(id, 1).await.unwrap();

        let importer = XmlImporter::new(services.bulk.clone());
        importer.replace_from_str("<inventario><producto/>").await.unwrap_err();

        assert_eq!(services.registry.find_by_id(id).await.unwrap().stock(), 11);
        assert_eq!(services.ledger.query_by_product(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn export_then_import_replaces_everything() {
        let services = LedgerServices::new(InMemoryLedgerStore::new());
        for name in ["B", "A"] {
            services
                .registry
                .create(NewProduct::new(name, "Tools", "1.00", 5))
                .await
                .unwrap();
        }
        services.engine.apply_exit(ProductId::new(1), 2).await.unwrap();

        let xml = XmlExporter::new(services.registry.clone())
            .export_to_string()
            .await
            .unwrap();
        assert!(xml.find("id=\"1\"").unwrap() < xml.find("id=\"2\"").unwrap());

        let report = XmlImporter::new(services.bulk.clone())
            .replace_from_str(&xml)
            .await
            .unwrap();
        assert_eq!(report.products_inserted, 2);
        assert_eq!(report.movements_removed, 1);
        assert_eq!(
            services.registry.find_by_id(ProductId::new(1)).await.unwrap().stock(),
            3
        );
        assert!(
            services
                .ledger
                .query_by_product(ProductId::new(1))
                .await
                .unwrap()
                .is_empty()
        );
    }
}
