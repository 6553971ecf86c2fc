//! Plain-text tables on stdout.

use stockledger_infra::Reconciliation;
use stockledger_inventory::{
    CategoryStock, LedgerBalance, Movement, MovementReportRow, Product, TopSeller,
};

const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("no products");
        return;
    }
    println!("{:>6}  {:<24} {:<16} {:>10} {:>8}", "ID", "NAME", "CATEGORY", "PRICE", "STOCK");
    for p in products {
        println!(
            "{:>6}  {:<24} {:<16} {:>10} {:>8}",
            p.id_typed(),
            p.name(),
            p.category(),
            p.price(),
            p.stock()
        );
    }
}

pub fn movements(movements: &[Movement]) {
    if movements.is_empty() {
        println!("no movements");
        return;
    }
    println!("{:>8}  {:>8}  {:<6} {:>8}  {}", "MOVE", "PRODUCT", "KIND", "QTY", "RECORDED");
    for m in movements {
        println!(
            "{:>8}  {:>8}  {:<6} {:>8}  {}",
            m.id,
            m.product_id,
            m.kind,
            m.quantity,
            m.recorded_at.format(TIMESTAMP)
        );
    }
}

pub fn report(rows: &[MovementReportRow]) {
    if rows.is_empty() {
        println!("no movements in range");
        return;
    }
    println!("{:<20} {:<24} {:<16} {:<6} {:>8}", "RECORDED", "PRODUCT", "CATEGORY", "KIND", "QTY");
    for row in rows {
        println!(
            "{:<20} {:<24} {:<16} {:<6} {:>8}",
            row.movement.recorded_at.format(TIMESTAMP).to_string(),
            row.product_name,
            row.category,
            row.movement.kind.as_str(),
            row.movement.quantity
        );
    }
}

pub fn top_sellers(ranking: &[TopSeller]) {
    println!("{:>4}  {:>6}  {:<24} {:<16} {:>10}", "#", "ID", "NAME", "CATEGORY", "SOLD");
    for (rank, t) in ranking.iter().enumerate() {
        println!(
            "{:>4}  {:>6}  {:<24} {:<16} {:>10}",
            rank + 1,
            t.product_id,
            t.name,
            t.category,
            t.total_sold
        );
    }
}

pub fn categories(rows: &[CategoryStock]) {
    println!("{:<16} {:>9} {:>12}", "CATEGORY", "PRODUCTS", "TOTAL STOCK");
    for row in rows {
        println!("{:<16} {:>9} {:>12}", row.category, row.product_count, row.total_stock);
    }
}

pub fn balance(product: &Product, balance: &LedgerBalance) {
    println!("product {} ({})", product.id_typed(), product.name());
    println!("  entries: {}", balance.entries);
    println!("  exits:   {}", balance.exits);
    println!("  net:     {}", balance.net());
    println!("  stock:   {}", product.stock());
}

pub fn reconciliation(reconciliation: &Reconciliation) {
    match &reconciliation.movement {
        Some(m) => println!(
            "stock {} -> {} ({} {})",
            reconciliation.previous_stock, reconciliation.new_stock, m.kind, m.quantity
        ),
        None => println!("stock already at {}", reconciliation.new_stock),
    }
}
