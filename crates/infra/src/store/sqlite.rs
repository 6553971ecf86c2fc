//! SQLite-backed ledger store.
//!
//! Products and movements live in two tables; the movement table carries a
//! foreign key to `products` without `ON DELETE CASCADE`, so a product can
//! only be removed after its movements. Stock sufficiency is enforced twice:
//! by the guarded `UPDATE ... AND stock >= ?` used for exits, and by a
//! `CHECK (stock >= 0)` on the column.
//!
//! Every transaction opens with `BEGIN IMMEDIATE`, taking the write lock up
//! front. A deferred transaction that reads before writing cannot wait for a
//! concurrent writer and fails with `SQLITE_BUSY` instead; an immediate one
//! waits up to [`BUSY_TIMEOUT`].
//!
//! ## Error Mapping
//!
//! | SQLx error | StoreError |
//! |------------|------------|
//! | Database (unique / foreign key / check / not null) | `Constraint` |
//! | Database (other) | `Backend` |
//! | PoolTimedOut, PoolClosed, Io, Configuration | `Unavailable` |
//! | ColumnDecode, Decode, ColumnNotFound | `Corrupt` |
//! | Other | `Backend` |

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use stockledger_core::{MovementId, ProductId};
use stockledger_inventory::{
    CategoryStock, DateRange, Movement, MovementKind, MovementReportRow, Price, Product,
    ProductFields, TopSeller,
};

use super::r#trait::{LedgerStore, LedgerTransaction, StoreError};

/// How long a transaction waits for another connection's write lock.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: [&str; 3] = [
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id       INTEGER PRIMARY KEY,
        name     TEXT    NOT NULL,
        category TEXT    NOT NULL,
        price    TEXT    NOT NULL,
        stock    INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS stock_movements (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id  INTEGER NOT NULL REFERENCES products (id),
        kind        TEXT    NOT NULL CHECK (kind IN ('ENTRY', 'EXIT')),
        quantity    INTEGER NOT NULL CHECK (quantity > 0),
        recorded_at TEXT    NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS stock_movements_by_product
        ON stock_movements (product_id, recorded_at)
    "#,
];

/// SQLite-backed ledger store.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Connect to `url` and provision the schema.
    ///
    /// In-memory databases are private to a connection, so the pool is pinned
    /// to a single connection that is never recycled.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| map_sqlx_error("parse_url", e))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let in_memory = is_in_memory(url);
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { max_connections.max(1) })
            .acquire_timeout(BUSY_TIMEOUT)
            .idle_timeout(if in_memory { None } else { Some(Duration::from_secs(600)) })
            .max_lifetime(if in_memory { None } else { Some(Duration::from_secs(1800)) })
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self { pool };
        store.provision_schema().await?;
        tracing::debug!(url, in_memory, "sqlite ledger store ready");
        Ok(store)
    }

    /// Fresh private in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:", 1).await
    }

    /// Create the ledger tables if they do not exist yet.
    pub async fn provision_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("provision_schema", e))?;
        }
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Transaction over [`SqliteLedgerStore`]. Dropped without commit = rolled back.
pub struct SqliteTransaction {
    inner: Transaction<'static, Sqlite>,
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    type Tx = SqliteTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let inner = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(SqliteTransaction { inner })
    }

    async fn product_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, category, price, stock
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_by_id", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn product_by_name(&self, name: &str) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, category, price, stock
            FROM products
            WHERE name = ?1
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_by_name", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, category, price, stock
            FROM products
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn products_below(&self, threshold: i64) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, category, price, stock
            FROM products
            WHERE stock < ?1
            ORDER BY id ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("products_below", e))?;

        rows.iter().map(product_from_row).collect()
    }

    async fn movements_for_product(&self, id: ProductId) -> Result<Vec<Movement>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, kind, quantity, recorded_at
            FROM stock_movements
            WHERE product_id = ?1
            ORDER BY recorded_at DESC, id DESC
            "#,
        )
        .bind(id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("movements_for_product", e))?;

        rows.iter().map(movement_from_row).collect()
    }

    async fn movements_between(
        &self,
        range: DateRange,
    ) -> Result<Vec<MovementReportRow>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT m.id, m.product_id, m.kind, m.quantity, m.recorded_at,
                   p.name, p.category
            FROM stock_movements m
            JOIN products p ON m.product_id = p.id
            WHERE substr(m.recorded_at, 1, 10) BETWEEN ?1 AND ?2
            ORDER BY m.recorded_at DESC, m.id DESC
            "#,
        )
        .bind(range.start.format("%Y-%m-%d").to_string())
        .bind(range.end.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("movements_between", e))?;

        rows.iter()
            .map(|row| {
                Ok(MovementReportRow {
                    movement: movement_from_row(row)?,
                    product_name: column(row, "name")?,
                    category: column(row, "category")?,
                })
            })
            .collect()
    }

    async fn sum_by_product_and_kind(
        &self,
        id: ProductId,
        kind: MovementKind,
    ) -> Result<i64, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(quantity), 0) AS total
            FROM stock_movements
            WHERE product_id = ?1 AND kind = ?2
            "#,
        )
        .bind(id.get())
        .bind(kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("sum_by_product_and_kind", e))?;

        column(&row, "total")
    }

    async fn top_selling(&self, limit: i64) -> Result<Vec<TopSeller>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.category, p.price,
                   COALESCE(SUM(m.quantity), 0) AS total_sold
            FROM products p
            LEFT JOIN stock_movements m
                ON m.product_id = p.id AND m.kind = 'EXIT'
            GROUP BY p.id, p.name, p.category, p.price
            ORDER BY total_sold DESC, p.id ASC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("top_selling", e))?;

        rows.iter()
            .map(|row| {
                Ok(TopSeller {
                    product_id: ProductId::new(column(row, "id")?),
                    name: column(row, "name")?,
                    category: column(row, "category")?,
                    price: Price::new(column::<String>(row, "price")?),
                    total_sold: column(row, "total_sold")?,
                })
            })
            .collect()
    }

    async fn stock_by_category(&self) -> Result<Vec<CategoryStock>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT category,
                   COUNT(*) AS product_count,
                   COALESCE(SUM(stock), 0) AS total_stock
            FROM products
            GROUP BY category
            ORDER BY total_stock DESC, category ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("stock_by_category", e))?;

        rows.iter()
            .map(|row| {
                Ok(CategoryStock {
                    category: column(row, "category")?,
                    product_count: column(row, "product_count")?,
                    total_stock: column(row, "total_stock")?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl LedgerTransaction for SqliteTransaction {
    async fn next_product_id(&mut self) -> Result<ProductId, StoreError> {
        let row = sqlx::query("SELECT COALESCE(MAX(id), 0) + 1 AS next_id FROM products")
            .fetch_one(&mut *self.inner)
            .await
            .map_err(|e| map_sqlx_error("next_product_id", e))?;
        Ok(ProductId::new(column(&row, "next_id")?))
    }

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, category, price, stock)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(product.id_typed().get())
        .bind(product.name())
        .bind(product.category())
        .bind(product.price().as_str())
        .bind(product.stock())
        .execute(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    async fn update_product_fields(
        &mut self,
        id: ProductId,
        fields: &ProductFields,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?1, category = ?2, price = ?3
            WHERE id = ?4
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.category)
        .bind(fields.price.as_str())
        .bind(id.get())
        .execute(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("update_product_fields", e))?;
        Ok(result.rows_affected())
    }

    async fn current_stock(&mut self, id: ProductId) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query("SELECT stock FROM products WHERE id = ?1")
            .bind(id.get())
            .fetch_optional(&mut *self.inner)
            .await
            .map_err(|e| map_sqlx_error("current_stock", e))?;
        row.as_ref().map(|r| column(r, "stock")).transpose()
    }

    async fn increment_stock(&mut self, id: ProductId, quantity: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("UPDATE products SET stock = stock + ?1 WHERE id = ?2")
            .bind(quantity)
            .bind(id.get())
            .execute(&mut *self.inner)
            .await
            .map_err(|e| map_sqlx_error("increment_stock", e))?;
        Ok(result.rows_affected())
    }

    async fn decrement_stock_if_sufficient(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - ?1 WHERE id = ?2 AND stock >= ?1",
        )
        .bind(quantity)
        .bind(id.get())
        .execute(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("decrement_stock_if_sufficient", e))?;
        Ok(result.rows_affected())
    }

    async fn append_movement(
        &mut self,
        id: ProductId,
        kind: MovementKind,
        quantity: i64,
    ) -> Result<Movement, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO stock_movements (product_id, kind, quantity)
            VALUES (?1, ?2, ?3)
            RETURNING id, product_id, kind, quantity, recorded_at
            "#,
        )
        .bind(id.get())
        .bind(kind.as_str())
        .bind(quantity)
        .fetch_one(&mut *self.inner)
        .await
        .map_err(|e| map_sqlx_error("append_movement", e))?;
        movement_from_row(&row)
    }

    async fn delete_movements_for(&mut self, id: ProductId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM stock_movements WHERE product_id = ?1")
            .bind(id.get())
            .execute(&mut *self.inner)
            .await
            .map_err(|e| map_sqlx_error("delete_movements_for", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_product(&mut self, id: ProductId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id.get())
            .execute(&mut *self.inner)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_all_movements(&mut self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM stock_movements")
            .execute(&mut *self.inner)
            .await
            .map_err(|e| map_sqlx_error("delete_all_movements", e))?;
        Ok(result.rows_affected())
    }

    async fn delete_all_products(&mut self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM products")
            .execute(&mut *self.inner)
            .await
            .map_err(|e| map_sqlx_error("delete_all_products", e))?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.inner
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.inner
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback_transaction", e))
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn product_from_row(row: &SqliteRow) -> Result<Product, StoreError> {
    Product::new(
        ProductId::new(column(row, "id")?),
        column::<String>(row, "name")?,
        column::<String>(row, "category")?,
        Price::new(column::<String>(row, "price")?),
        column(row, "stock")?,
    )
    .map_err(|e| StoreError::Corrupt(e.to_string()))
}

fn movement_from_row(row: &SqliteRow) -> Result<Movement, StoreError> {
    let kind: String = column(row, "kind")?;

    Ok(Movement {
        id: MovementId::new(column(row, "id")?),
        product_id: ProductId::new(column(row, "product_id")?),
        kind: kind.parse().map_err(StoreError::Corrupt)?,
        quantity: column(row, "quantity")?,
        recorded_at: column::<DateTime<Utc>>(row, "recorded_at")?,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => StoreError::Constraint(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool unavailable in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        sqlx::Error::Configuration(e) => {
            StoreError::Unavailable(format!("bad configuration in {operation}: {e}"))
        }
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)) => {
            StoreError::Corrupt(format!("decode error in {operation}: {e}"))
        }
        other => StoreError::Backend(format!("error in {operation}: {other}")),
    }
}
