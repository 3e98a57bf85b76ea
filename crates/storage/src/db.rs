use bankin_core::{Category, CategoryId, ClassifiedTransaction, DateRange, Direction, NewCategory, OwnerId, Period};
use chrono::NaiveDateTime;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;

pub type DbPool = Pool<Sqlite>;

/// Text layout of stored timestamps. Fixed width, so string order is time order.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub async fn create_db(path: &Path) -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// A private database that lives as long as the pool.
pub async fn connect_in_memory() -> Result<DbPool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            direction TEXT NOT NULL CHECK (direction IN ('income', 'expense')),
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (owner_id, direction, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL CHECK (amount_cents >= 0),
            direction TEXT NOT NULL CHECK (direction IN ('income', 'expense')),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (category_id) REFERENCES categories(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_transactions_lookup \
         ON transactions (owner_id, amount_cents, description, date)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS budgets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            year INTEGER NOT NULL,
            month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
            amount_cents INTEGER NOT NULL DEFAULT 0,
            spent_cents INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (category_id) REFERENCES categories(id),
            UNIQUE (owner_id, category_id, year, month)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

fn parse_direction(raw: &str) -> Option<Direction> {
    raw.parse().ok()
}

pub async fn get_categories(
    pool: &DbPool,
    owner: OwnerId,
    direction: Direction,
) -> Result<Vec<Category>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, i64, String, String)>(
        "SELECT id, owner_id, name, direction FROM categories WHERE owner_id = ? AND direction = ? ORDER BY id",
    )
    .bind(owner.0)
    .bind(direction.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|r| {
            Some(Category {
                id: CategoryId(r.0),
                owner_id: OwnerId(r.1),
                name: r.2,
                direction: parse_direction(&r.3)?,
            })
        })
        .collect())
}

/// Existing (owner, direction, name) rows are left alone.
pub async fn insert_categories(pool: &DbPool, categories: &[NewCategory]) -> Result<usize, sqlx::Error> {
    let mut inserted = 0;
    for category in categories {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO categories (owner_id, name, direction, is_default) VALUES (?, ?, ?, ?)",
        )
        .bind(category.owner_id.0)
        .bind(&category.name)
        .bind(category.direction.as_str())
        .bind(category.is_default)
        .execute(pool)
        .await?;
        inserted += result.rows_affected() as usize;
    }
    Ok(inserted)
}

pub async fn find_transaction(
    pool: &DbPool,
    owner: OwnerId,
    amount_cents: i64,
    description: &str,
    day: DateRange,
) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64,)>(
        "SELECT id FROM transactions \
         WHERE owner_id = ? AND amount_cents = ? AND description = ? AND date >= ? AND date < ? \
         LIMIT 1",
    )
    .bind(owner.0)
    .bind(amount_cents)
    .bind(description)
    .bind(day.start.format(DATE_FORMAT).to_string())
    .bind(day.end.format(DATE_FORMAT).to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.0))
}

/// A transaction ready for the `transactions` table.
pub struct TransactionRow<'a> {
    pub category_id: CategoryId,
    pub date: NaiveDateTime,
    pub description: &'a str,
    pub amount_cents: i64,
    pub direction: Direction,
}

impl<'a> TransactionRow<'a> {
    /// `None` when the amount does not fit in cents.
    pub fn from_classified(record: &'a ClassifiedTransaction) -> Option<Self> {
        Some(Self {
            category_id: record.category_id,
            date: record.transaction.date,
            description: &record.transaction.description,
            amount_cents: record.transaction.amount.to_cents()?,
            direction: record.transaction.direction,
        })
    }
}

/// Inserts every row in one database transaction. Nothing is kept if any
/// row fails.
pub async fn insert_transactions(
    pool: &DbPool,
    owner: OwnerId,
    rows: &[TransactionRow<'_>],
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;
    for row in rows {
        sqlx::query(
            "INSERT INTO transactions (owner_id, category_id, date, description, amount_cents, direction) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(owner.0)
        .bind(row.category_id.0)
        .bind(row.date.format(DATE_FORMAT).to_string())
        .bind(row.description)
        .bind(row.amount_cents)
        .bind(row.direction.as_str())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(rows.len())
}

pub async fn sum_transactions(
    pool: &DbPool,
    owner: OwnerId,
    category: CategoryId,
    direction: Direction,
    range: DateRange,
) -> Result<i64, sqlx::Error> {
    let (total,) = sqlx::query_as::<_, (i64,)>(
        "SELECT COALESCE(SUM(amount_cents), 0) FROM transactions \
         WHERE owner_id = ? AND category_id = ? AND direction = ? AND date >= ? AND date < ?",
    )
    .bind(owner.0)
    .bind(category.0)
    .bind(direction.as_str())
    .bind(range.start.format(DATE_FORMAT).to_string())
    .bind(range.end.format(DATE_FORMAT).to_string())
    .fetch_one(pool)
    .await?;

    Ok(total)
}

pub async fn count_transactions(pool: &DbPool, owner: OwnerId) -> Result<i64, sqlx::Error> {
    let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM transactions WHERE owner_id = ?")
        .bind(owner.0)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Creates the month's budget for a category, or leaves an existing one alone.
pub async fn create_budget(
    pool: &DbPool,
    owner: OwnerId,
    category: CategoryId,
    period: Period,
    amount_cents: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT OR IGNORE INTO budgets (owner_id, category_id, year, month, amount_cents) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(owner.0)
    .bind(category.0)
    .bind(period.year)
    .bind(period.month)
    .bind(amount_cents)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_budget_spent(
    pool: &DbPool,
    owner: OwnerId,
    category: CategoryId,
    period: Period,
) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64,)>(
        "SELECT spent_cents FROM budgets WHERE owner_id = ? AND category_id = ? AND year = ? AND month = ?",
    )
    .bind(owner.0)
    .bind(category.0)
    .bind(period.year)
    .bind(period.month)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.0))
}

/// `false` when no budget row exists for the bucket.
pub async fn update_budget_spent(
    pool: &DbPool,
    owner: OwnerId,
    category: CategoryId,
    period: Period,
    spent_cents: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE budgets SET spent_cents = ? WHERE owner_id = ? AND category_id = ? AND year = ? AND month = ?",
    )
    .bind(spent_cents)
    .bind(owner.0)
    .bind(category.0)
    .bind(period.year)
    .bind(period.month)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
