//! The persistent store: three append-only tables keyed by digest
//! (spec §3, §4.3), backed by SQLite via `sqlx` the way
//! `phoenix-common::schema`/`queries` and `apps/keeper::ensure_schema` set up
//! their outbox tables — plain `const &str` SQL, executed through an
//! `ensure_schema` call at startup.

use crate::digest::Digest;
use crate::model::{BranchRow, LeafRow, RootRow};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const CREATE_LEAF_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS merkle_leaf_table (
        digest BLOB PRIMARY KEY,
        left BLOB NOT NULL,
        right BLOB NOT NULL,
        prev BLOB
    )
"#;

const CREATE_LEAF_LEFT_IDX: &str =
    "CREATE INDEX IF NOT EXISTS merkle_leaf_table_idx_left ON merkle_leaf_table (left)";
const CREATE_LEAF_RIGHT_IDX: &str =
    "CREATE INDEX IF NOT EXISTS merkle_leaf_table_idx_right ON merkle_leaf_table (right)";

const CREATE_BRANCH_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS merkle_branch_table (
        digest BLOB PRIMARY KEY,
        left BLOB NOT NULL,
        right BLOB NOT NULL
    )
"#;

const CREATE_BRANCH_LEFT_IDX: &str =
    "CREATE INDEX IF NOT EXISTS merkle_branch_table_idx_left ON merkle_branch_table (left)";
const CREATE_BRANCH_RIGHT_IDX: &str =
    "CREATE INDEX IF NOT EXISTS merkle_branch_table_idx_right ON merkle_branch_table (right)";

const CREATE_ROOT_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS merkle_root_table (
        root BLOB PRIMARY KEY,
        spec TEXT NOT NULL
    )
"#;

/// Initialize the three tables and their secondary indices if absent.
/// Schema evolution is not supported (spec §6): tables are created, never
/// migrated.
pub async fn ensure_schema(pool: &Pool<Sqlite>) -> Result<(), StoreError> {
    sqlx::query(CREATE_LEAF_TABLE).execute(pool).await?;
    sqlx::query(CREATE_LEAF_LEFT_IDX).execute(pool).await?;
    sqlx::query(CREATE_LEAF_RIGHT_IDX).execute(pool).await?;
    sqlx::query(CREATE_BRANCH_TABLE).execute(pool).await?;
    sqlx::query(CREATE_BRANCH_LEFT_IDX).execute(pool).await?;
    sqlx::query(CREATE_BRANCH_RIGHT_IDX).execute(pool).await?;
    sqlx::query(CREATE_ROOT_TABLE).execute(pool).await?;
    Ok(())
}

/// Open (or create) the SQLite database at `path` and ensure its schema.
pub async fn open(path: &std::path::Path) -> Result<Pool<Sqlite>, StoreError> {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let pool = SqlitePoolOptions::new().max_connections(4).connect(&url).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Insert a leaf row, or warn and skip on digest collision (spec §4.3, I6).
pub async fn insert_leaf(pool: &Pool<Sqlite>, row: &LeafRow) -> Result<(), StoreError> {
    if lookup_leaf_by_digest(pool, row.digest).await?.is_some() {
        tracing::warn!(digest = %row.digest, "collision of digests detected (leaf)");
        return Ok(());
    }
    sqlx::query("INSERT INTO merkle_leaf_table (digest, left, right, prev) VALUES (?1, ?2, ?3, ?4)")
        .bind(row.digest.as_bytes().as_slice())
        .bind(row.left.as_bytes().as_slice())
        .bind(row.right.as_bytes().as_slice())
        .bind(row.prev.map(|d| d.as_bytes().to_vec()))
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a branch row, or warn and skip on digest collision.
pub async fn insert_branch(pool: &Pool<Sqlite>, row: &BranchRow) -> Result<(), StoreError> {
    if lookup_branch_by_digest(pool, row.digest).await?.is_some() {
        tracing::warn!(digest = %row.digest, "collision of digests detected (branch)");
        return Ok(());
    }
    sqlx::query("INSERT INTO merkle_branch_table (digest, left, right) VALUES (?1, ?2, ?3)")
        .bind(row.digest.as_bytes().as_slice())
        .bind(row.left.as_bytes().as_slice())
        .bind(row.right.as_bytes().as_slice())
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert a root row, or warn and skip on digest collision.
pub async fn insert_root(pool: &Pool<Sqlite>, row: &RootRow) -> Result<(), StoreError> {
    if lookup_root(pool, row.root).await?.is_some() {
        tracing::warn!(root = %row.root, "collision of digests detected (root)");
        return Ok(());
    }
    sqlx::query("INSERT INTO merkle_root_table (root, spec) VALUES (?1, ?2)")
        .bind(row.root.as_bytes().as_slice())
        .bind(&row.spec)
        .execute(pool)
        .await?;
    Ok(())
}

fn digest_col(row: &sqlx::sqlite::SqliteRow, name: &str) -> Digest {
    let bytes: Vec<u8> = row.get(name);
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Digest(arr)
}

pub async fn lookup_leaf_by_digest(
    pool: &Pool<Sqlite>,
    digest: Digest,
) -> Result<Option<LeafRow>, StoreError> {
    let row = sqlx::query("SELECT digest, left, right, prev FROM merkle_leaf_table WHERE digest = ?1")
        .bind(digest.as_bytes().as_slice())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| LeafRow {
        digest: digest_col(&r, "digest"),
        left: digest_col(&r, "left"),
        right: digest_col(&r, "right"),
        prev: {
            let bytes: Option<Vec<u8>> = r.get("prev");
            bytes.map(|b| {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&b);
                Digest(arr)
            })
        },
    }))
}

/// Find the leaf whose `left = d` OR `right = d` — the entry point for
/// verification (spec §4.3).
pub async fn lookup_leaf_by_child(
    pool: &Pool<Sqlite>,
    child: Digest,
) -> Result<Option<LeafRow>, StoreError> {
    let row = sqlx::query(
        "SELECT digest, left, right, prev FROM merkle_leaf_table WHERE left = ?1 OR right = ?1",
    )
    .bind(child.as_bytes().as_slice())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| LeafRow {
        digest: digest_col(&r, "digest"),
        left: digest_col(&r, "left"),
        right: digest_col(&r, "right"),
        prev: {
            let bytes: Option<Vec<u8>> = r.get("prev");
            bytes.map(|b| {
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&b);
                Digest(arr)
            })
        },
    }))
}

async fn lookup_branch_by_digest(
    pool: &Pool<Sqlite>,
    digest: Digest,
) -> Result<Option<BranchRow>, StoreError> {
    let row = sqlx::query("SELECT digest, left, right FROM merkle_branch_table WHERE digest = ?1")
        .bind(digest.as_bytes().as_slice())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| BranchRow {
        digest: digest_col(&r, "digest"),
        left: digest_col(&r, "left"),
        right: digest_col(&r, "right"),
    }))
}

/// Find the branch whose `left = d` OR `right = d` — used to ascend during
/// verification.
pub async fn lookup_branch_by_child(
    pool: &Pool<Sqlite>,
    child: Digest,
) -> Result<Option<BranchRow>, StoreError> {
    let row = sqlx::query(
        "SELECT digest, left, right FROM merkle_branch_table WHERE left = ?1 OR right = ?1",
    )
    .bind(child.as_bytes().as_slice())
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| BranchRow {
        digest: digest_col(&r, "digest"),
        left: digest_col(&r, "left"),
        right: digest_col(&r, "right"),
    }))
}

pub async fn lookup_root(pool: &Pool<Sqlite>, root: Digest) -> Result<Option<RootRow>, StoreError> {
    let row = sqlx::query("SELECT root, spec FROM merkle_root_table WHERE root = ?1")
        .bind(root.as_bytes().as_slice())
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| RootRow {
        root: digest_col(&r, "root"),
        spec: r.get("spec"),
    }))
}
