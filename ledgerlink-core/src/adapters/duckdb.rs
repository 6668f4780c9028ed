//! DuckDB document store implementation

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Business, CanonicalTransaction, CredentialRecord, CustomerAggregate, ProviderKind,
};
use crate::ports::DocumentStore;

/// Schema bootstrap, idempotent
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sys_businesses (
    business_id VARCHAR PRIMARY KEY,
    name VARCHAR NOT NULL,
    email VARCHAR NOT NULL UNIQUE,
    password_hash VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL,
    updated_at VARCHAR NOT NULL,
    payment_credentials JSON,
    accounting_credentials JSON
);

CREATE TABLE IF NOT EXISTS sys_ledger_transactions (
    business_id VARCHAR NOT NULL,
    provider VARCHAR NOT NULL,
    position BIGINT NOT NULL,
    payload JSON NOT NULL
);

CREATE TABLE IF NOT EXISTS sys_customer_aggregates (
    business_id VARCHAR PRIMARY KEY,
    payload JSON NOT NULL,
    updated_at VARCHAR NOT NULL
);
"#;

/// DuckDB document store
///
/// All documents are stored as JSON payloads; credential records live on the
/// business row (one column per provider slot) so the upsert-per-pair
/// invariant is enforced by the schema itself.
pub struct DuckDbStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbStore {
    /// Open or create the store database
    pub fn new(db_path: &Path) -> Result<Self> {
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(|e| Error::persistence(e.to_string()))?;
        let conn = Connection::open_with_flags(db_path, config)
            .map_err(|e| Error::persistence(format!("Failed to open store: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: db_path.to_path_buf(),
        })
    }

    /// Ensure the schema exists
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::persistence(format!("Failed to create schema: {}", e)))
    }

    /// Path of the backing database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::persistence("Store lock poisoned"))
    }

    fn credentials_column(provider: ProviderKind) -> &'static str {
        match provider {
            ProviderKind::Payment => "payment_credentials",
            ProviderKind::Accounting => "accounting_credentials",
        }
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_business(
        row: (String, String, String, String, String, String),
    ) -> Result<Business> {
        let (id, name, email, password_hash, created_at, updated_at) = row;
        Ok(Business {
            id: Uuid::parse_str(&id)
                .map_err(|e| Error::persistence(format!("Corrupt business id: {}", e)))?,
            name,
            email,
            password_hash,
            created_at: Self::parse_timestamp(&created_at),
            updated_at: Self::parse_timestamp(&updated_at),
        })
    }

    fn query_business(conn: &Connection, sql: &str, key: &str) -> Result<Option<Business>> {
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::persistence(e.to_string()))?;

        let row = stmt.query_row([key], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        });

        match row {
            Ok(fields) => Ok(Some(Self::row_to_business(fields)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::persistence(e.to_string())),
        }
    }
}

const BUSINESS_COLUMNS: &str =
    "business_id, name, email, password_hash, created_at, updated_at";

#[async_trait]
impl DocumentStore for DuckDbStore {
    async fn insert_business(&self, business: &Business) -> Result<()> {
        let conn = self.lock()?;

        let exists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sys_businesses WHERE email = ?",
                [&business.email],
                |row| row.get(0),
            )
            .map_err(|e| Error::persistence(e.to_string()))?;
        if exists > 0 {
            return Err(Error::Duplicate(format!(
                "Business already registered for {}",
                business.email
            )));
        }

        conn.execute(
            "INSERT INTO sys_businesses (business_id, name, email, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                business.id.to_string(),
                business.name,
                business.email,
                business.password_hash,
                business.created_at.to_rfc3339(),
                business.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::persistence(e.to_string()))?;

        Ok(())
    }

    async fn get_business(&self, id: Uuid) -> Result<Option<Business>> {
        let conn = self.lock()?;
        Self::query_business(
            &conn,
            &format!("SELECT {} FROM sys_businesses WHERE business_id = ?", BUSINESS_COLUMNS),
            &id.to_string(),
        )
    }

    async fn get_business_by_email(&self, email: &str) -> Result<Option<Business>> {
        let conn = self.lock()?;
        Self::query_business(
            &conn,
            &format!("SELECT {} FROM sys_businesses WHERE email = ?", BUSINESS_COLUMNS),
            email,
        )
    }

    async fn upsert_credentials(
        &self,
        business_id: Uuid,
        credentials: &CredentialRecord,
    ) -> Result<()> {
        let conn = self.lock()?;
        let payload = serde_json::to_string(credentials)?;

        let updated = conn
            .execute(
                &format!(
                    "UPDATE sys_businesses SET {} = ?, updated_at = ? WHERE business_id = ?",
                    Self::credentials_column(credentials.provider)
                ),
                params![payload, Utc::now().to_rfc3339(), business_id.to_string()],
            )
            .map_err(|e| Error::persistence(e.to_string()))?;

        if updated == 0 {
            return Err(Error::not_found(format!("Business {} not found", business_id)));
        }
        Ok(())
    }

    async fn get_credentials(
        &self,
        business_id: Uuid,
        provider: ProviderKind,
    ) -> Result<Option<CredentialRecord>> {
        let conn = self.lock()?;

        let row = conn.query_row(
            &format!(
                "SELECT {} FROM sys_businesses WHERE business_id = ?",
                Self::credentials_column(provider)
            ),
            [business_id.to_string()],
            |row| row.get::<_, Option<String>>(0),
        );

        match row {
            Ok(Some(payload)) => Ok(Some(serde_json::from_str(&payload)?)),
            Ok(None) => Ok(None),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::persistence(e.to_string())),
        }
    }

    async fn replace_transactions(
        &self,
        business_id: Uuid,
        provider: ProviderKind,
        transactions: &[CanonicalTransaction],
    ) -> Result<()> {
        let conn = self.lock()?;

        // Replace-all inside one transaction so readers never observe a
        // partially written set
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| Error::persistence(e.to_string()))?;

        let result = (|| -> Result<()> {
            conn.execute(
                "DELETE FROM sys_ledger_transactions WHERE business_id = ? AND provider = ?",
                params![business_id.to_string(), provider.as_str()],
            )
            .map_err(|e| Error::persistence(e.to_string()))?;

            for (position, tx) in transactions.iter().enumerate() {
                conn.execute(
                    "INSERT INTO sys_ledger_transactions (business_id, provider, position, payload)
                     VALUES (?, ?, ?, ?)",
                    params![
                        business_id.to_string(),
                        provider.as_str(),
                        position as i64,
                        serde_json::to_string(tx)?,
                    ],
                )
                .map_err(|e| Error::persistence(e.to_string()))?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => conn
                .execute_batch("COMMIT")
                .map_err(|e| Error::persistence(e.to_string())),
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    async fn get_transactions(
        &self,
        business_id: Uuid,
        provider: ProviderKind,
    ) -> Result<Vec<CanonicalTransaction>> {
        let conn = self.lock()?;

        let mut stmt = conn
            .prepare(
                "SELECT payload FROM sys_ledger_transactions
                 WHERE business_id = ? AND provider = ?
                 ORDER BY position",
            )
            .map_err(|e| Error::persistence(e.to_string()))?;

        let payloads: Vec<String> = stmt
            .query_map(
                params![business_id.to_string(), provider.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| Error::persistence(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect();

        payloads
            .iter()
            .map(|payload| serde_json::from_str(payload).map_err(Error::from))
            .collect()
    }

    async fn upsert_aggregate(&self, aggregate: &CustomerAggregate) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO sys_customer_aggregates (business_id, payload, updated_at)
             VALUES (?, ?, ?)",
            params![
                aggregate.business_id.to_string(),
                serde_json::to_string(aggregate)?,
                aggregate.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| Error::persistence(e.to_string()))?;

        Ok(())
    }

    async fn get_aggregate(&self, business_id: Uuid) -> Result<Option<CustomerAggregate>> {
        let conn = self.lock()?;

        let row = conn.query_row(
            "SELECT payload FROM sys_customer_aggregates WHERE business_id = ?",
            [business_id.to_string()],
            |row| row.get::<_, String>(0),
        );

        match row {
            Ok(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Error::persistence(e.to_string())),
        }
    }
}
