use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;

use crate::clock::Clock;
use crate::codec::TokenCodec;
use crate::config::{StoreConfig, StoreOptions};
use crate::errors::{StoreError, StoreResult};
use crate::jobs::sweep::{self, ExpiredTokens, SweepHandle, SweepOutcome};
use crate::models::record::TokenRecord;
use crate::models::token::TokenInfo;
use crate::sink::{ErrorSink, SharedSink};
use crate::store::dialect::{validate_table_name, Dialect, KeyColumn};
use crate::store::TokenStorage;

/// The single token table: pool, dialect and name.
struct TokenTable {
    pool: AnyPool,
    dialect: Dialect,
    name: String,
}

#[async_trait]
impl ExpiredTokens for TokenTable {
    async fn count_expired(&self, now: i64) -> StoreResult<i64> {
        let sql = self.dialect.count_expired(&self.name);
        let n = sqlx::query_scalar::<_, i64>(&sql)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    async fn delete_expired(&self, now: i64) -> StoreResult<u64> {
        let sql = self.dialect.delete_expired(&self.name);
        let done = sqlx::query(&sql).bind(now).execute(&self.pool).await?;
        Ok(done.rows_affected())
    }
}

/// SQL-backed OAuth2 token store.
///
/// Construction provisions the table and indexes and starts one background
/// sweep that lives as long as the store (or until [`TokenStore::close`]).
pub struct TokenStore {
    table: Arc<TokenTable>,
    codec: Arc<dyn TokenCodec>,
    clock: Arc<dyn Clock>,
    sink: SharedSink,
    sweeper: Mutex<Option<SweepHandle>>,
}

impl TokenStore {
    /// Open a pool from `config` and build the store on it.
    pub async fn connect(config: &StoreConfig, options: StoreOptions) -> StoreResult<Self> {
        config.validate()?;
        let dialect = Dialect::from_url(&config.dsn)?;

        sqlx::any::install_default_drivers();
        tracing::info!(
            dialect = ?dialect,
            max_open = config.max_open_connections,
            max_idle = config.max_idle_connections,
            max_lifetime_secs = config.max_lifetime.as_secs(),
            "connecting token store"
        );

        let mut pool_options = AnyPoolOptions::new()
            .max_connections(config.max_open_connections)
            .max_lifetime(config.max_lifetime)
            .idle_timeout(config.idle_timeout);
        // One connection that is never reaped, or the table vanishes with it.
        if dialect.is_in_memory(&config.dsn) {
            tracing::warn!("in-memory sqlite: pool pinned to a single connection");
            pool_options = pool_options
                .max_connections(1)
                .max_lifetime(None)
                .idle_timeout(None);
        }

        let pool = pool_options.connect(&config.dsn).await?;

        Self::with_pool(pool, dialect, options).await
    }

    /// Build the store on a pool the caller already opened and manages.
    pub async fn with_pool(
        pool: AnyPool,
        dialect: Dialect,
        options: StoreOptions,
    ) -> StoreResult<Self> {
        let name = options.resolved_table_name().to_string();
        validate_table_name(&name)?;

        for stmt in dialect.provision(&name) {
            sqlx::query(&stmt).execute(&pool).await?;
        }
        tracing::info!(table = %name, dialect = ?dialect, "token table ready");

        let table = Arc::new(TokenTable {
            pool,
            dialect,
            name,
        });
        let sink = SharedSink::default();
        let period = options.resolved_gc_interval();
        let handle = sweep::spawn(table.clone(), options.clock.clone(), sink.clone(), period);
        tracing::info!(interval_secs = period.as_secs(), "token sweep started");

        Ok(Self {
            table,
            codec: options.codec,
            clock: options.clock,
            sink,
            sweeper: Mutex::new(Some(handle)),
        })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.table.pool
    }

    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    pub fn dialect(&self) -> Dialect {
        self.table.dialect
    }

    /// Redirect error reports, including those from the running sweep.
    pub fn set_error_sink(&self, sink: Arc<dyn ErrorSink>) -> &Self {
        self.sink.replace(sink);
        self
    }

    /// True while the background sweep is alive.
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Run one sweep pass now, using the store's clock and sink.
    pub async fn sweep_once(&self) -> SweepOutcome {
        sweep::sweep_once(self.table.as_ref(), self.clock.unix_now(), &self.sink).await
    }

    /// Stop the sweep and close the pool. Later calls fail with a pool error.
    pub async fn close(&self) {
        let handle = self.sweeper.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let exit = handle.stop().await;
            tracing::debug!(?exit, "token sweep ended");
        }
        self.table.pool.close().await;
        tracing::info!(table = %self.table.name, "token store closed");
    }

    pub async fn create(&self, info: &dyn TokenInfo) -> StoreResult<()> {
        let data = self.codec.encode(info)?;
        let TokenRecord {
            expired_at,
            code,
            access,
            refresh,
            data,
            ..
        } = TokenRecord::derive(info, data)?;

        let sql = self.table.dialect.insert(&self.table.name);
        sqlx::query(&sql)
            .bind(expired_at)
            .bind(code)
            .bind(access)
            .bind(refresh)
            .bind(data)
            .execute(&self.table.pool)
            .await?;

        tracing::debug!(client_id = info.client_id(), expired_at, "token stored");
        Ok(())
    }

    pub async fn remove_by_code(&self, code: &str) -> StoreResult<()> {
        self.clear(KeyColumn::Code, code).await
    }

    pub async fn remove_by_access(&self, access: &str) -> StoreResult<()> {
        self.clear(KeyColumn::Access, access).await
    }

    pub async fn remove_by_refresh(&self, refresh: &str) -> StoreResult<()> {
        self.clear(KeyColumn::Refresh, refresh).await
    }

    pub async fn get_by_code(&self, code: &str) -> StoreResult<Option<Box<dyn TokenInfo>>> {
        self.get_by(KeyColumn::Code, code).await
    }

    pub async fn get_by_access(&self, access: &str) -> StoreResult<Option<Box<dyn TokenInfo>>> {
        self.get_by(KeyColumn::Access, access).await
    }

    pub async fn get_by_refresh(&self, refresh: &str) -> StoreResult<Option<Box<dyn TokenInfo>>> {
        self.get_by(KeyColumn::Refresh, refresh).await
    }

    // Soft delete: blank the key on one row, leave the row for the sweep.
    async fn clear(&self, key: KeyColumn, value: &str) -> StoreResult<()> {
        if value.is_empty() {
            return Ok(());
        }

        let sql = self.table.dialect.clear_key(&self.table.name, key);
        match sqlx::query(&sql).bind(value).execute(&self.table.pool).await {
            Ok(done) => {
                tracing::debug!(
                    key = key.as_str(),
                    rows = done.rows_affected(),
                    "token key cleared"
                );
                Ok(())
            }
            Err(sqlx::Error::RowNotFound) => Ok(()),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    // Expired rows stay visible here until the sweep removes them.
    async fn get_by(
        &self,
        key: KeyColumn,
        value: &str,
    ) -> StoreResult<Option<Box<dyn TokenInfo>>> {
        if value.is_empty() {
            return Ok(None);
        }

        let sql = self.table.dialect.select_by(&self.table.name, key);
        let record = sqlx::query_as::<_, TokenRecord>(&sql)
            .bind(value)
            .fetch_optional(&self.table.pool)
            .await?;

        match record {
            Some(record) => self.codec.decode(&record.data).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TokenStorage for TokenStore {
    async fn create(&self, info: &dyn TokenInfo) -> StoreResult<()> {
        TokenStore::create(self, info).await
    }

    async fn remove_by_code(&self, code: &str) -> StoreResult<()> {
        TokenStore::remove_by_code(self, code).await
    }

    async fn remove_by_access(&self, access: &str) -> StoreResult<()> {
        TokenStore::remove_by_access(self, access).await
    }

    async fn remove_by_refresh(&self, refresh: &str) -> StoreResult<()> {
        TokenStore::remove_by_refresh(self, refresh).await
    }

    async fn get_by_code(&self, code: &str) -> StoreResult<Option<Box<dyn TokenInfo>>> {
        TokenStore::get_by_code(self, code).await
    }

    async fn get_by_access(&self, access: &str) -> StoreResult<Option<Box<dyn TokenInfo>>> {
        TokenStore::get_by_access(self, access).await
    }

    async fn get_by_refresh(&self, refresh: &str) -> StoreResult<Option<Box<dyn TokenInfo>>> {
        TokenStore::get_by_refresh(self, refresh).await
    }
}
