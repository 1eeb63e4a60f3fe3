use chrono::{DateTime, Duration, Utc};

use crate::errors::{StoreError, StoreResult};
use crate::models::token::TokenInfo;

pub const MAX_KEY_LEN: usize = 512;
pub const MAX_DATA_LEN: usize = 2048;

/// One row of the token table.
#[derive(Debug, Clone, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct TokenRecord {
    pub id: i64,
    pub expired_at: i64,
    pub code: String,
    pub access: String,
    pub refresh: String,
    pub data: String,
}

impl TokenRecord {
    /// Build the row for a new grant step.
    ///
    /// A code wins outright. Otherwise the access token is indexed, unless a
    /// refresh token accompanies it, in which case the refresh token takes
    /// over both the key column and the expiry.
    pub fn derive(info: &dyn TokenInfo, data: String) -> StoreResult<Self> {
        let mut record = TokenRecord {
            data,
            ..Self::default()
        };

        if info.has_code() {
            record.code = info.code().to_string();
            record.expired_at = expiry(info.code_create_at(), info.code_expires_in());
        } else if info.has_refresh() {
            record.refresh = info.refresh().to_string();
            record.expired_at = expiry(info.refresh_create_at(), info.refresh_expires_in());
        } else {
            record.access = info.access().to_string();
            record.expired_at = expiry(info.access_create_at(), info.access_expires_in());
        }

        record.check_bounds()?;
        Ok(record)
    }

    fn check_bounds(&self) -> StoreResult<()> {
        for (field, value, max) in [
            ("code", &self.code, MAX_KEY_LEN),
            ("access", &self.access, MAX_KEY_LEN),
            ("refresh", &self.refresh, MAX_KEY_LEN),
            ("data", &self.data, MAX_DATA_LEN),
        ] {
            let len = value.chars().count();
            if len > max {
                return Err(StoreError::FieldTooLong { field, len, max });
            }
        }
        Ok(())
    }
}

/// Unix seconds at which a token created at `at` with `ttl` expires.
/// Saturates instead of overflowing.
pub fn expiry(at: DateTime<Utc>, ttl: Duration) -> i64 {
    at.checked_add_signed(ttl)
        .map(|t| t.timestamp())
        .unwrap_or(if ttl < Duration::zero() { i64::MIN } else { i64::MAX })
}
