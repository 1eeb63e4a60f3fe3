//! Token-info model handed to the store by the grant-flow layer.
//!
//! The store only depends on the `TokenInfo` trait. `Token` is the default
//! concrete shape and the one `JsonCodec` decodes into.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Read access to a grant's token information.
///
/// Empty strings mean "not present" for `code`, `access` and `refresh`.
pub trait TokenInfo: Send + Sync + std::fmt::Debug {
    fn client_id(&self) -> &str;
    fn user_id(&self) -> &str;
    fn redirect_uri(&self) -> &str;
    fn scope(&self) -> &str;

    fn code(&self) -> &str;
    fn code_create_at(&self) -> DateTime<Utc>;
    fn code_expires_in(&self) -> Duration;

    fn access(&self) -> &str;
    fn access_create_at(&self) -> DateTime<Utc>;
    fn access_expires_in(&self) -> Duration;

    fn refresh(&self) -> &str;
    fn refresh_create_at(&self) -> DateTime<Utc>;
    fn refresh_expires_in(&self) -> Duration;

    fn has_code(&self) -> bool {
        !self.code().is_empty()
    }

    fn has_access(&self) -> bool {
        !self.access().is_empty()
    }

    fn has_refresh(&self) -> bool {
        !self.refresh().is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Token {
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: String,

    pub code: String,
    pub code_create_at: DateTime<Utc>,
    #[serde(with = "duration_nanos")]
    pub code_expires_in: Duration,

    pub access: String,
    pub access_create_at: DateTime<Utc>,
    #[serde(with = "duration_nanos")]
    pub access_expires_in: Duration,

    pub refresh: String,
    pub refresh_create_at: DateTime<Utc>,
    #[serde(with = "duration_nanos")]
    pub refresh_expires_in: Duration,
}

impl Token {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Snapshot any `TokenInfo` implementor into the concrete model.
    pub fn from_info(info: &dyn TokenInfo) -> Self {
        Self {
            client_id: info.client_id().to_string(),
            user_id: info.user_id().to_string(),
            redirect_uri: info.redirect_uri().to_string(),
            scope: info.scope().to_string(),
            code: info.code().to_string(),
            code_create_at: info.code_create_at(),
            code_expires_in: info.code_expires_in(),
            access: info.access().to_string(),
            access_create_at: info.access_create_at(),
            access_expires_in: info.access_expires_in(),
            refresh: info.refresh().to_string(),
            refresh_create_at: info.refresh_create_at(),
            refresh_expires_in: info.refresh_expires_in(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>, at: DateTime<Utc>, ttl: Duration) -> Self {
        self.code = code.into();
        self.code_create_at = at;
        self.code_expires_in = ttl;
        self
    }

    pub fn with_access(
        mut self,
        access: impl Into<String>,
        at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        self.access = access.into();
        self.access_create_at = at;
        self.access_expires_in = ttl;
        self
    }

    pub fn with_refresh(
        mut self,
        refresh: impl Into<String>,
        at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        self.refresh = refresh.into();
        self.refresh_create_at = at;
        self.refresh_expires_in = ttl;
        self
    }
}

impl TokenInfo for Token {
    fn client_id(&self) -> &str {
        &self.client_id
    }
    fn user_id(&self) -> &str {
        &self.user_id
    }
    fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
    fn scope(&self) -> &str {
        &self.scope
    }
    fn code(&self) -> &str {
        &self.code
    }
    fn code_create_at(&self) -> DateTime<Utc> {
        self.code_create_at
    }
    fn code_expires_in(&self) -> Duration {
        self.code_expires_in
    }
    fn access(&self) -> &str {
        &self.access
    }
    fn access_create_at(&self) -> DateTime<Utc> {
        self.access_create_at
    }
    fn access_expires_in(&self) -> Duration {
        self.access_expires_in
    }
    fn refresh(&self) -> &str {
        &self.refresh
    }
    fn refresh_create_at(&self) -> DateTime<Utc> {
        self.refresh_create_at
    }
    fn refresh_expires_in(&self) -> Duration {
        self.refresh_expires_in
    }
}

/// TTLs travel as signed nanoseconds, so sub-second precision survives.
mod duration_nanos {
    use chrono::Duration;
    use serde::{ser, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ttl: &Duration, s: S) -> Result<S::Ok, S::Error> {
        let nanos = ttl
            .num_nanoseconds()
            .ok_or_else(|| <S::Error as ser::Error>::custom(format!("ttl too large: {}", ttl)))?;
        s.serialize_i64(nanos)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::nanoseconds(i64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_has_checks_follow_empty_strings() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = Token::new("client").with_access("A1", at, Duration::hours(1));
        assert!(!token.has_code());
        assert!(token.has_access());
        assert!(!token.has_refresh());
    }

    #[test]
    fn test_ttl_serializes_as_nanoseconds() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = Token::new("client").with_code("C1", at, Duration::minutes(10));
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["code_expires_in"], 600_000_000_000i64);
        assert_eq!(json["code"], "C1");
    }

    #[test]
    fn test_ttl_beyond_nanosecond_range_fails_to_encode() {
        let token = Token::new("client").with_access("A1", Utc::now(), Duration::days(365 * 400));
        assert!(serde_json::to_string(&token).is_err());
    }

    #[test]
    fn test_missing_fields_default() {
        let token: Token = serde_json::from_str(r#"{"client_id":"c","access":"A"}"#).unwrap();
        assert_eq!(token.access, "A");
        assert_eq!(token.refresh, "");
        assert_eq!(token.access_expires_in, Duration::zero());
    }

    #[test]
    fn test_from_info_snapshots_everything() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = Token::new("client")
            .with_user("u-1")
            .with_scope("read write")
            .with_redirect_uri("https://app.example/cb")
            .with_access("A1", at, Duration::hours(2))
            .with_refresh("R1", at, Duration::days(7));
        let copy = Token::from_info(&token);
        assert_eq!(copy, token);
    }
}
