//! tokenstore: SQL-backed storage for OAuth2 token records.
//!
//! One table holds authorization codes, access tokens and refresh tokens.
//! Rows are looked up by any of the three keys, soft-deleted by blanking a
//! key, and purged by a background sweep once they expire.

pub mod clock;
pub mod codec;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod sink;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{JsonCodec, TokenCodec};
pub use config::{StoreConfig, StoreOptions};
pub use errors::{StoreError, StoreResult};
pub use jobs::sweep::{SweepExit, SweepOutcome};
pub use models::token::{Token, TokenInfo};
pub use sink::{ErrorSink, SharedSink, StderrSink, WriterSink};
pub use store::dialect::Dialect;
pub use store::sql::TokenStore;
pub use store::TokenStorage;
