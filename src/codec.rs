//! Payload codecs: how a token's full information is turned into the opaque
//! `data` column and back.

use crate::errors::{StoreError, StoreResult};
use crate::models::token::{Token, TokenInfo};

pub trait TokenCodec: Send + Sync {
    fn encode(&self, info: &dyn TokenInfo) -> StoreResult<String>;

    fn decode(&self, data: &str) -> StoreResult<Box<dyn TokenInfo>>;
}

/// JSON over the [`Token`] model.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl TokenCodec for JsonCodec {
    fn encode(&self, info: &dyn TokenInfo) -> StoreResult<String> {
        Ok(serde_json::to_string(&Token::from_info(info))?)
    }

    fn decode(&self, data: &str) -> StoreResult<Box<dyn TokenInfo>> {
        let token: Token = serde_json::from_str(data).map_err(StoreError::from)?;
        Ok(Box::new(token))
    }
}
