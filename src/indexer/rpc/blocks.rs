use alloy_network::AnyRpcBlock;
use anyhow::{anyhow, Result};
use chrono::DateTime;

use crate::models::datasets::blocks::RpcHeaderData;

pub trait BlockParser {
    fn parse_header(&self) -> Result<Vec<RpcHeaderData>>;
}

impl BlockParser for AnyRpcBlock {
    fn parse_header(&self) -> Result<Vec<RpcHeaderData>> {
        let inner = &self.header.inner;

        let block_time = DateTime::from_timestamp(inner.timestamp as i64, 0)
            .ok_or_else(|| anyhow!("invalid timestamp {} in block header", inner.timestamp))?;

        Ok(vec![RpcHeaderData {
            block_time,
            block_date: block_time.date_naive(),
            block_number: inner.number,
            block_hash: self.header.hash,
        }])
    }
}
