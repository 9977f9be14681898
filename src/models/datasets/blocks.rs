use alloy_primitives::FixedBytes;
use chrono::{DateTime, NaiveDate, Utc};

////////////////////////////////////// RPC Data ////////////////////////////////////////
// The slice of the block header the trace pipeline needs: trace records
// carry no timestamp of their own, so block time/date are joined in from here.
#[derive(Debug, Clone)]
pub struct RpcHeaderData {
    pub block_time: DateTime<Utc>,
    pub block_date: NaiveDate,
    pub block_number: u64,
    pub block_hash: FixedBytes<32>,
}
