use alloy_primitives::{Address, Bytes, FixedBytes};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::rpc::traces::CallType;

////////////////////////////////////// RPC Data ////////////////////////////////////////
// One flattened row per trace record. Action-specific fields are optional:
// calls fill `input`/`output`, creates fill `init`/`code`/`created_address`,
// rewards fill `reward_type` and leave the transaction fields empty.
#[derive(Debug, Clone)]
pub struct RpcTraceData {
    pub block_number: u64,
    pub block_hash: FixedBytes<32>,
    pub tx_hash: Option<FixedBytes<32>>,
    pub tx_position: Option<u64>,
    pub trace_type: String,
    pub trace_address: Vec<usize>,
    pub subtraces: usize,
    pub call_type: Option<CallType>,
    pub from_address: Option<Address>,
    pub to_address: Option<Address>,
    pub value: Option<String>,
    pub gas: Option<String>,
    pub gas_used: Option<String>,
    pub input: Option<Bytes>,
    pub output: Option<Bytes>,
    pub created_address: Option<Address>,
    pub code: Option<Bytes>,
    pub reward_type: Option<String>,
    pub error: Option<String>,
    /// Decoded `Error(string)` reason when the record reverted with an
    /// ABI-encoded payload
    pub revert_reason: Option<String>,
}

/////////////////////////////////// Transformed Data ///////////////////////////////////
#[derive(Debug, Clone, Serialize)]
pub struct TransformedTraceData {
    pub id: String,
    pub chain_id: u64,
    pub block_time: DateTime<Utc>,
    pub block_date: NaiveDate,
    pub block_number: u64,
    pub block_hash: FixedBytes<32>,
    pub tx_hash: Option<FixedBytes<32>>,
    pub tx_position: Option<u64>,
    pub trace_type: String,
    pub trace_address: Vec<usize>,
    pub subtraces: usize,
    pub call_type: Option<CallType>,
    pub from_address: Option<Address>,
    pub to_address: Option<Address>,
    pub value: Option<String>,
    pub gas: Option<String>,
    pub gas_used: Option<String>,
    pub input: Option<Bytes>,
    pub output: Option<Bytes>,
    pub created_address: Option<Address>,
    pub code: Option<Bytes>,
    pub reward_type: Option<String>,
    pub error: Option<String>,
    pub revert_reason: Option<String>,
}
