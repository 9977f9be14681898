use serde::{Deserialize, Serialize};

use crate::models::datasets::blocks::RpcHeaderData;
use crate::models::datasets::traces::{RpcTraceData, TransformedTraceData};

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    pub chain_name: String,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    pub chain_tip_buffer: u64,
    pub rpc_url: String,
    pub output_dir: String,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone)]
pub struct ParsedData {
    pub chain_id: u64,
    pub header: Vec<RpcHeaderData>,
    pub traces: Vec<RpcTraceData>,
}

#[derive(Debug)]
pub struct TransformedData {
    pub traces: Vec<TransformedTraceData>,
}
