use alloy_primitives::FixedBytes;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

use crate::models::datasets::traces::{RpcTraceData, TransformedTraceData};

pub trait TraceTransformer {
    fn transform_traces(
        traces: Vec<RpcTraceData>,
        chain_id: u64,
        block_map: &HashMap<u64, (DateTime<Utc>, NaiveDate, FixedBytes<32>)>,
    ) -> Result<Vec<TransformedTraceData>>;
}

impl TraceTransformer for RpcTraceData {
    fn transform_traces(
        traces: Vec<RpcTraceData>,
        chain_id: u64,
        block_map: &HashMap<u64, (DateTime<Utc>, NaiveDate, FixedBytes<32>)>,
    ) -> Result<Vec<TransformedTraceData>> {
        Ok(traces
            .into_iter()
            .map(|trace| {
                // Reward records have no transaction hash, key them by block
                let scope = match trace.tx_hash {
                    Some(tx_hash) => tx_hash.to_string(),
                    None => format!("block_{}", trace.block_number),
                };
                let id = if trace.trace_address.is_empty() {
                    format!("trace_{}_{}_{}", chain_id, scope, trace.trace_type)
                } else {
                    format!(
                        "trace_{}_{}_{}_{}",
                        chain_id,
                        scope,
                        trace.trace_type,
                        trace
                            .trace_address
                            .iter()
                            .map(|&x| x.to_string())
                            .collect::<Vec<String>>()
                            .join("_")
                    )
                };

                let (block_time, block_date) = block_map
                    .get(&trace.block_number)
                    .map(|(time, date, _)| (*time, *date))
                    .unwrap_or_default();

                TransformedTraceData {
                    id,
                    chain_id,
                    block_time,
                    block_date,
                    block_number: trace.block_number,
                    block_hash: trace.block_hash,
                    tx_hash: trace.tx_hash,
                    tx_position: trace.tx_position,
                    trace_type: trace.trace_type,
                    trace_address: trace.trace_address,
                    subtraces: trace.subtraces,
                    call_type: trace.call_type,
                    from_address: trace.from_address,
                    to_address: trace.to_address,
                    value: trace.value,
                    gas: trace.gas,
                    gas_used: trace.gas_used,
                    input: trace.input,
                    output: trace.output,
                    created_address: trace.created_address,
                    code: trace.code,
                    reward_type: trace.reward_type,
                    error: trace.error,
                    revert_reason: trace.revert_reason,
                }
            })
            .collect())
    }
}
