pub mod rpc;
pub mod transformations;
pub mod tree;

use alloy_eips::BlockNumberOrTag;
use alloy_network::{primitives::BlockTransactionsKind, AnyRpcBlock, Network};
use alloy_primitives::FixedBytes;
use alloy_provider::Provider;
use alloy_transport::Transport;
use anyhow::{anyhow, Result};
use opentelemetry::KeyValue;
use std::collections::HashMap;
use tracing::warn;

use crate::indexer::rpc::{blocks::BlockParser, traces::TraceParser};
use crate::indexer::transformations::traces::TraceTransformer;
use crate::metrics::Metrics;
use crate::models::common::{ParsedData, TransformedData};
use crate::models::datasets::traces::RpcTraceData;
use crate::models::errors::TraceError;
use crate::models::rpc::traces::{TraceFilterParams, TraceRecord};
use crate::utils::rate_limiter::RequestLimiter;
use crate::utils::retry::{retry, RetryConfig};

// Max in-flight requests for the batched trace fetchers
const TRACE_CONCURRENCY: usize = 10;

fn record_request(metrics: Option<&Metrics>, method: &'static str) {
    if let Some(metrics) = metrics {
        metrics.rpc_requests.add(
            1,
            &[
                KeyValue::new("chain", metrics.chain_name.clone()),
                KeyValue::new("method", method),
            ],
        );
    }
}

fn record_latency(metrics: Option<&Metrics>, method: &'static str, seconds: f64, errored: bool) {
    if let Some(metrics) = metrics {
        metrics.rpc_latency.record(
            seconds,
            &[
                KeyValue::new("chain", metrics.chain_name.clone()),
                KeyValue::new("method", method),
            ],
        );
        if errored {
            metrics.rpc_errors.add(
                1,
                &[
                    KeyValue::new("chain", metrics.chain_name.clone()),
                    KeyValue::new("method", method),
                ],
            );
        }
    }
}

pub async fn get_chain_id<T, N>(
    provider: &impl Provider<T, N>,
    metrics: Option<&Metrics>,
) -> Result<u64>
where
    T: Transport + Clone,
    N: Network,
{
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();
            record_request(metrics, "get_chain_id");

            let result = provider.get_chain_id().await;
            record_latency(metrics, "get_chain_id", start.elapsed().as_secs_f64(), result.is_err());

            result.map_err(|e| {
                warn!("Failed to get chain ID. Error details:\n{:#?}", e);
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "get_chain_id",
    )
    .await
}

pub async fn get_latest_block_number<T, N>(
    provider: &impl Provider<T, N>,
    metrics: Option<&Metrics>,
) -> Result<BlockNumberOrTag>
where
    T: Transport + Clone,
    N: Network,
{
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();
            record_request(metrics, "get_latest_block_number");

            let result = provider.get_block_number().await;
            record_latency(
                metrics,
                "get_latest_block_number",
                start.elapsed().as_secs_f64(),
                result.is_err(),
            );

            result
                .map_err(|e| {
                    warn!("Failed to get latest block number. Error details:\n{:#?}", e);
                    anyhow!("RPC error: {}", e)
                })
                .map(BlockNumberOrTag::Number)
        },
        &retry_config,
        "get_latest_block_number",
    )
    .await
}

/// Fetch a block header. Transaction bodies are not needed by the trace
/// pipeline, so only hashes are requested.
pub async fn get_block_by_number<T, N>(
    provider: &impl Provider<T, N>,
    block_number: BlockNumberOrTag,
    metrics: Option<&Metrics>,
) -> Result<Option<N::BlockResponse>>
where
    T: Transport + Clone,
    N: Network,
{
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();
            record_request(metrics, "get_block_by_number");

            let result = provider
                .get_block_by_number(block_number, BlockTransactionsKind::Hashes)
                .await;
            record_latency(
                metrics,
                "get_block_by_number",
                start.elapsed().as_secs_f64(),
                result.is_err(),
            );

            result.map_err(|e| {
                warn!(
                    "Failed to get block by number {}. Error details:\n{:#?}",
                    block_number, e
                );
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "get_block_by_number",
    )
    .await
}

/// Fetch all traces of a block via the `trace_block` RPC method. Returns
/// the node's flat record list: per-transaction call trees in execution
/// order followed by block-level reward records.
pub async fn trace_block<T, N>(
    provider: &impl Provider<T, N>,
    block_number: BlockNumberOrTag,
    metrics: Option<&Metrics>,
) -> Result<Vec<TraceRecord>>
where
    T: Transport + Clone,
    N: Network,
{
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();
            record_request(metrics, "trace_block");

            let result: Result<Vec<TraceRecord>, _> = provider
                .raw_request("trace_block".into(), (block_number,))
                .await;
            record_latency(metrics, "trace_block", start.elapsed().as_secs_f64(), result.is_err());

            result.map_err(|e| {
                warn!(
                    "Failed to trace block {}. Error details:\n{:#?}",
                    block_number, e
                );
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "trace_block",
    )
    .await
}

/// Fetch traces for several blocks concurrently, at most
/// [`TRACE_CONCURRENCY`] requests in flight. Results keep the order of
/// `block_numbers`.
pub async fn trace_blocks<T, N>(
    provider: &impl Provider<T, N>,
    block_numbers: &[u64],
    metrics: Option<&Metrics>,
) -> Result<Vec<Vec<TraceRecord>>>
where
    T: Transport + Clone,
    N: Network,
{
    let limiter = RequestLimiter::new(TRACE_CONCURRENCY);

    let futures = block_numbers.iter().map(|&block_number| {
        let limiter = &limiter;
        async move {
            let _permit = limiter.acquire().await?;
            trace_block(provider, BlockNumberOrTag::Number(block_number), metrics).await
        }
    });

    futures::future::join_all(futures).await.into_iter().collect()
}

/// Fetch the internal transactions of `tx_hash` via `trace_transaction`.
pub async fn trace_transaction<T, N>(
    provider: &impl Provider<T, N>,
    tx_hash: FixedBytes<32>,
    metrics: Option<&Metrics>,
) -> Result<Vec<TraceRecord>>
where
    T: Transport + Clone,
    N: Network,
{
    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();
            record_request(metrics, "trace_transaction");

            let result: Result<Vec<TraceRecord>, _> = provider
                .raw_request("trace_transaction".into(), (tx_hash,))
                .await;
            record_latency(
                metrics,
                "trace_transaction",
                start.elapsed().as_secs_f64(),
                result.is_err(),
            );

            result.map_err(|e| {
                warn!(
                    "Failed to trace transaction {}. Error details:\n{:#?}",
                    tx_hash, e
                );
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "trace_transaction",
    )
    .await
}

/// Fetch traces for several transactions concurrently. Results keep the
/// order of `tx_hashes`.
pub async fn trace_transactions<T, N>(
    provider: &impl Provider<T, N>,
    tx_hashes: &[FixedBytes<32>],
    metrics: Option<&Metrics>,
) -> Result<Vec<Vec<TraceRecord>>>
where
    T: Transport + Clone,
    N: Network,
{
    let limiter = RequestLimiter::new(TRACE_CONCURRENCY);

    let futures = tx_hashes.iter().map(|&tx_hash| {
        let limiter = &limiter;
        async move {
            let _permit = limiter.acquire().await?;
            trace_transaction(provider, tx_hash, metrics).await
        }
    });

    futures::future::join_all(futures).await.into_iter().collect()
}

/// Query traces by address via the `trace_filter` RPC method. At least one
/// of `from_address`/`to_address` must be set, unfiltered scans are
/// rejected by most nodes.
pub async fn trace_filter<T, N>(
    provider: &impl Provider<T, N>,
    params: &TraceFilterParams,
    metrics: Option<&Metrics>,
) -> Result<Vec<TraceRecord>>
where
    T: Transport + Clone,
    N: Network,
{
    if params.from_address.is_empty() && params.to_address.is_empty() {
        return Err(TraceError::MissingAddressFilter.into());
    }

    let retry_config = RetryConfig::default();
    retry(
        || async {
            let start = std::time::Instant::now();
            record_request(metrics, "trace_filter");

            let result: Result<Vec<TraceRecord>, _> = provider
                .raw_request("trace_filter".into(), (params.clone(),))
                .await;
            record_latency(metrics, "trace_filter", start.elapsed().as_secs_f64(), result.is_err());

            result.map_err(|e| {
                warn!("Failed to filter traces. Error details:\n{:#?}", e);
                anyhow!("RPC error: {}", e)
            })
        },
        &retry_config,
        "trace_filter",
    )
    .await
}

/// Fetch the transaction's traces and return the ancestor of the trace at
/// `trace_address`. See [`tree::previous_trace`].
pub async fn get_previous_trace<T, N>(
    provider: &impl Provider<T, N>,
    tx_hash: FixedBytes<32>,
    trace_address: &[usize],
    number_traces: usize,
    skip_delegate_calls: bool,
    metrics: Option<&Metrics>,
) -> Result<Option<TraceRecord>>
where
    T: Transport + Clone,
    N: Network,
{
    let traces = trace_transaction(provider, tx_hash, metrics).await?;
    Ok(tree::previous_trace(&traces, trace_address, number_traces, skip_delegate_calls).cloned())
}

/// Fetch the transaction's traces and return the direct children of the
/// trace at `trace_address`. See [`tree::next_traces`].
pub async fn get_next_traces<T, N>(
    provider: &impl Provider<T, N>,
    tx_hash: FixedBytes<32>,
    trace_address: &[usize],
    remove_delegate_calls: bool,
    remove_calls: bool,
    metrics: Option<&Metrics>,
) -> Result<Vec<TraceRecord>>
where
    T: Transport + Clone,
    N: Network,
{
    let traces = trace_transaction(provider, tx_hash, metrics).await?;
    Ok(
        tree::next_traces(&traces, trace_address, remove_delegate_calls, remove_calls)
            .into_iter()
            .cloned()
            .collect(),
    )
}

/// Validate a block's trace list and flatten it into per-record rows.
pub async fn parse_data(
    chain_id: u64,
    block_number: u64,
    block: Option<AnyRpcBlock>,
    traces: Vec<TraceRecord>,
) -> Result<ParsedData> {
    let header = if let Some(block) = &block {
        block.parse_header()?
    } else {
        vec![]
    };

    tree::check_block_consistency(&traces, block_number)?;
    let traces = traces.parse_traces()?;

    Ok(ParsedData {
        chain_id,
        header,
        traces,
    })
}

/// Join block time/date onto the flattened rows and assign record ids.
pub async fn transform_data(parsed_data: ParsedData) -> Result<TransformedData> {
    let ParsedData {
        chain_id,
        header,
        traces,
    } = parsed_data;

    let block_map: HashMap<_, _> = header
        .iter()
        .map(|header| {
            (
                header.block_number,
                (header.block_time, header.block_date, header.block_hash),
            )
        })
        .collect();

    let traces =
        <RpcTraceData as TraceTransformer>::transform_traces(traces, chain_id, &block_map)?;

    Ok(TransformedData { traces })
}

/// Fetch, parse and transform one block's traces.
pub async fn process_block<T, N>(
    provider: &impl Provider<T, N>,
    block_number: BlockNumberOrTag,
    chain_id: u64,
    metrics: Option<&Metrics>,
) -> Result<TransformedData>
where
    T: Transport + Clone,
    N: Network<BlockResponse = AnyRpcBlock>,
{
    let block = get_block_by_number(provider, block_number, metrics)
        .await?
        .ok_or_else(|| anyhow!("Provider returned no block"))?;

    let traces = trace_block(provider, block_number, metrics).await?;

    let parsed_data = parse_data(
        chain_id,
        block_number
            .as_number()
            .ok_or_else(|| anyhow!("Expected a concrete block number"))?,
        Some(block),
        traces,
    )
    .await?;

    transform_data(parsed_data).await
}
