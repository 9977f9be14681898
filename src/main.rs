use alloy_eips::BlockNumberOrTag;
use alloy_network::AnyNetwork;
use alloy_provider::ProviderBuilder;
use anyhow::{anyhow, Result};
use opentelemetry::KeyValue;
use tokio::{signal, time::Instant};
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};
use url::Url;

use trace_indexer::indexer;
use trace_indexer::metrics::Metrics;
use trace_indexer::storage::NdjsonStorage;
use trace_indexer::utils::load_config;

const SLEEP_DURATION: u64 = 1000; // ms

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    println!();
    info!("=========================== INITIALIZING ===========================");

    // Load config
    let config = match load_config("config.yml") {
        Ok(config) => {
            info!("Config loaded successfully");
            config
        }
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(anyhow!(e));
        }
    };

    let chain_name = config.chain_name.to_owned();
    let chain_tip_buffer = config.chain_tip_buffer;
    let rpc = config.rpc_url.as_str();
    let metrics_enabled = config.metrics.enabled;

    // Initialize optional metrics
    let metrics = if metrics_enabled {
        Some(Metrics::new(chain_name.to_string())?)
    } else {
        info!("Metrics are disabled");
        None
    };

    // Start metrics server if metrics are enabled
    if let Some(metrics_instance) = &metrics {
        metrics_instance
            .start_metrics_server(&config.metrics.address, config.metrics.port)
            .await;
    }

    // Listen for Ctrl+C so the loop can finish the in-flight block first
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if let Ok(()) = signal::ctrl_c().await {
            info!("Received Ctrl+C signal, initiating shutdown...");
            let _ = shutdown_tx.send(true);
        }
    });

    // Set up the NDJSON output directory
    let storage = NdjsonStorage::new(&config.output_dir)?;

    // Resume from the last written block, or start from the configured one
    let mut block_number = match storage.last_processed_block()? {
        Some(last) => last + 1,
        None => config.start_block.unwrap_or(0),
    };

    info!("Starting block number: {:?}", block_number);

    // Create RPC provider
    let rpc_url: Url = rpc.parse()?;
    info!("RPC URL: {:?}", rpc);
    let provider = ProviderBuilder::new()
        .network::<AnyNetwork>()
        .on_http(rpc_url);

    // Get chain ID
    let chain_id = indexer::get_chain_id(&provider, metrics.as_ref()).await?;
    info!("Chain ID: {:?}", chain_id);

    println!();
    info!("========================= STARTING INDEXER =========================");

    loop {
        // Check for shutdown signal (non-blocking)
        if *shutdown_rx.borrow_and_update() {
            info!("Shutting down main processing loop...");
            break Ok(());
        }

        if let Some(end_block) = config.end_block {
            if block_number > end_block {
                info!("Reached end block {}, stopping", end_block);
                break Ok(());
            }
        }

        // Get latest block number, only used to stay clear of the tip:
        // trace_block on a block that later reorgs returns stale traces
        let latest_block = indexer::get_latest_block_number(&provider, metrics.as_ref())
            .await?
            .as_number()
            .ok_or_else(|| anyhow!("Expected a concrete block number"))?;

        info!("Block number to process: {:?}", block_number);

        // If indexer gets too close to tip, back off and retry
        if block_number > latest_block.saturating_sub(chain_tip_buffer) {
            info!(
                "Buffer limit reached. Waiting for current block to be {} blocks behind tip: {} - current distance: {} - sleeping for 1s",
                chain_tip_buffer,
                latest_block,
                latest_block.saturating_sub(block_number)
            );
            tokio::time::sleep(tokio::time::Duration::from_millis(SLEEP_DURATION)).await;
            continue;
        }

        // Start timing the block processing
        let block_start_time = Instant::now();

        let transformed_data = indexer::process_block(
            &provider,
            BlockNumberOrTag::Number(block_number),
            chain_id,
            metrics.as_ref(),
        )
        .await?;

        let trace_count = transformed_data.traces.len();
        if let Err(e) = storage.write_traces(block_number, &transformed_data.traces) {
            error!("Failed to write traces for block {}: {}", block_number, e);
            return Err(e);
        }

        // Calculate block processing duration
        let block_processing_duration = block_start_time.elapsed().as_secs_f64();

        // Update metrics
        if let Some(metrics_instance) = &metrics {
            metrics_instance.blocks_processed.add(
                1,
                &[KeyValue::new("chain", metrics_instance.chain_name.clone())],
            );
            metrics_instance.traces_extracted.add(
                trace_count as u64,
                &[KeyValue::new("chain", metrics_instance.chain_name.clone())],
            );
            metrics_instance.latest_processed_block.record(
                block_number,
                &[KeyValue::new("chain", metrics_instance.chain_name.clone())],
            );
            metrics_instance.latest_block_processing_time.record(
                block_processing_duration,
                &[KeyValue::new("chain", metrics_instance.chain_name.clone())],
            );
            metrics_instance.chain_tip_block.record(
                latest_block,
                &[KeyValue::new("chain", metrics_instance.chain_name.clone())],
            );
            metrics_instance.chain_tip_lag.record(
                latest_block.saturating_sub(block_number),
                &[KeyValue::new("chain", metrics_instance.chain_name.clone())],
            );
        }

        info!(
            "Block {} processed - {} traces in {:.2}s",
            block_number, trace_count, block_processing_duration
        );

        block_number += 1;
    }
}
