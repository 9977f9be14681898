use alloy_primitives::U256;

use trace_indexer::indexer::tree::{
    check_block_consistency, filter_out_errored_traces, next_traces, previous_trace, sort_traces,
};
use trace_indexer::models::rpc::traces::{CallType, TraceAction, TraceRecord};

const BLOCK_2191709: &str = include_str!("fixtures/trace_block_2191709.json");
const BLOCK_13191781: &str = include_str!("fixtures/trace_block_13191781.json");
const BLOCK_15630274: &str = include_str!("fixtures/trace_block_15630274.json");

fn fixtures() -> Vec<(u64, Vec<TraceRecord>)> {
    [
        (2191709, BLOCK_2191709),
        (13191781, BLOCK_13191781),
        (15630274, BLOCK_15630274),
    ]
    .into_iter()
    .map(|(block_number, raw)| {
        let traces: Vec<TraceRecord> =
            serde_json::from_str(raw).expect("fixture should deserialize");
        (block_number, traces)
    })
    .collect()
}

#[test]
fn fixtures_are_structurally_consistent() {
    for (block_number, traces) in fixtures() {
        assert!(!traces.is_empty());
        for trace in &traces {
            assert_eq!(trace.block_number, block_number);
        }
        check_block_consistency(&traces, block_number)
            .unwrap_or_else(|e| panic!("block {block_number}: {e}"));
    }
}

#[test]
fn reward_records_are_block_level() {
    for (block_number, traces) in fixtures() {
        for trace in traces.iter().filter(|t| t.action.is_reward()) {
            assert!(trace.transaction_hash.is_none(), "block {block_number}");
            assert!(trace.transaction_position.is_none(), "block {block_number}");
            assert!(trace.result.is_none(), "block {block_number}");
            assert!(trace.trace_address.is_empty(), "block {block_number}");
        }
    }

    // The pre-merge blocks carry a miner reward, the post-merge one none
    let reward_counts: Vec<usize> = fixtures()
        .iter()
        .map(|(_, traces)| traces.iter().filter(|t| t.action.is_reward()).count())
        .collect();
    assert_eq!(reward_counts, vec![1, 1, 0]);
}

#[test]
fn call_and_create_records_carry_results() {
    for (_, traces) in fixtures() {
        for trace in &traces {
            match &trace.action {
                TraceAction::Call(_) | TraceAction::Create(_) => {
                    // Even a reverted call keeps its result: gasUsed plus
                    // the ABI-encoded revert payload in `output`
                    assert!(trace.result.is_some());
                }
                _ => {}
            }
        }
    }
}

#[test]
fn round_trip_reproduces_fixture_json() {
    for (block_number, raw) in [
        (2191709u64, BLOCK_2191709),
        (13191781, BLOCK_13191781),
        (15630274, BLOCK_15630274),
    ] {
        let original: serde_json::Value = serde_json::from_str(raw).unwrap();
        let traces: Vec<TraceRecord> = serde_json::from_str(raw).unwrap();
        let encoded = serde_json::to_value(&traces).unwrap();
        assert_eq!(encoded, original, "block {block_number} round trip");
    }
}

#[test]
fn fixture_order_is_execution_order() {
    for (block_number, traces) in fixtures() {
        let mut sorted = traces.clone();
        sort_traces(&mut sorted);
        assert_eq!(sorted, traces, "block {block_number} should already be sorted");
    }
}

// The 0x8888796b… transaction in block 2191709 is a top-level, leaf ETH
// transfer: no child calls, nothing references a traceAddress below it.
#[test]
fn top_level_transfer_is_a_leaf() {
    let (_, traces) = fixtures().remove(0);

    let transfer = traces
        .iter()
        .find(|t| {
            t.transaction_hash
                .is_some_and(|h| h.to_string().starts_with("0x8888796b"))
        })
        .expect("transfer tx should be present");

    assert!(transfer.trace_address.is_empty());
    assert_eq!(transfer.subtraces, 0);
    match &transfer.action {
        TraceAction::Call(call) => {
            assert_eq!(call.value, U256::from(1000801159649151900u64));
            assert_eq!(call.call_type, CallType::Call);
            assert!(call.input.is_empty());
        }
        other => panic!("expected a call action, got {other:?}"),
    }

    // No other record of this transaction exists at all
    let same_tx = traces
        .iter()
        .filter(|t| t.transaction_hash == transfer.transaction_hash)
        .count();
    assert_eq!(same_tx, 1);
}

#[test]
fn errored_subtree_is_filtered_from_block_13191781() {
    let (_, traces) = fixtures().remove(1);

    let reverted = traces
        .iter()
        .find(|t| t.error.is_some())
        .expect("fixture contains a reverted call");
    assert_eq!(reverted.error.as_deref(), Some("Reverted"));
    assert_eq!(reverted.trace_address, vec![1]);

    let tx_hash = reverted.transaction_hash;
    let tx_traces: Vec<TraceRecord> = traces
        .iter()
        .filter(|t| t.transaction_hash == tx_hash)
        .cloned()
        .collect();
    assert_eq!(tx_traces.len(), 4);

    let filtered = filter_out_errored_traces(&tx_traces);
    let addresses: Vec<_> = filtered.iter().map(|t| t.trace_address.clone()).collect();
    // [1] errored, so [1] and its descendant [1, 0] are gone
    assert_eq!(addresses, vec![Vec::<usize>::new(), vec![0]]);
}

#[test]
fn tree_navigation_follows_delegatecall_semantics() {
    let (_, traces) = fixtures().remove(2);
    let tx_traces: Vec<TraceRecord> = traces
        .iter()
        .filter(|t| t.transaction_hash.is_some())
        .cloned()
        .collect();

    // Direct parent of [0, 0] is the delegatecall frame [0]
    let parent = previous_trace(&tx_traces, &[0, 0], 1, false).unwrap();
    assert_eq!(parent.trace_address, vec![0]);
    assert_eq!(parent.call_type(), Some(CallType::DelegateCall));

    // Skipping delegatecalls resolves to the proxy's own frame
    let context_parent = previous_trace(&tx_traces, &[0, 0], 1, true).unwrap();
    assert!(context_parent.trace_address.is_empty());

    // Root has the delegatecall and the create as direct children
    let children = next_traces(&tx_traces, &[], false, false);
    assert_eq!(children.len(), 2);
    assert!(children[0].call_type() == Some(CallType::DelegateCall));
    assert!(children[1].action.is_create());

    // Removing delegatecalls leaves just the create
    let without_delegate = next_traces(&tx_traces, &[], true, false);
    assert_eq!(without_delegate.len(), 1);
    assert!(without_delegate[0].action.is_create());
}

#[test]
fn suicide_records_parse_with_null_result() {
    // Shape taken from the trace_filter docs of the original node client
    let json = serde_json::json!({
        "action": {
            "address": "0x4440adafbc6c4e45c299451c0eedc7c8b98c14ac",
            "balance": "0x0",
            "refundAddress": "0x0000000000000000000000000000000000000000"
        },
        "blockHash": "0x8512d367492371edf44ebcbbbd935bc434946dddc2b126cb558df5906012186c",
        "blockNumber": 7829689,
        "result": null,
        "subtraces": 0,
        "traceAddress": [0, 0, 0, 0, 0, 0],
        "transactionHash": "0x5f7af6aa390f9f8dd79ee692c37cbde76bb7869768b1bac438b6d176c94f637d",
        "transactionPosition": 35,
        "type": "suicide"
    });

    let record: TraceRecord = serde_json::from_value(json.clone()).unwrap();
    assert!(matches!(record.action, TraceAction::Suicide(_)));
    assert!(record.result.is_none());
    assert_eq!(serde_json::to_value(&record).unwrap(), json);
}
