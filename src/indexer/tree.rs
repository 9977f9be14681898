//! Call-tree operations over the flat trace lists returned by
//! `trace_block` / `trace_transaction`.
//!
//! A record's `traceAddress` is its path from the transaction's root call:
//! child indices at each depth, `[]` for the root. Nodes return records in
//! ascending `traceAddress` order, which is also execution order.

use anyhow::Result;

use crate::models::errors::TraceError;
use crate::models::rpc::traces::{CallType, TraceRecord};

/// Filter out errored traces and all of their descendants.
///
/// Expects the traces of a single transaction, sorted ascending by
/// `traceAddress` (the order nodes return them in).
pub fn filter_out_errored_traces(traces: &[TraceRecord]) -> Vec<TraceRecord> {
    let mut filtered = Vec::with_capacity(traces.len());
    let mut errored_trace_address: Option<&[usize]> = None;
    for trace in traces {
        if trace.error.is_some() {
            errored_trace_address = Some(&trace.trace_address);
        } else if errored_trace_address
            .is_some_and(|errored| trace.trace_address.starts_with(errored))
        {
            // Descendant of an errored frame, its effects were reverted too
            continue;
        } else {
            filtered.push(trace.clone());
        }
    }
    filtered
}

/// Find an ancestor of the trace at `trace_address`.
///
/// `number_traces` is how many levels to walk up, 1 being the direct
/// parent. With `skip_delegate_calls` delegatecall frames are stepped
/// over, since they execute in the caller's storage context.
pub fn previous_trace<'a>(
    traces: &'a [TraceRecord],
    trace_address: &[usize],
    number_traces: usize,
    skip_delegate_calls: bool,
) -> Option<&'a TraceRecord> {
    if trace_address.len() < number_traces {
        return None;
    }

    let mut target = &trace_address[..trace_address.len() - number_traces];
    for trace in traces.iter().rev() {
        if trace.trace_address == target {
            if skip_delegate_calls && trace.call_type() == Some(CallType::DelegateCall) {
                if target.is_empty() {
                    return None;
                }
                target = &target[..target.len() - 1];
            } else {
                return Some(trace);
            }
        }
    }
    None
}

/// Direct children of the trace at `trace_address`, e.g. for `[0, 1]`
/// every trace at `[0, 1, x]`.
pub fn next_traces<'a>(
    traces: &'a [TraceRecord],
    trace_address: &[usize],
    remove_delegate_calls: bool,
    remove_calls: bool,
) -> Vec<&'a TraceRecord> {
    traces
        .iter()
        .filter(|trace| {
            trace.trace_address.len() == trace_address.len() + 1
                && trace.trace_address[..trace_address.len()] == *trace_address
        })
        .filter(|trace| {
            if remove_delegate_calls && trace.call_type() == Some(CallType::DelegateCall) {
                false
            } else if remove_calls && trace.call_type() == Some(CallType::Call) {
                false
            } else {
                true
            }
        })
        .collect()
}

/// Sort traces into execution order: by transaction position (block-level
/// reward records last), then lexicographically by `traceAddress`.
pub fn sort_traces(traces: &mut [TraceRecord]) {
    traces.sort_by(|a, b| {
        let a_pos = (a.transaction_position.is_none(), a.transaction_position);
        let b_pos = (b.transaction_position.is_none(), b.transaction_position);
        a_pos
            .cmp(&b_pos)
            .then_with(|| a.trace_address.cmp(&b.trace_address))
    });
}

/// Validate the structural invariants of one block's trace list.
///
/// - every record carries `block_number`
/// - reward records have no transaction fields and a null result
/// - `subtraces` matches the number of direct children
pub fn check_block_consistency(traces: &[TraceRecord], block_number: u64) -> Result<()> {
    for trace in traces {
        if trace.block_number != block_number {
            return Err(TraceError::BlockNumberMismatch {
                expected: block_number,
                got: trace.block_number,
            }
            .into());
        }

        if trace.action.is_reward()
            && (trace.transaction_hash.is_some() || trace.transaction_position.is_some())
        {
            return Err(TraceError::RewardWithTransactionFields.into());
        }

        let children = traces.iter().filter(|other| trace.is_parent_of(other)).count();
        if trace.is_transaction_level() && children != trace.subtraces {
            return Err(TraceError::SubtraceCountMismatch {
                trace_address: trace.trace_address.clone(),
                subtraces: trace.subtraces,
                children,
            }
            .into());
        }
    }
    Ok(())
}
