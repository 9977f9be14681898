use alloy_primitives::{Bytes, U256};
use anyhow::Result;

use crate::models::datasets::traces::RpcTraceData;
use crate::models::rpc::traces::{TraceAction, TraceOutput, TraceRecord};

/// Selector of Solidity's `Error(string)` revert encoding
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

pub trait TraceParser {
    fn parse_traces(self) -> Result<Vec<RpcTraceData>>;
}

impl TraceParser for Vec<TraceRecord> {
    fn parse_traces(self) -> Result<Vec<RpcTraceData>> {
        Ok(self.into_iter().map(flatten_trace_record).collect())
    }
}

// Spreads the action/result variants into one flat row
fn flatten_trace_record(record: TraceRecord) -> RpcTraceData {
    let mut data = RpcTraceData {
        block_number: record.block_number,
        block_hash: record.block_hash,
        tx_hash: record.transaction_hash,
        tx_position: record.transaction_position,
        trace_type: String::new(),
        trace_address: record.trace_address,
        subtraces: record.subtraces,
        call_type: None,
        from_address: None,
        to_address: None,
        value: None,
        gas: None,
        gas_used: None,
        input: None,
        output: None,
        created_address: None,
        code: None,
        reward_type: None,
        error: record.error,
        revert_reason: None,
    };

    match record.action {
        TraceAction::Call(call) => {
            data.trace_type = "call".to_string();
            data.call_type = Some(call.call_type);
            data.from_address = Some(call.from);
            data.to_address = Some(call.to);
            data.value = Some(call.value.to_string());
            data.gas = Some(call.gas.to_string());
            data.input = Some(call.input);
        }
        TraceAction::Create(create) => {
            data.trace_type = "create".to_string();
            data.from_address = Some(create.from);
            data.value = Some(create.value.to_string());
            data.gas = Some(create.gas.to_string());
            data.input = Some(create.init);
        }
        TraceAction::Suicide(suicide) => {
            data.trace_type = "suicide".to_string();
            data.from_address = Some(suicide.address);
            data.to_address = Some(suicide.refund_address);
            data.value = Some(suicide.balance.to_string());
        }
        TraceAction::Reward(reward) => {
            data.trace_type = "reward".to_string();
            data.to_address = Some(reward.author);
            data.value = Some(reward.value.to_string());
            data.reward_type = Some(reward.reward_type.as_str().to_string());
        }
    }

    match record.result {
        Some(TraceOutput::Call(output)) => {
            data.gas_used = Some(output.gas_used.to_string());
            if data.error.is_some() {
                data.revert_reason = decode_revert_reason(&output.output);
            }
            data.output = Some(output.output);
        }
        Some(TraceOutput::Create(output)) => {
            data.gas_used = Some(output.gas_used.to_string());
            data.created_address = Some(output.address);
            data.code = Some(output.code);
        }
        None => {}
    }

    data
}

/// Decode a Solidity `Error(string)` revert payload. Returns `None` for
/// empty output, other selectors (e.g. `Panic(uint256)` or custom errors)
/// and malformed encodings.
pub fn decode_revert_reason(output: &Bytes) -> Option<String> {
    let payload = output.strip_prefix(&ERROR_STRING_SELECTOR[..])?;
    if payload.len() < 64 {
        return None;
    }

    // Offset and length words are node-supplied, the bounds math must
    // not wrap
    let offset: usize = U256::from_be_slice(&payload[..32]).try_into().ok()?;
    let length_word = payload.get(offset..offset.checked_add(32)?)?;
    let length: usize = U256::from_be_slice(length_word).try_into().ok()?;
    let start = offset.checked_add(32)?;
    let reason = payload.get(start..start.checked_add(length)?)?;

    String::from_utf8(reason.to_vec()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{bytes, hex};

    #[test]
    fn decodes_error_string_payload() {
        // Error("Insufficient balance")
        let output = Bytes::from(hex!(
            "08c379a0"
            "0000000000000000000000000000000000000000000000000000000000000020"
            "0000000000000000000000000000000000000000000000000000000000000014"
            "496e73756666696369656e742062616c616e6365000000000000000000000000"
        ));
        assert_eq!(
            decode_revert_reason(&output).as_deref(),
            Some("Insufficient balance")
        );
    }

    #[test]
    fn rejects_non_error_payloads() {
        assert_eq!(decode_revert_reason(&Bytes::new()), None);
        // Panic(uint256) selector
        let panic = Bytes::from(hex!(
            "4e487b71"
            "0000000000000000000000000000000000000000000000000000000000000001"
        ));
        assert_eq!(decode_revert_reason(&panic), None);
        // Truncated Error(string)
        let truncated = bytes!("08c379a000000000000000000000000000000000");
        assert_eq!(decode_revert_reason(&truncated), None);
    }

    #[test]
    fn rejects_oversized_offset_and_length_words() {
        // An offset word near usize::MAX must fail the bounds check, not
        // wrap around when 32 is added to it
        let mut offset_word = [0u8; 32];
        offset_word[24..].copy_from_slice(&(u64::MAX - 16).to_be_bytes());
        let mut payload = ERROR_STRING_SELECTOR.to_vec();
        payload.extend_from_slice(&offset_word);
        payload.extend_from_slice(&[0u8; 32]);
        assert_eq!(decode_revert_reason(&Bytes::from(payload)), None);

        // Well-formed offset but a length word that would push the string
        // slice past usize::MAX
        let mut length_word = [0u8; 32];
        length_word[24..].copy_from_slice(&(u64::MAX - 40).to_be_bytes());
        let mut payload = ERROR_STRING_SELECTOR.to_vec();
        payload.extend_from_slice(&hex!(
            "0000000000000000000000000000000000000000000000000000000000000020"
        ));
        payload.extend_from_slice(&length_word);
        assert_eq!(decode_revert_reason(&Bytes::from(payload)), None);
    }
}
