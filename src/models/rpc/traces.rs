use alloy_primitives::{Address, Bytes, FixedBytes, U256};
use serde::{Deserialize, Serialize};

/// One record of the flat trace list returned by the `trace_block`,
/// `trace_transaction` and `trace_filter` RPC methods.
///
/// Field names mirror the wire format exactly (camelCase JSON keys).
/// `gas`, `value` and `gasUsed` are 0x-prefixed hex quantities, while
/// `blockNumber`, `subtraces` and `transactionPosition` are plain JSON
/// integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    #[serde(flatten)]
    pub action: TraceAction,
    pub block_hash: FixedBytes<32>,
    pub block_number: u64,
    /// `None` for reward and suicide records, and for calls that errored.
    /// Serialized as an explicit `null` in those cases.
    pub result: Option<TraceOutput>,
    pub subtraces: usize,
    pub trace_address: Vec<usize>,
    /// Absent (not `null`) for block-level reward records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<FixedBytes<32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_position: Option<u64>,
    /// Revert/failure reason, e.g. `"Reverted"` or `"Out of gas"`. When
    /// present, any `output` bytes hold the ABI-encoded revert payload
    /// instead of a return value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceRecord {
    /// Whether this record belongs to a transaction (calls and creates)
    /// as opposed to block-level records (rewards).
    pub fn is_transaction_level(&self) -> bool {
        self.transaction_hash.is_some()
    }

    /// Whether `other` is a direct child of this record in the call tree.
    pub fn is_parent_of(&self, other: &TraceRecord) -> bool {
        self.transaction_hash == other.transaction_hash
            && other.trace_address.len() == self.trace_address.len() + 1
            && other.trace_address[..self.trace_address.len()] == self.trace_address[..]
    }

    /// The `callType` of the action, if it is a call.
    pub fn call_type(&self) -> Option<CallType> {
        match &self.action {
            TraceAction::Call(call) => Some(call.call_type),
            _ => None,
        }
    }
}

/// The `action` payload, discriminated by the sibling `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "action")]
pub enum TraceAction {
    Call(CallAction),
    Create(CreateAction),
    /// Parity never renamed suicide to selfdestruct on the wire.
    #[serde(rename = "suicide", alias = "selfdestruct")]
    Suicide(SuicideAction),
    Reward(RewardAction),
}

impl TraceAction {
    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call(_))
    }

    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }

    pub fn is_reward(&self) -> bool {
        matches!(self, Self::Reward(_))
    }
}

/// Message call (CALL/CALLCODE/DELEGATECALL/STATICCALL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAction {
    pub from: Address,
    pub to: Address,
    pub gas: U256,
    /// Value transferred, in wei. Always zero for delegatecall/staticcall.
    pub value: U256,
    pub call_type: CallType,
    /// ABI-encoded call data
    pub input: Bytes,
}

/// Contract creation. Carries `init` code instead of `input`; the matching
/// result carries the deployed `address` and `code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAction {
    pub from: Address,
    pub gas: U256,
    pub value: U256,
    pub init: Bytes,
}

/// SELFDESTRUCT record. Has no `to`/`value`/`gas` and a null result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuicideAction {
    pub address: Address,
    pub balance: U256,
    pub refund_address: Address,
}

/// Block-level miner/uncle reward record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardAction {
    pub author: Address,
    pub value: U256,
    pub reward_type: RewardType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    Block,
    Uncle,
}

impl RewardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Uncle => "uncle",
        }
    }
}

/// Successful outcome of a call or create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TraceOutput {
    Call(CallOutput),
    Create(CreateOutput),
}

impl TraceOutput {
    pub fn gas_used(&self) -> U256 {
        match self {
            Self::Call(output) => output.gas_used,
            Self::Create(output) => output.gas_used,
        }
    }

    /// Return data of a call, `None` for creates.
    pub fn output(&self) -> Option<&Bytes> {
        match self {
            Self::Call(output) => Some(&output.output),
            Self::Create(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutput {
    pub gas_used: U256,
    pub output: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutput {
    pub gas_used: U256,
    pub code: Bytes,
    pub address: Address,
}

/// Parameters for the `trace_filter` RPC method. Block numbers are hex
/// quantities on the wire; `after`/`count` are plain integers.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceFilterParams {
    #[serde(skip_serializing_if = "Option::is_none", with = "alloy_serde::quantity::opt")]
    pub from_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", with = "alloy_serde::quantity::opt")]
    pub to_block: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub from_address: Vec<Address>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub to_address: Vec<Address>,
    /// Offset trace number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<u64>,
    /// Number of traces to return in a batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}
