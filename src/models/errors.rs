use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("trace_filter requires at least one of `from_address` or `to_address`")]
    MissingAddressFilter,
    #[error("Trace at address {trace_address:?} has subtraces={subtraces} but {children} direct children")]
    SubtraceCountMismatch {
        trace_address: Vec<usize>,
        subtraces: usize,
        children: usize,
    },
    #[error("Block {expected} contains a trace for block {got}")]
    BlockNumberMismatch { expected: u64, got: u64 },
    #[error("Reward trace carries transaction-level fields")]
    RewardWithTransactionFields,
}
