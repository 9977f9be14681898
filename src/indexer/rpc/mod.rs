pub mod blocks;
pub mod traces;
