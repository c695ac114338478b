pub mod money;
pub mod stats;
