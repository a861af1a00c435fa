pub mod environment;
pub mod soil;
pub mod thresholds;
