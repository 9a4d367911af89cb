pub mod aggregate;
pub mod keywords;
pub mod reference;
pub mod vitals;

pub use aggregate::*;
pub use keywords::*;
pub use reference::*;
pub use vitals::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntelligenceError {
    #[error("Failed to load threshold table from {0}: {1}")]
    ThresholdLoad(String, String),

    #[error("Failed to parse threshold table: {0}")]
    ThresholdParse(String),

    #[error("Threshold tiers out of order for {0}")]
    InvalidThresholds(String),
}
