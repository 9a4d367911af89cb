pub mod analysis;
pub mod enums;
pub mod extraction;
pub mod vital_sign;

pub use analysis::*;
pub use enums::*;
pub use extraction::*;
pub use vital_sign::*;
