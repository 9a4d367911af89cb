pub mod cancel;
pub mod controller;
pub mod state;

pub use cancel::*;
pub use controller::*;
pub use state::*;
