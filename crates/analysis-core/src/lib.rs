pub mod amount;
pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

pub use amount::{parse_amount, parse_reported_amount};
pub use error::*;
pub use traits::*;
pub use types::*;
