pub mod protocol;
pub mod readings;
pub mod risk_score;

pub use protocol::*;
pub use readings::*;
pub use risk_score::*;
