pub mod caching;
pub mod logging;
pub mod metrics;
pub mod time;

pub use caching::*;
pub use logging::*;
pub use metrics::*;
pub use time::*;
