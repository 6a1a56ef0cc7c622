//! Core business logic abstractions

pub mod amount;
pub mod clock;
pub mod config;
pub mod error;
pub mod fund;
pub mod log;
pub mod price;
pub mod rates;
pub mod registry;
pub mod tokens;
pub mod venue;

// Re-export main types for cleaner imports
pub use clock::{Clock, SystemClock};
pub use error::{LedgerError, LedgerResult};
pub use fund::{FundLedger, FundParams};
pub use price::{PricePoint, PriceSource};
pub use rates::SwapRateCache;
pub use registry::{BasketAsset, BasketRegistry};
pub use tokens::{MemoryTokens, TokenBank};
pub use venue::ExecutionVenue;
