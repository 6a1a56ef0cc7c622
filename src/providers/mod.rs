pub mod feed;
pub mod simulated;

pub use feed::HttpPriceFeed;
pub use simulated::{FixedPriceSource, SpotVenue};
