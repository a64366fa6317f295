pub mod fixed;
pub mod http;

pub use fixed::StaticReliabilityFeed;
pub use http::HttpReliabilityFeed;
