// Retailer Price Comparison - HTTP server
//
// Serves GET /api/compare on top of compare-core: request gate, result cache,
// then a live browser-driven comparison on a miss.

pub mod config;
pub mod server;

pub use config::*;
