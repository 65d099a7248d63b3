//! Backend for a browser DynamoDB console: an allow-listed request proxy,
//! a static file server for the console bundle, the grid projector that
//! turns items into table rows, and saved connection profiles.

pub mod config;
pub mod error;
pub mod logging;
pub mod projector;
pub mod proxy;
pub mod record;
pub mod server;
pub mod session;
pub mod static_files;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8001";

/// Request header selecting the DynamoDB region for a proxied call.
pub const REGION_HEADER: &str = "x-region";

pub use projector::{project, Cell, Grid, KeySchema};
pub use record::{Attr, Record};
