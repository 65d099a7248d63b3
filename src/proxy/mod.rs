//! Allow-listed forwarding of console calls to DynamoDB.

pub mod client;
pub mod contract;
pub mod dispatch;
pub mod dynamo;
pub mod operation;
pub mod wire;

pub use client::{ClientProvider, DataClient, RegionalClients, SingleClient, UpstreamError};
pub use dispatch::{DemoPolicy, Dispatcher, Envelope, ProxyRequest};
pub use dynamo::DynamoClient;
pub use operation::Operation;
