//! The data-service seam: one typed method per proxied operation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::SdkConfig;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::contract::{
    CreateTableInput, DeleteItemInput, DescribeTableOutput, DescribeTimeToLiveOutput,
    ItemWriteOutput, ItemsOutput, ListTablesInput, ListTablesOutput, PutItemInput, QueryInput,
    ScanInput, TableDescriptionOutput, TableNameInput, UpdateTableInput, UpdateTimeToLiveInput,
    UpdateTimeToLiveOutput,
};
use super::dynamo::DynamoClient;

/// Error reported by the data service, passed to the browser unchanged.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct UpstreamError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

impl UpstreamError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new("ValidationException", message)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataClient: Send + Sync {
    async fn list_tables(&self, input: ListTablesInput) -> Result<ListTablesOutput, UpstreamError>;

    async fn create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<TableDescriptionOutput, UpstreamError>;

    async fn delete_table(
        &self,
        input: TableNameInput,
    ) -> Result<TableDescriptionOutput, UpstreamError>;

    async fn describe_table(
        &self,
        input: TableNameInput,
    ) -> Result<DescribeTableOutput, UpstreamError>;

    async fn describe_time_to_live(
        &self,
        input: TableNameInput,
    ) -> Result<DescribeTimeToLiveOutput, UpstreamError>;

    async fn update_time_to_live(
        &self,
        input: UpdateTimeToLiveInput,
    ) -> Result<UpdateTimeToLiveOutput, UpstreamError>;

    async fn update_table(
        &self,
        input: UpdateTableInput,
    ) -> Result<TableDescriptionOutput, UpstreamError>;

    async fn scan(&self, input: ScanInput) -> Result<ItemsOutput, UpstreamError>;

    async fn query(&self, input: QueryInput) -> Result<ItemsOutput, UpstreamError>;

    async fn put_item(&self, input: PutItemInput) -> Result<ItemWriteOutput, UpstreamError>;

    async fn delete_item(&self, input: DeleteItemInput) -> Result<ItemWriteOutput, UpstreamError>;
}

/// Resolves the data client for a request, optionally by region.
pub trait ClientProvider: Send + Sync {
    fn client(&self, region: Option<&str>) -> Arc<dyn DataClient>;
}

/// Always hands out the same client, whatever region is asked for.
pub struct SingleClient(pub Arc<dyn DataClient>);

impl ClientProvider for SingleClient {
    fn client(&self, _region: Option<&str>) -> Arc<dyn DataClient> {
        self.0.clone()
    }
}

/// Commercial AWS regions offering DynamoDB.
pub const AWS_REGIONS: &[&str] = &[
    "af-south-1",
    "ap-east-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-south-1",
    "ap-south-2",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ca-central-1",
    "ca-west-1",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "il-central-1",
    "me-central-1",
    "me-south-1",
    "sa-east-1",
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
];

/// One DynamoDB client per region, built lazily from a shared base config.
///
/// Only the default region and the allowed regions get a client; any other
/// requested region falls back to the default, so the cache stays bounded.
pub struct RegionalClients {
    base: SdkConfig,
    default_region: String,
    endpoint_url: Option<String>,
    allowed_regions: HashSet<String>,
    clients: DashMap<String, Arc<dyn DataClient>>,
}

impl RegionalClients {
    /// Allows [`AWS_REGIONS`] until [`RegionalClients::with_allowed_regions`]
    /// says otherwise.
    pub fn new(base: SdkConfig, default_region: String, endpoint_url: Option<String>) -> Self {
        Self {
            base,
            default_region,
            endpoint_url,
            allowed_regions: AWS_REGIONS.iter().map(|r| r.to_string()).collect(),
            clients: DashMap::new(),
        }
    }

    pub fn with_allowed_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_regions = regions.into_iter().map(Into::into).collect();
        self
    }

    fn resolve_region<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested.filter(|r| !r.is_empty()) {
            Some(region) if region == self.default_region => region,
            Some(region) if self.allowed_regions.contains(region) => region,
            Some(region) => {
                warn!(region = %region, default = %self.default_region, "Region not allowed, using default");
                &self.default_region
            }
            None => &self.default_region,
        }
    }

    pub fn cached_regions(&self) -> usize {
        self.clients.len()
    }
}

impl ClientProvider for RegionalClients {
    fn client(&self, region: Option<&str>) -> Arc<dyn DataClient> {
        let region = self.resolve_region(region).to_string();

        self.clients
            .entry(region.clone())
            .or_insert_with(|| {
                info!(region = %region, endpoint = ?self.endpoint_url, "Creating DynamoDB client");
                Arc::new(DynamoClient::for_region(
                    &self.base,
                    &region,
                    self.endpoint_url.as_deref(),
                ))
            })
            .value()
            .clone()
    }
}
