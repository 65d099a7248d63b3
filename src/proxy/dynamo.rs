//! [`DataClient`] backed by `aws-sdk-dynamodb`.

use std::error::Error as StdError;
use std::time::Instant;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::config::http::HttpResponse;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types as sdk;
use aws_sdk_dynamodb::Client;
use tracing::debug;

use super::client::{DataClient, UpstreamError};
use super::contract::{
    AttributeDefinition, BillingModeSummary, CreateTableInput, DeleteItemInput,
    DescribeTableOutput, DescribeTimeToLiveOutput, GlobalSecondaryIndex,
    GlobalSecondaryIndexUpdate, ItemWriteOutput, ItemsOutput, KeySchemaElement,
    ListTablesInput, ListTablesOutput, LocalSecondaryIndex, Projection, ProvisionedThroughput,
    ProvisionedThroughputDescription, PutItemInput, QueryInput, ScanInput,
    SecondaryIndexDescription, StreamSpecification, TableDescription, TableDescriptionOutput,
    TableNameInput, TimeToLiveDescription, TimeToLiveSpecification, UpdateTableInput,
    UpdateTimeToLiveInput, UpdateTimeToLiveOutput,
};

pub struct DynamoClient {
    client: Client,
}

impl DynamoClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client for `region`, optionally pointed at a local emulator endpoint.
    pub fn for_region(base: &SdkConfig, region: &str, endpoint_url: Option<&str>) -> Self {
        let mut builder =
            aws_sdk_dynamodb::config::Builder::from(base).region(Region::new(region.to_string()));
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }
        Self::new(Client::from_conf(builder.build()))
    }
}

fn upstream<E>(err: SdkError<E, HttpResponse>) -> UpstreamError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
{
    let status_code = err.raw_response().map(|r| r.status().as_u16());
    let code = err.code().unwrap_or("UnknownError").to_string();
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    UpstreamError {
        code,
        message,
        status_code,
    }
}

fn invalid(err: BuildError) -> UpstreamError {
    UpstreamError::validation(err.to_string())
}

// Contract -> SDK request types

fn key_schema(elements: Vec<KeySchemaElement>) -> Result<Vec<sdk::KeySchemaElement>, BuildError> {
    elements
        .into_iter()
        .map(|e| {
            sdk::KeySchemaElement::builder()
                .attribute_name(e.attribute_name)
                .key_type(sdk::KeyType::from(e.key_type.as_str()))
                .build()
        })
        .collect()
}

fn attribute_definitions(
    definitions: Vec<AttributeDefinition>,
) -> Result<Vec<sdk::AttributeDefinition>, BuildError> {
    definitions
        .into_iter()
        .map(|d| {
            sdk::AttributeDefinition::builder()
                .attribute_name(d.attribute_name)
                .attribute_type(sdk::ScalarAttributeType::from(d.attribute_type.as_str()))
                .build()
        })
        .collect()
}

fn throughput(t: ProvisionedThroughput) -> Result<sdk::ProvisionedThroughput, BuildError> {
    sdk::ProvisionedThroughput::builder()
        .read_capacity_units(t.read_capacity_units)
        .write_capacity_units(t.write_capacity_units)
        .build()
}

fn projection(p: Projection) -> sdk::Projection {
    sdk::Projection::builder()
        .set_projection_type(p.projection_type.as_deref().map(sdk::ProjectionType::from))
        .set_non_key_attributes(p.non_key_attributes)
        .build()
}

fn global_index(index: GlobalSecondaryIndex) -> Result<sdk::GlobalSecondaryIndex, BuildError> {
    sdk::GlobalSecondaryIndex::builder()
        .index_name(index.index_name)
        .set_key_schema(Some(key_schema(index.key_schema)?))
        .projection(projection(index.projection))
        .set_provisioned_throughput(index.provisioned_throughput.map(throughput).transpose()?)
        .build()
}

fn local_index(index: LocalSecondaryIndex) -> Result<sdk::LocalSecondaryIndex, BuildError> {
    sdk::LocalSecondaryIndex::builder()
        .index_name(index.index_name)
        .set_key_schema(Some(key_schema(index.key_schema)?))
        .projection(projection(index.projection))
        .build()
}

fn stream(spec: StreamSpecification) -> Result<sdk::StreamSpecification, BuildError> {
    sdk::StreamSpecification::builder()
        .stream_enabled(spec.stream_enabled)
        .set_stream_view_type(spec.stream_view_type.as_deref().map(sdk::StreamViewType::from))
        .build()
}

fn index_update(update: GlobalSecondaryIndexUpdate) -> Result<sdk::GlobalSecondaryIndexUpdate, BuildError> {
    let create = update
        .create
        .map(|c| {
            sdk::CreateGlobalSecondaryIndexAction::builder()
                .index_name(c.index_name)
                .set_key_schema(Some(key_schema(c.key_schema)?))
                .projection(projection(c.projection))
                .set_provisioned_throughput(c.provisioned_throughput.map(throughput).transpose()?)
                .build()
        })
        .transpose()?;
    let change = update
        .update
        .map(|u| {
            sdk::UpdateGlobalSecondaryIndexAction::builder()
                .index_name(u.index_name)
                .set_provisioned_throughput(u.provisioned_throughput.map(throughput).transpose()?)
                .build()
        })
        .transpose()?;
    let delete = update
        .delete
        .map(|d| {
            sdk::DeleteGlobalSecondaryIndexAction::builder()
                .index_name(d.index_name)
                .build()
        })
        .transpose()?;

    Ok(sdk::GlobalSecondaryIndexUpdate::builder()
        .set_create(create)
        .set_update(change)
        .set_delete(delete)
        .build())
}

// SDK response types -> contract

fn key_element(e: &sdk::KeySchemaElement) -> KeySchemaElement {
    KeySchemaElement {
        attribute_name: e.attribute_name().to_string(),
        key_type: e.key_type().as_str().to_string(),
    }
}

fn throughput_description(t: &sdk::ProvisionedThroughputDescription) -> ProvisionedThroughputDescription {
    ProvisionedThroughputDescription {
        read_capacity_units: t.read_capacity_units(),
        write_capacity_units: t.write_capacity_units(),
    }
}

fn projection_description(p: &sdk::Projection) -> Projection {
    let non_key = p.non_key_attributes();
    Projection {
        projection_type: p.projection_type().map(|t| t.as_str().to_string()),
        non_key_attributes: (!non_key.is_empty()).then(|| non_key.to_vec()),
    }
}

fn stream_description(s: &sdk::StreamSpecification) -> StreamSpecification {
    StreamSpecification {
        stream_enabled: s.stream_enabled(),
        stream_view_type: s.stream_view_type().map(|v| v.as_str().to_string()),
    }
}

fn global_index_description(i: &sdk::GlobalSecondaryIndexDescription) -> SecondaryIndexDescription {
    SecondaryIndexDescription {
        index_name: i.index_name().map(str::to_string),
        key_schema: i.key_schema().iter().map(key_element).collect(),
        projection: i.projection().map(projection_description),
        index_status: i.index_status().map(|s| s.as_str().to_string()),
        provisioned_throughput: i.provisioned_throughput().map(throughput_description),
        item_count: i.item_count(),
        index_size_bytes: i.index_size_bytes(),
    }
}

fn local_index_description(i: &sdk::LocalSecondaryIndexDescription) -> SecondaryIndexDescription {
    SecondaryIndexDescription {
        index_name: i.index_name().map(str::to_string),
        key_schema: i.key_schema().iter().map(key_element).collect(),
        projection: i.projection().map(projection_description),
        item_count: i.item_count(),
        index_size_bytes: i.index_size_bytes(),
        ..Default::default()
    }
}

fn table_description(t: &sdk::TableDescription) -> TableDescription {
    TableDescription {
        table_name: t.table_name().map(str::to_string),
        table_arn: t.table_arn().map(str::to_string),
        table_status: t.table_status().map(|s| s.as_str().to_string()),
        key_schema: t.key_schema().iter().map(key_element).collect(),
        attribute_definitions: t
            .attribute_definitions()
            .iter()
            .map(|a| AttributeDefinition {
                attribute_name: a.attribute_name().to_string(),
                attribute_type: a.attribute_type().as_str().to_string(),
            })
            .collect(),
        item_count: t.item_count(),
        table_size_bytes: t.table_size_bytes(),
        creation_date_time: t.creation_date_time().map(|d| d.as_secs_f64()),
        provisioned_throughput: t.provisioned_throughput().map(throughput_description),
        billing_mode_summary: t.billing_mode_summary().map(|b| BillingModeSummary {
            billing_mode: b.billing_mode().map(|m| m.as_str().to_string()),
        }),
        global_secondary_indexes: t
            .global_secondary_indexes()
            .iter()
            .map(global_index_description)
            .collect(),
        local_secondary_indexes: t
            .local_secondary_indexes()
            .iter()
            .map(local_index_description)
            .collect(),
        stream_specification: t.stream_specification().map(stream_description),
    }
}

fn table_output(description: Option<&sdk::TableDescription>) -> TableDescriptionOutput {
    TableDescriptionOutput {
        table_description: description.map(table_description),
    }
}

#[async_trait]
impl DataClient for DynamoClient {
    async fn list_tables(&self, input: ListTablesInput) -> Result<ListTablesOutput, UpstreamError> {
        let out = self
            .client
            .list_tables()
            .set_exclusive_start_table_name(input.exclusive_start_table_name)
            .set_limit(input.limit)
            .send()
            .await
            .map_err(upstream)?;

        Ok(ListTablesOutput {
            table_names: out.table_names().to_vec(),
            last_evaluated_table_name: out.last_evaluated_table_name().map(str::to_string),
        })
    }

    async fn create_table(
        &self,
        input: CreateTableInput,
    ) -> Result<TableDescriptionOutput, UpstreamError> {
        let global_indexes = input
            .global_secondary_indexes
            .map(|v| v.into_iter().map(global_index).collect::<Result<Vec<_>, _>>())
            .transpose()
            .map_err(invalid)?;
        let local_indexes = input
            .local_secondary_indexes
            .map(|v| v.into_iter().map(local_index).collect::<Result<Vec<_>, _>>())
            .transpose()
            .map_err(invalid)?;

        let out = self
            .client
            .create_table()
            .table_name(input.table_name)
            .set_key_schema(Some(key_schema(input.key_schema).map_err(invalid)?))
            .set_attribute_definitions(Some(
                attribute_definitions(input.attribute_definitions).map_err(invalid)?,
            ))
            .set_provisioned_throughput(
                input
                    .provisioned_throughput
                    .map(throughput)
                    .transpose()
                    .map_err(invalid)?,
            )
            .set_billing_mode(input.billing_mode.as_deref().map(sdk::BillingMode::from))
            .set_global_secondary_indexes(global_indexes)
            .set_local_secondary_indexes(local_indexes)
            .set_stream_specification(
                input
                    .stream_specification
                    .map(stream)
                    .transpose()
                    .map_err(invalid)?,
            )
            .send()
            .await
            .map_err(upstream)?;

        Ok(table_output(out.table_description()))
    }

    async fn delete_table(
        &self,
        input: TableNameInput,
    ) -> Result<TableDescriptionOutput, UpstreamError> {
        let out = self
            .client
            .delete_table()
            .table_name(input.table_name)
            .send()
            .await
            .map_err(upstream)?;

        Ok(table_output(out.table_description()))
    }

    async fn describe_table(
        &self,
        input: TableNameInput,
    ) -> Result<DescribeTableOutput, UpstreamError> {
        let out = self
            .client
            .describe_table()
            .table_name(input.table_name)
            .send()
            .await
            .map_err(upstream)?;

        Ok(DescribeTableOutput {
            table: out.table().map(table_description),
        })
    }

    async fn describe_time_to_live(
        &self,
        input: TableNameInput,
    ) -> Result<DescribeTimeToLiveOutput, UpstreamError> {
        let out = self
            .client
            .describe_time_to_live()
            .table_name(input.table_name)
            .send()
            .await
            .map_err(upstream)?;

        Ok(DescribeTimeToLiveOutput {
            time_to_live_description: out.time_to_live_description().map(|d| {
                TimeToLiveDescription {
                    time_to_live_status: d.time_to_live_status().map(|s| s.as_str().to_string()),
                    attribute_name: d.attribute_name().map(str::to_string),
                }
            }),
        })
    }

    async fn update_time_to_live(
        &self,
        input: UpdateTimeToLiveInput,
    ) -> Result<UpdateTimeToLiveOutput, UpstreamError> {
        let spec = sdk::TimeToLiveSpecification::builder()
            .enabled(input.time_to_live_specification.enabled)
            .attribute_name(input.time_to_live_specification.attribute_name)
            .build()
            .map_err(invalid)?;

        let out = self
            .client
            .update_time_to_live()
            .table_name(input.table_name)
            .time_to_live_specification(spec)
            .send()
            .await
            .map_err(upstream)?;

        Ok(UpdateTimeToLiveOutput {
            time_to_live_specification: out.time_to_live_specification().map(|s| {
                TimeToLiveSpecification {
                    enabled: s.enabled(),
                    attribute_name: s.attribute_name().to_string(),
                }
            }),
        })
    }

    async fn update_table(
        &self,
        input: UpdateTableInput,
    ) -> Result<TableDescriptionOutput, UpstreamError> {
        let index_updates = input
            .global_secondary_index_updates
            .map(|v| v.into_iter().map(index_update).collect::<Result<Vec<_>, _>>())
            .transpose()
            .map_err(invalid)?;

        let out = self
            .client
            .update_table()
            .table_name(input.table_name)
            .set_attribute_definitions(
                input
                    .attribute_definitions
                    .map(attribute_definitions)
                    .transpose()
                    .map_err(invalid)?,
            )
            .set_provisioned_throughput(
                input
                    .provisioned_throughput
                    .map(throughput)
                    .transpose()
                    .map_err(invalid)?,
            )
            .set_billing_mode(input.billing_mode.as_deref().map(sdk::BillingMode::from))
            .set_global_secondary_index_updates(index_updates)
            .set_stream_specification(
                input
                    .stream_specification
                    .map(stream)
                    .transpose()
                    .map_err(invalid)?,
            )
            .send()
            .await
            .map_err(upstream)?;

        Ok(table_output(out.table_description()))
    }

    async fn scan(&self, input: ScanInput) -> Result<ItemsOutput, UpstreamError> {
        let start = Instant::now();
        let out = self
            .client
            .scan()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_limit(input.limit)
            .set_exclusive_start_key(input.exclusive_start_key)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(upstream)?;

        debug!(
            count = out.count(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Scan completed"
        );

        Ok(ItemsOutput {
            items: out.items().to_vec(),
            count: out.count(),
            scanned_count: out.scanned_count(),
            last_evaluated_key: out.last_evaluated_key().cloned(),
        })
    }

    async fn query(&self, input: QueryInput) -> Result<ItemsOutput, UpstreamError> {
        let start = Instant::now();
        let out = self
            .client
            .query()
            .table_name(input.table_name)
            .set_index_name(input.index_name)
            .set_key_condition_expression(input.key_condition_expression)
            .set_limit(input.limit)
            .set_exclusive_start_key(input.exclusive_start_key)
            .set_filter_expression(input.filter_expression)
            .set_projection_expression(input.projection_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_scan_index_forward(input.scan_index_forward)
            .set_consistent_read(input.consistent_read)
            .send()
            .await
            .map_err(upstream)?;

        debug!(
            count = out.count(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );

        Ok(ItemsOutput {
            items: out.items().to_vec(),
            count: out.count(),
            scanned_count: out.scanned_count(),
            last_evaluated_key: out.last_evaluated_key().cloned(),
        })
    }

    async fn put_item(&self, input: PutItemInput) -> Result<ItemWriteOutput, UpstreamError> {
        let out = self
            .client
            .put_item()
            .table_name(input.table_name)
            .set_item(Some(input.item))
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_return_values(input.return_values.as_deref().map(sdk::ReturnValue::from))
            .send()
            .await
            .map_err(upstream)?;

        Ok(ItemWriteOutput {
            attributes: out.attributes().cloned(),
        })
    }

    async fn delete_item(&self, input: DeleteItemInput) -> Result<ItemWriteOutput, UpstreamError> {
        let out = self
            .client
            .delete_item()
            .table_name(input.table_name)
            .set_key(Some(input.key))
            .set_condition_expression(input.condition_expression)
            .set_expression_attribute_names(input.expression_attribute_names)
            .set_expression_attribute_values(input.expression_attribute_values)
            .set_return_values(input.return_values.as_deref().map(sdk::ReturnValue::from))
            .send()
            .await
            .map_err(upstream)?;

        Ok(ItemWriteOutput {
            attributes: out.attributes().cloned(),
        })
    }
}
