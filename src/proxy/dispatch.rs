//! Routes `{method, payload}` requests to the data client.

use std::collections::HashSet;
use std::future::Future;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::client::{DataClient, UpstreamError};
use super::operation::Operation;
use crate::error::ProxyError;

/// Body of a proxied call as posted by the console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyRequest {
    pub method: String,
    #[serde(default)]
    pub payload: Value,
}

impl ProxyRequest {
    pub fn new(method: impl Into<String>, payload: Value) -> Self {
        Self {
            method: method.into(),
            payload,
        }
    }

    pub fn from_slice(body: &[u8]) -> Result<Self, ProxyError> {
        Ok(serde_json::from_slice(body)?)
    }
}

/// Response envelope. `err` is always present, `null` on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub err: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn ok(data: Value) -> Self {
        Self {
            err: None,
            data: Some(data),
        }
    }

    pub fn not_implemented() -> Self {
        Self {
            err: Some(Value::String("not-implemented".to_string())),
            data: None,
        }
    }

    pub fn forbidden_in_demo(op: Operation) -> Self {
        Self {
            err: Some(json!({ "errorMessage": format!("{op} forbidden in demo") })),
            data: None,
        }
    }

    pub fn upstream(err: &UpstreamError) -> Self {
        Self {
            err: Some(serde_json::to_value(err).unwrap_or_else(|_| json!({ "code": err.code }))),
            data: None,
        }
    }

    /// Error with a DynamoDB style `{code, message}` body.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::upstream(&UpstreamError::new(code, message))
    }

    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }
}

/// Tables that demo mode refuses to modify.
#[derive(Debug, Clone, Default)]
pub struct DemoPolicy {
    pub enabled: bool,
    pub protected_tables: HashSet<String>,
}

impl DemoPolicy {
    pub fn new<I, S>(enabled: bool, protected_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled,
            protected_tables: protected_tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn forbids(&self, op: Operation, table: Option<&str>) -> bool {
        self.enabled
            && op.is_destructive()
            && table.is_some_and(|t| self.protected_tables.contains(t))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    demo: DemoPolicy,
}

impl Dispatcher {
    pub fn new(demo: DemoPolicy) -> Self {
        Self { demo }
    }

    pub fn demo(&self) -> &DemoPolicy {
        &self.demo
    }

    pub async fn dispatch(&self, client: &dyn DataClient, request: ProxyRequest) -> Envelope {
        let op = match request.method.parse::<Operation>() {
            Ok(op) => op,
            Err(_) => {
                debug!(method = %request.method, "Rejected method outside the allow-list");
                return Envelope::not_implemented();
            }
        };

        let table = request
            .payload
            .get("TableName")
            .and_then(Value::as_str)
            .map(str::to_string);

        if self.demo.forbids(op, table.as_deref()) {
            info!(method = %op, table = ?table, "Refused destructive call in demo mode");
            return Envelope::forbidden_in_demo(op);
        }

        let payload = match request.payload {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let start = Instant::now();
        let envelope = match op {
            Operation::ListTables => call(op, payload, |i| client.list_tables(i)).await,
            Operation::CreateTable => call(op, payload, |i| client.create_table(i)).await,
            Operation::DeleteTable => call(op, payload, |i| client.delete_table(i)).await,
            Operation::DescribeTable => call(op, payload, |i| client.describe_table(i)).await,
            Operation::DescribeTimeToLive => {
                call(op, payload, |i| client.describe_time_to_live(i)).await
            }
            Operation::UpdateTimeToLive => {
                call(op, payload, |i| client.update_time_to_live(i)).await
            }
            Operation::UpdateTable => call(op, payload, |i| client.update_table(i)).await,
            Operation::Scan => call(op, payload, |i| client.scan(i)).await,
            Operation::Query => call(op, payload, |i| client.query(i)).await,
            Operation::DeleteItem => call(op, payload, |i| client.delete_item(i)).await,
            Operation::PutItem => call(op, payload, |i| client.put_item(i)).await,
        };

        info!(
            method = %op,
            table = ?table,
            ok = envelope.is_ok(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Proxied call"
        );
        envelope
    }
}

fn decode<I: DeserializeOwned>(op: Operation, payload: Value) -> Result<I, ProxyError> {
    serde_json::from_value(payload).map_err(|source| ProxyError::Payload {
        operation: op.as_str(),
        source,
    })
}

async fn call<I, O, F, Fut>(op: Operation, payload: Value, f: F) -> Envelope
where
    I: DeserializeOwned,
    O: Serialize,
    F: FnOnce(I) -> Fut,
    Fut: Future<Output = Result<O, UpstreamError>>,
{
    let input = match decode::<I>(op, payload) {
        Ok(input) => input,
        Err(err) => {
            debug!(method = %op, error = %err, "Payload rejected");
            return Envelope::error("ValidationException", err.to_string());
        }
    };

    match f(input).await {
        Ok(output) => match serde_json::to_value(&output) {
            Ok(data) => Envelope::ok(data),
            Err(err) => Envelope::error("SerializationException", err.to_string()),
        },
        Err(err) => {
            warn!(method = %op, code = %err.code, message = %err.message, "Upstream call failed");
            Envelope::upstream(&err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::client::MockDataClient;
    use crate::proxy::contract::{
        ItemWriteOutput, ItemsOutput, ListTablesOutput, TableDescriptionOutput,
    };
    use aws_sdk_dynamodb::types::AttributeValue;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn demo_dispatcher() -> Dispatcher {
        Dispatcher::new(DemoPolicy::new(true, ["demo-table"]))
    }

    #[tokio::test]
    async fn test_unknown_method_is_not_implemented() {
        let mut client = MockDataClient::new();
        client.expect_list_tables().never();

        let envelope = Dispatcher::default()
            .dispatch(&client, ProxyRequest::new("batchWriteItem", json!({"RequestItems": {}})))
            .await;

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "err": "not-implemented" })
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_demo_put_item_on_protected_table_never_calls_client() {
        let mut client = MockDataClient::new();
        client.expect_put_item().never();

        let envelope = demo_dispatcher()
            .dispatch(
                &client,
                ProxyRequest::new(
                    "putItem",
                    json!({"TableName": "demo-table", "Item": {"id": {"S": "1"}}}),
                ),
            )
            .await;

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({ "err": { "errorMessage": "putItem forbidden in demo" } })
        );
    }

    #[tokio::test]
    async fn test_demo_mode_allows_reads_and_unprotected_tables() {
        let mut client = MockDataClient::new();
        client
            .expect_delete_item()
            .times(1)
            .returning(|_| Ok(ItemWriteOutput::default()));
        client
            .expect_scan()
            .times(1)
            .returning(|_| Ok(ItemsOutput::default()));

        let dispatcher = demo_dispatcher();
        let deleted = dispatcher
            .dispatch(
                &client,
                ProxyRequest::new(
                    "deleteItem",
                    json!({"TableName": "scratch", "Key": {"id": {"S": "1"}}}),
                ),
            )
            .await;
        let scanned = dispatcher
            .dispatch(&client, ProxyRequest::new("scan", json!({"TableName": "demo-table"})))
            .await;

        assert!(deleted.is_ok());
        assert!(scanned.is_ok());
    }

    #[tokio::test]
    async fn test_demo_disabled_forwards_destructive_calls() {
        let mut client = MockDataClient::new();
        client
            .expect_delete_table()
            .withf(|input| input.table_name == "demo-table")
            .times(1)
            .returning(|_| Ok(TableDescriptionOutput::default()));

        let envelope = Dispatcher::new(DemoPolicy::new(false, ["demo-table"]))
            .dispatch(
                &client,
                ProxyRequest::new("deleteTable", json!({"TableName": "demo-table"})),
            )
            .await;

        assert_eq!(envelope, Envelope::ok(json!({})));
    }

    #[tokio::test]
    async fn test_success_wraps_output_in_data() {
        let mut client = MockDataClient::new();
        client.expect_scan().times(1).returning(|input| {
            assert_eq!(input.limit, Some(5));
            let mut item = HashMap::new();
            item.insert("id".to_string(), AttributeValue::S("a".to_string()));
            item.insert("n".to_string(), AttributeValue::N("0".to_string()));
            Ok(ItemsOutput {
                items: vec![item],
                count: 1,
                scanned_count: 1,
                last_evaluated_key: None,
            })
        });

        let envelope = Dispatcher::default()
            .dispatch(
                &client,
                ProxyRequest::new("scan", json!({"TableName": "events", "Limit": 5})),
            )
            .await;

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "err": null,
                "data": {
                    "Items": [{"id": {"S": "a"}, "n": {"N": "0"}}],
                    "Count": 1,
                    "ScannedCount": 1
                }
            })
        );
    }

    #[tokio::test]
    async fn test_upstream_error_is_passed_through() {
        let mut client = MockDataClient::new();
        client.expect_describe_table().times(1).returning(|_| {
            Err(UpstreamError {
                code: "ResourceNotFoundException".into(),
                message: "Requested resource not found".into(),
                status_code: Some(400),
            })
        });

        let envelope = Dispatcher::default()
            .dispatch(
                &client,
                ProxyRequest::new("describeTable", json!({"TableName": "missing"})),
            )
            .await;

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "err": {
                    "code": "ResourceNotFoundException",
                    "message": "Requested resource not found",
                    "statusCode": 400
                }
            })
        );
    }

    #[tokio::test]
    async fn test_payload_contract_violation_skips_client() {
        let mut client = MockDataClient::new();
        client.expect_put_item().never();

        let envelope = Dispatcher::default()
            .dispatch(
                &client,
                ProxyRequest::new("putItem", json!({"TableName": "events", "Item": {"id": "raw"}})),
            )
            .await;

        let err = envelope.err.unwrap();
        assert_eq!(err["code"], "ValidationException");
        assert!(err["message"].as_str().unwrap().contains("putItem"));
    }

    #[tokio::test]
    async fn test_unmodelled_condition_skips_client() {
        let mut client = MockDataClient::new();
        client.expect_delete_item().never();

        let envelope = Dispatcher::default()
            .dispatch(
                &client,
                ProxyRequest::new(
                    "deleteItem",
                    json!({
                        "TableName": "events",
                        "Key": {"id": {"S": "1"}},
                        "Expected": {"status": {"Value": {"S": "draft"}}}
                    }),
                ),
            )
            .await;

        let err = envelope.err.unwrap();
        assert_eq!(err["code"], "ValidationException");
        assert!(err["message"].as_str().unwrap().contains("Expected"));
        assert!(envelope.data.is_none());
    }

    #[tokio::test]
    async fn test_missing_payload_is_empty_input() {
        let mut client = MockDataClient::new();
        client
            .expect_list_tables()
            .withf(|input| input.limit.is_none())
            .times(1)
            .returning(|_| {
                Ok(ListTablesOutput {
                    table_names: vec!["events".into()],
                    last_evaluated_table_name: None,
                })
            });

        let request: ProxyRequest = serde_json::from_str(r#"{"method":"listTables"}"#).unwrap();
        let envelope = Dispatcher::default().dispatch(&client, request).await;

        assert_eq!(envelope.data, Some(json!({ "TableNames": ["events"] })));
    }

    #[test]
    fn test_request_body_must_be_json() {
        assert!(matches!(
            ProxyRequest::from_slice(b"method=scan"),
            Err(ProxyError::Body(_))
        ));
    }
}
