/// DynamoDB-backed processed counter
///
/// Items are keyed by `photoGalleryId` (partition) and `photoArrayId` (sort).
/// `ADD processedCount :increment` is atomic on the server side and creates
/// the attribute when it does not exist yet.
use super::{CounterError, CounterKey, ProcessedCounter};
use crate::config::CounterConfig;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use tracing::info;

const GROUP_ATTRIBUTE: &str = "photoGalleryId";
const ARRAY_ATTRIBUTE: &str = "photoArrayId";
const COUNT_ATTRIBUTE: &str = "processedCount";

#[derive(Clone)]
pub struct DynamoDbCounter {
    client: Client,
}

impl DynamoDbCounter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(sdk_config: &SdkConfig, config: &CounterConfig) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        info!(
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            "DynamoDB client initialized"
        );

        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ProcessedCounter for DynamoDbCounter {
    async fn increment(&self, table: &str, key: &CounterKey) -> Result<u64, CounterError> {
        let response = self
            .client
            .update_item()
            .table_name(table)
            .key(GROUP_ATTRIBUTE, AttributeValue::S(key.group_id.clone()))
            .key(ARRAY_ATTRIBUTE, AttributeValue::S(key.array_id.clone()))
            .update_expression(format!("ADD {COUNT_ATTRIBUTE} :increment"))
            .expression_attribute_values(":increment", AttributeValue::N("1".to_string()))
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await
            .map_err(|e| CounterError::Request(DisplayErrorContext(&e).to_string()))?;

        response
            .attributes()
            .and_then(updated_count)
            .ok_or(CounterError::MissingCount)
    }
}

fn updated_count(attributes: &HashMap<String, AttributeValue>) -> Option<u64> {
    attributes
        .get(COUNT_ATTRIBUTE)
        .and_then(|value| value.as_n().ok())
        .and_then(|n| n.parse().ok())
}
