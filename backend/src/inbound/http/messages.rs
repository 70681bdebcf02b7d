//! Message publishing handler.
//!
//! ```text
//! POST /api/message {"topic":"orders","key":"customer-42","message":{"total":10}}
//! ```

use actix_web::{HttpResponse, post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::ApiResult;
use super::state::HttpState;
use crate::domain::{Error, MessageId};

/// Topic used when the request names none.
pub const DEFAULT_TOPIC: &str = "nginx-test-events";
const BROKER_LABEL: &str = "kafka-cluster";

/// Body of `POST /api/message`.
#[derive(Debug, Default, Deserialize)]
pub struct PublishRequest {
    /// Destination topic; blank selects [`DEFAULT_TOPIC`].
    #[serde(default)]
    pub topic: String,
    /// Partition key; empty means the message id is used.
    #[serde(default)]
    pub key: String,
    /// Any JSON value, wrapped in the envelope untouched.
    #[serde(default)]
    pub message: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    operation: &'static str,
    topic: String,
    key: String,
    message_id: MessageId,
    success: bool,
    broker: &'static str,
}

/// Publish a message. A failed publish answers 503.
#[post("/message")]
pub async fn publish_message(
    state: web::Data<HttpState>,
    payload: web::Json<PublishRequest>,
) -> ApiResult<HttpResponse> {
    let PublishRequest {
        topic,
        key,
        message,
    } = payload.into_inner();
    let topic = if topic.trim().is_empty() {
        DEFAULT_TOPIC.to_owned()
    } else {
        topic
    };

    let message_id = state
        .events
        .publish(&topic, &key, &message)
        .await
        .map_err(|err| {
            Error::service_unavailable("event publish failed")
                .with_details(json!({ "topic": topic, "reason": err.to_string() }))
        })?;

    Ok(HttpResponse::Ok().json(PublishResponse {
        operation: "PUBLISH",
        topic,
        key,
        message_id,
        success: true,
        broker: BROKER_LABEL,
    }))
}
