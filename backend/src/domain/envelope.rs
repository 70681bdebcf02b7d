//! Tracking envelope wrapped around every outbound event.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Globally unique identifier minted once per publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Mint a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for MessageId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MessageId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Event body as it travels on the bus.
///
/// ```json
/// {"id":"…","source":"backplane","timestamp":"2026-01-02T03:04:05Z","payload":{…}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<P> {
    /// Identifier minted for this publish call.
    pub id: MessageId,
    /// Fixed identifier of the emitting service.
    pub source: String,
    /// UTC send time, RFC 3339 with whole seconds.
    #[serde(
        serialize_with = "serialize_rfc3339",
        deserialize_with = "deserialize_rfc3339"
    )]
    pub timestamp: DateTime<Utc>,
    /// Caller-supplied structure, never inspected.
    pub payload: P,
}

impl<P> EventEnvelope<P> {
    /// Wrap `payload` for transmission.
    pub fn new(id: MessageId, source: impl Into<String>, timestamp: DateTime<Utc>, payload: P) -> Self {
        Self {
            id,
            source: source.into(),
            timestamp,
            payload,
        }
    }
}

impl<P: Serialize> EventEnvelope<P> {
    /// Serialize the envelope to JSON bytes.
    ///
    /// # Errors
    /// Returns the serializer error when the payload cannot be represented.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

fn serialize_rfc3339<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn deserialize_rfc3339<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53)
            .single()
            .expect("valid timestamp")
    }

    #[rstest]
    fn serializes_expected_shape() {
        let id: MessageId = "1b4e28ba-2fa1-4d3b-a3f5-ef19b5a7633b".parse().expect("uuid");
        let envelope = EventEnvelope::new(id, "backplane", fixed_instant(), json!({"type": "click"}));

        let value: Value =
            serde_json::from_slice(&envelope.to_json_bytes().expect("serialize")).expect("json");
        assert_eq!(
            value,
            json!({
                "id": "1b4e28ba-2fa1-4d3b-a3f5-ef19b5a7633b",
                "source": "backplane",
                "timestamp": "2026-03-14T09:26:53Z",
                "payload": {"type": "click"},
            })
        );
    }

    #[rstest]
    fn timestamp_drops_sub_second_precision() {
        let instant = fixed_instant() + chrono::TimeDelta::milliseconds(750);
        let envelope = EventEnvelope::new(MessageId::generate(), "backplane", instant, Value::Null);
        let value = serde_json::to_value(&envelope).expect("serialize");
        assert_eq!(value["timestamp"], "2026-03-14T09:26:53Z");
    }

    #[rstest]
    fn parses_back_from_wire() {
        let raw = r#"{"id":"1b4e28ba-2fa1-4d3b-a3f5-ef19b5a7633b","source":"svc","timestamp":"2026-03-14T09:26:53Z","payload":[1,2]}"#;
        let envelope: EventEnvelope<Value> = serde_json::from_str(raw).expect("parse");
        assert_eq!(envelope.timestamp, fixed_instant());
        assert_eq!(envelope.payload, json!([1, 2]));
    }

    #[rstest]
    fn generated_ids_differ() {
        assert_ne!(MessageId::generate(), MessageId::generate());
    }
}
