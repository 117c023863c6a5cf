//! Past chat sessions as returned by the chat-history endpoint.

use std::fmt;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Confidence attached to a stored answer. The backend sends either a score
/// or a label depending on the retrieval path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Score(f64),
    Label(String),
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Score(score) => write!(f, "{}", score),
            Confidence::Label(label) => f.write_str(label),
        }
    }
}

/// `null` and a missing key both mean "empty".
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// RFC 3339 string or epoch milliseconds. Anything else is dropped rather
/// than failing the whole history payload.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let parsed = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text.parse::<DateTime<Utc>>().ok(),
        Some(Value::Number(millis)) => millis
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    };
    Ok(parsed)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryTurn {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub query: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub response: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

impl HistoryTurn {
    /// Time and optional confidence, e.g. `14:02:11 (0.92)`. Empty when
    /// neither is known.
    pub fn caption(&self) -> String {
        let time = self
            .timestamp
            .map(|ts| ts.with_timezone(&Local).format("%H:%M:%S").to_string())
            .unwrap_or_default();
        match &self.confidence {
            Some(confidence) if time.is_empty() => format!("({})", confidence),
            Some(confidence) => format!("{} ({})", time, confidence),
            None => time,
        }
    }
}

/// One stored session with its full turn list. Read-only once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySession {
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<HistoryTurn>,
}

impl HistorySession {
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    fn local_date_time(&self) -> (String, String) {
        let local = self.created_at.with_timezone(&Local);
        (
            local.format("%Y-%m-%d").to_string(),
            local.format("%H:%M:%S").to_string(),
        )
    }

    /// Row label for the history list.
    pub fn summary_label(&self) -> String {
        let (date, time) = self.local_date_time();
        format!(
            "Session: {} at {} ({} messages)",
            date,
            time,
            self.message_count()
        )
    }

    /// Heading for the session-detail view.
    pub fn title(&self) -> String {
        let (date, time) = self.local_date_time();
        format!("{} at {}", date, time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "createdAt": "2024-05-01T10:00:00Z",
        "messages": [
            {"query": "Hi", "response": "Hello", "timestamp": "2024-05-01T10:00:01Z", "confidence": 0.9},
            {"query": "Price?", "response": "Ten", "timestamp": "2024-05-01T10:00:05Z", "confidence": "high"},
            {"response": "Orphan answer", "timestamp": "2024-05-01T10:00:09Z"}
        ]
    }"#;

    #[test]
    fn parses_backend_session() {
        let session: HistorySession = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(session.message_count(), 3);
        assert_eq!(session.messages[0].confidence, Some(Confidence::Score(0.9)));
        assert_eq!(
            session.messages[1].confidence,
            Some(Confidence::Label("high".into()))
        );
        assert!(session.messages[2].query.is_empty());
        assert!(session.messages[2].confidence.is_none());
    }

    #[test]
    fn summary_mentions_message_count() {
        let session: HistorySession = serde_json::from_str(SAMPLE).unwrap();
        let label = session.summary_label();
        assert!(label.starts_with("Session: "));
        assert!(label.ends_with("(3 messages)"));
    }

    #[test]
    fn caption_appends_confidence() {
        let session: HistorySession = serde_json::from_str(SAMPLE).unwrap();
        assert!(session.messages[1].caption().ends_with("(high)"));
        assert!(!session.messages[2].caption().contains('('));
    }

    #[test]
    fn tolerates_incomplete_turns() {
        let session: HistorySession = serde_json::from_str(
            r#"{
                "createdAt": "2024-05-01T10:00:00Z",
                "messages": [
                    {"query": "Hi", "response": "Hello"},
                    {"query": null, "response": "Orphan", "timestamp": null, "confidence": null},
                    {"query": "When?", "response": null, "timestamp": "yesterday", "confidence": 0.5},
                    {"query": "Ms", "response": "Ok", "timestamp": 1714557600000}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(session.message_count(), 4);
        assert_eq!(session.messages[0].timestamp, None);
        assert_eq!(session.messages[0].caption(), "");
        assert!(session.messages[1].query.is_empty());
        assert!(session.messages[2].response.is_empty());
        assert_eq!(session.messages[2].timestamp, None);
        assert_eq!(session.messages[2].caption(), "(0.5)");
        assert_eq!(
            session.messages[3].timestamp,
            DateTime::<Utc>::from_timestamp_millis(1_714_557_600_000)
        );
    }

    #[test]
    fn missing_messages_default_to_empty() {
        let session: HistorySession =
            serde_json::from_str(r#"{"createdAt": "2024-05-01T10:00:00Z"}"#).unwrap();
        assert_eq!(session.message_count(), 0);
    }
}
