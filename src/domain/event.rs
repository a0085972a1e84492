//! Recorded experiment events.
//!
//! Events serialize with camelCase field names; the same shape is persisted
//! to storage and posted to the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub subject_id: String,
    pub experiment_name: String,
    pub variant: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    Assignment,
    Conversion {
        #[serde(rename = "conversionType")]
        conversion_type: String,
        #[serde(default)]
        value: f64,
    },
    Custom {
        #[serde(rename = "eventName")]
        event_name: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Assignment => "assignment",
            EventKind::Conversion { .. } => "conversion",
            EventKind::Custom { .. } => "custom",
        }
    }
}

impl Event {
    pub fn assignment(subject_id: &str, experiment_name: &str, variant: &str) -> Self {
        Self::now(subject_id, experiment_name, variant, EventKind::Assignment)
    }

    pub fn conversion(
        subject_id: &str,
        experiment_name: &str,
        variant: &str,
        conversion_type: &str,
        value: f64,
    ) -> Self {
        Self::now(
            subject_id,
            experiment_name,
            variant,
            EventKind::Conversion {
                conversion_type: conversion_type.to_string(),
                value,
            },
        )
    }

    pub fn custom(
        subject_id: &str,
        experiment_name: &str,
        variant: &str,
        event_name: &str,
        data: serde_json::Value,
    ) -> Self {
        Self::now(
            subject_id,
            experiment_name,
            variant,
            EventKind::Custom {
                event_name: event_name.to_string(),
                data,
            },
        )
    }

    fn now(subject_id: &str, experiment_name: &str, variant: &str, kind: EventKind) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            experiment_name: experiment_name.to_string(),
            variant: variant.to_string(),
            timestamp: Utc::now(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversion_serializes_camel_case_with_type_tag() {
        let event = Event::conversion("user-1", "checkout_button", "B", "purchase", 49.5);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "conversion");
        assert_eq!(value["subjectId"], "user-1");
        assert_eq!(value["experimentName"], "checkout_button");
        assert_eq!(value["variant"], "B");
        assert_eq!(value["conversionType"], "purchase");
        assert_eq!(value["value"], 49.5);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn custom_event_round_trips_freeform_data() {
        let event = Event::custom(
            "user-1",
            "hero",
            "A",
            "scroll_depth",
            json!({"percent": 75, "section": "pricing"}),
        );
        let text = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn conversion_value_defaults_to_zero() {
        let text = r#"{"subjectId":"u","experimentName":"e","variant":"A",
            "timestamp":"2024-01-01T00:00:00Z","type":"conversion","conversionType":"click"}"#;
        let parsed: Event = serde_json::from_str(text).unwrap();
        assert_eq!(
            parsed.kind,
            EventKind::Conversion {
                conversion_type: "click".into(),
                value: 0.0
            }
        );
    }

    #[test]
    fn kind_labels() {
        assert_eq!(Event::assignment("u", "e", "A").kind.label(), "assignment");
        assert_eq!(Event::custom("u", "e", "A", "x", json!(null)).kind.label(), "custom");
    }
}
