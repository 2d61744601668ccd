use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ChannelType;

/// Data carried by subscription request/response notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubscriptionData {
    pub subscription_id: Uuid,
    pub monthly: bool,
    pub online: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MessageData {
    pub channel_id: Uuid,
}

/// Notification type tag and its payload. Stored as two columns (`type` and
/// `data`), exchanged over the API as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationPayload {
    NewRequest(ContactData),
    SearchCoach,
    CoachAccept,
    CoachRefuse,
    NewSubscription(SubscriptionData),
    SubscriptionValidated(SubscriptionData),
    SubscriptionRejected(SubscriptionData),
    NewMessage(MessageData),
}

/// How the recipient answers a request notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Answer {
    Accept,
    Reject,
}

/// Outcome of answering a request: the payload of the response notification,
/// the answer key recorded on the request, and the type of the answerer's
/// channels the requester joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerPlan {
    pub response: NotificationPayload,
    pub answer_key: &'static str,
    pub joins: Option<ChannelType>,
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("unknown notification type '{0}'")]
    UnknownType(String),
    #[error("invalid data for notification type {kind}: {source}")]
    InvalidData {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl NotificationPayload {
    pub const TYPES: &'static [&'static str] = &[
        "NEW_REQUEST",
        "SEARCH_COACH",
        "COACH_ACCEPT",
        "COACH_REFUSE",
        "NEW_SUBSCRIPTION",
        "SUBSCRIPTION_VALIDATED",
        "SUBSCRIPTION_REJECTED",
        "NEW_MESSAGE",
    ];

    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::NewRequest(_) => "NEW_REQUEST",
            Self::SearchCoach => "SEARCH_COACH",
            Self::CoachAccept => "COACH_ACCEPT",
            Self::CoachRefuse => "COACH_REFUSE",
            Self::NewSubscription(_) => "NEW_SUBSCRIPTION",
            Self::SubscriptionValidated(_) => "SUBSCRIPTION_VALIDATED",
            Self::SubscriptionRejected(_) => "SUBSCRIPTION_REJECTED",
            Self::NewMessage(_) => "NEW_MESSAGE",
        }
    }

    /// Serialized `data` column, `None` for types without a payload.
    pub fn data_json(&self) -> Result<Option<String>, serde_json::Error> {
        let data = match self {
            Self::NewRequest(d) => serde_json::to_value(d),
            Self::NewSubscription(d)
            | Self::SubscriptionValidated(d)
            | Self::SubscriptionRejected(d) => serde_json::to_value(d),
            Self::NewMessage(d) => serde_json::to_value(d),
            Self::SearchCoach | Self::CoachAccept | Self::CoachRefuse => return Ok(None),
        };
        Ok(Some(data?.to_string()))
    }

    /// Rebuild a payload from its stored columns, validating `data` against
    /// the schema of `type_tag`.
    pub fn from_parts(type_tag: &str, data: Option<&str>) -> Result<Self, PayloadError> {
        if !Self::TYPES.contains(&type_tag) {
            return Err(PayloadError::UnknownType(type_tag.to_string()));
        }
        let invalid = |source| PayloadError::InvalidData {
            kind: type_tag.to_string(),
            source,
        };

        let mut envelope = serde_json::Map::new();
        envelope.insert("type".into(), serde_json::Value::String(type_tag.to_string()));
        if let Some(raw) = data {
            let value: serde_json::Value = serde_json::from_str(raw).map_err(invalid)?;
            if !value.is_null() {
                envelope.insert("data".into(), value);
            }
        }
        serde_json::from_value(serde_json::Value::Object(envelope)).map_err(invalid)
    }

    /// Response payload for an answer, or `None` when this type is not a
    /// request.
    pub fn answer_with(&self, answer: Answer) -> Option<AnswerPlan> {
        let plan = match (self, answer) {
            (Self::NewRequest(_) | Self::SearchCoach, Answer::Accept) => AnswerPlan {
                response: Self::CoachAccept,
                answer_key: "common:api.accepted",
                joins: Some(ChannelType::Coach),
            },
            (Self::NewRequest(_) | Self::SearchCoach, Answer::Reject) => AnswerPlan {
                response: Self::CoachRefuse,
                answer_key: "common:api.refused",
                joins: None,
            },
            (Self::NewSubscription(d), Answer::Accept) => AnswerPlan {
                response: Self::SubscriptionValidated(d.clone()),
                answer_key: "common:api.accept",
                joins: Some(ChannelType::Club),
            },
            (Self::NewSubscription(d), Answer::Reject) => AnswerPlan {
                response: Self::SubscriptionRejected(d.clone()),
                answer_key: "common:api.reject",
                joins: None,
            },
            _ => return None,
        };
        Some(plan)
    }
}
