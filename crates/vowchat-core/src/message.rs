//! Conversation message model.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use vowchat_proto::{Attachment, EnvelopeHeader, MessagePayload};

use crate::DeliveryStatus;

/// Display name used for locally authored messages.
const OWN_SENDER_NAME: &str = "You";

/// Display name used when an inbound message carries none.
const UNKNOWN_SENDER_NAME: &str = "Unknown";

/// Why a message ended in [`DeliveryStatus::Failed`].
///
/// Failures are scoped to a single message; the conversation keeps working.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryError {
    /// Channel stayed unavailable for the whole send window.
    #[error("transport unavailable for {waited:?}")]
    TransportUnavailable {
        /// How long the message waited for the Channel.
        waited: Duration,
    },

    /// Channel refused the send.
    #[error("send rejected: {reason}")]
    SendRejected {
        /// Reason reported by the Channel.
        reason: String,
    },
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique id within the conversation (`local-<n>` until reconciled).
    pub id: String,
    /// Conversation this message belongs to.
    pub conversation_id: String,
    /// Author user id.
    pub sender_id: String,
    /// Author display name.
    pub sender_name: String,
    /// Author avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
    /// Message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Attachment references, in display order.
    pub attachments: Vec<Attachment>,
    /// Origin timestamp (client clock for local messages).
    pub timestamp: DateTime<Utc>,
    /// Authored by the current user.
    pub is_own: bool,
    /// Delivery status.
    pub status: DeliveryStatus,
    /// Reason for a `Failed` status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<DeliveryError>,
}

impl Message {
    /// Locally authored message in `Sending` state.
    pub fn local(
        id: String,
        conversation_id: String,
        sender_id: String,
        content: Option<String>,
        attachments: Vec<Attachment>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            conversation_id,
            sender_id,
            sender_name: OWN_SENDER_NAME.to_string(),
            sender_avatar: None,
            content,
            attachments,
            timestamp,
            is_own: true,
            status: DeliveryStatus::Sending,
            failure: None,
        }
    }

    /// Message received from the Channel, in `Delivered` state.
    ///
    /// `id` is resolved by the caller since the payload id is optional.
    pub fn inbound(
        id: String,
        header: &EnvelopeHeader,
        payload: MessagePayload,
        current_user_id: &str,
    ) -> Self {
        Self {
            id,
            conversation_id: header.conversation_id.clone(),
            sender_id: header.sender_id.clone(),
            sender_name: payload.sender_name.unwrap_or_else(|| UNKNOWN_SENDER_NAME.to_string()),
            sender_avatar: payload.sender_avatar,
            content: payload.content,
            attachments: payload.attachments.unwrap_or_default(),
            timestamp: header.timestamp,
            is_own: header.sender_id == current_user_id,
            status: DeliveryStatus::Delivered,
            failure: None,
        }
    }

    /// Message text, empty if the message is attachment-only.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_defaults_sender_name() {
        let header = EnvelopeHeader::new("conv-1", "vendor-7", Utc::now());
        let msg = Message::inbound("m1".into(), &header, MessagePayload::default(), "user-1");

        assert_eq!(msg.sender_name, "Unknown");
        assert_eq!(msg.status, DeliveryStatus::Delivered);
        assert!(!msg.is_own);
        assert_eq!(msg.text(), "");
    }

    #[test]
    fn inbound_from_current_user_is_own() {
        let header = EnvelopeHeader::new("conv-1", "user-1", Utc::now());
        let payload = MessagePayload { content: Some("hi".into()), ..MessagePayload::default() };
        let msg = Message::inbound("m1".into(), &header, payload, "user-1");

        assert!(msg.is_own);
        assert_eq!(msg.text(), "hi");
    }

    #[test]
    fn local_starts_sending() {
        let msg = Message::local(
            "local-1".into(),
            "conv-1".into(),
            "user-1".into(),
            Some("hello".into()),
            Vec::new(),
            Utc::now(),
        );

        assert_eq!(msg.status, DeliveryStatus::Sending);
        assert_eq!(msg.sender_name, "You");
        assert!(msg.is_own);
    }
}
