//! Relay core: validate a send request, classify its attachments and
//! forward everything to the chat through a [`Messenger`].

pub mod attachment;
pub mod dispatch;

use serde::Serialize;
use tracing::error;

use crate::messenger::Messenger;

pub use attachment::{classify, resolve_mime, Attachment, AttachmentKind};
pub use dispatch::{dispatch, Outcome};

/// Separator between per-item outcomes in the response message.
pub const OUTCOME_SEPARATOR: &str = "; ";

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("chat_id is required")]
    MissingChatId,

    #[error("chat_id must be an integer, got '{0}'")]
    InvalidChatId(String),

    #[error("Either message or files must be provided")]
    NothingToSend,

    /// The messaging platform rejected one of the sends.
    #[error("{0}")]
    Send(String),
}

/// A validated request to forward text and/or files to one chat.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub chat_id: i64,
    pub message: Option<String>,
    pub attachments: Vec<Attachment>,
}

impl RelayRequest {
    /// Validate raw form values. An empty message counts as absent.
    pub fn new(
        chat_id: Option<&str>,
        message: Option<String>,
        attachments: Vec<Attachment>,
    ) -> Result<Self, RelayError> {
        let chat_id = parse_chat_id(chat_id)?;
        let message = message.filter(|m| !m.is_empty());

        if message.is_none() && attachments.is_empty() {
            return Err(RelayError::NothingToSend);
        }

        Ok(Self {
            chat_id,
            message,
            attachments,
        })
    }
}

fn parse_chat_id(raw: Option<&str>) -> Result<i64, RelayError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let raw = raw.ok_or(RelayError::MissingChatId)?;
    raw.parse()
        .map_err(|_| RelayError::InvalidChatId(raw.to_string()))
}

/// Response envelope shared by every relay endpoint.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RelayResponse {
    /// Reserved for endpoints that return a payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RelayResponse {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Dispatch a request and join its outcomes into one response.
///
/// The first failed send aborts the request; outcomes gathered before the
/// failure are discarded.
pub async fn relay(
    messenger: &dyn Messenger,
    request: &mut RelayRequest,
) -> Result<RelayResponse, RelayError> {
    match dispatch(messenger, request).await {
        Ok(outcomes) => {
            let joined = outcomes
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(OUTCOME_SEPARATOR);
            Ok(RelayResponse::message(joined))
        }
        Err(e) => {
            error!(chat_id = request.chat_id, error = %e, "Error sending message");
            Err(e)
        }
    }
}
