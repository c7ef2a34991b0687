use std::fmt;

use tracing::{debug, info};

use super::{AttachmentKind, RelayError, RelayRequest};
use crate::messenger::Messenger;

/// What happened to one item of a relay request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    TextSent,
    Skipped { filename: String },
    Sent { kind: AttachmentKind, filename: String },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::TextSent => write!(f, "Text message sent"),
            Outcome::Skipped { filename } => write!(f, "File {} is empty - skipped", filename),
            Outcome::Sent { kind, filename } => write!(f, "{} {} sent", kind, filename),
        }
    }
}

/// Send the text message (if any), then each attachment in submission order.
///
/// Empty attachments are skipped without touching the messenger. Every
/// attachment's cursor is rewound once it has been processed, whether or
/// not its send succeeded. The first failure aborts the remaining items.
pub async fn dispatch(
    messenger: &dyn Messenger,
    request: &mut RelayRequest,
) -> Result<Vec<Outcome>, RelayError> {
    let chat_id = request.chat_id;
    let mut outcomes = Vec::with_capacity(request.attachments.len() + 1);

    if let Some(message) = &request.message {
        info!(chat_id, "Sending text message");
        messenger
            .send_text(chat_id, message)
            .await
            .map_err(|e| RelayError::Send(format!("{:#}", e)))?;
        outcomes.push(Outcome::TextSent);
    }

    for attachment in request.attachments.iter_mut() {
        let mut attachment = scopeguard::guard(attachment, |a| a.rewind());

        let data = attachment.read_to_end();
        if data.is_empty() {
            debug!(chat_id, filename = %attachment.filename, "Skipping empty attachment");
            outcomes.push(Outcome::Skipped {
                filename: attachment.filename.clone(),
            });
            continue;
        }

        let kind = attachment.kind();
        let filename = attachment.filename.as_str();
        debug!(chat_id, filename, %kind, size = data.len(), "Sending attachment");

        let sent = match kind {
            AttachmentKind::Image => messenger.send_photo(chat_id, data, filename).await,
            AttachmentKind::Video => messenger.send_video(chat_id, data, filename).await,
            AttachmentKind::Audio => messenger.send_audio(chat_id, data, filename).await,
            AttachmentKind::Document => messenger.send_document(chat_id, data, filename).await,
        };
        sent.map_err(|e| RelayError::Send(format!("{:#}", e)))?;

        outcomes.push(Outcome::Sent {
            kind,
            filename: filename.to_string(),
        });
    }

    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::mock::{MockMessenger, Sent};
    use crate::relay::Attachment;
    use bytes::Bytes;

    fn request(message: Option<&str>, files: Vec<Attachment>) -> RelayRequest {
        RelayRequest::new(Some("123"), message.map(String::from), files).unwrap()
    }

    fn file(name: &str, content_type: Option<&str>, data: &'static [u8]) -> Attachment {
        Attachment::new(name, content_type.map(String::from), Bytes::from_static(data))
    }

    #[test]
    fn test_outcome_text() {
        assert_eq!(Outcome::TextSent.to_string(), "Text message sent");
        assert_eq!(
            Outcome::Skipped {
                filename: "empty.txt".into()
            }
            .to_string(),
            "File empty.txt is empty - skipped"
        );
        assert_eq!(
            Outcome::Sent {
                kind: AttachmentKind::Video,
                filename: "clip.mp4".into()
            }
            .to_string(),
            "Video clip.mp4 sent"
        );
    }

    #[tokio::test]
    async fn test_text_only() {
        let messenger = MockMessenger::new();
        let mut req = request(Some("hi"), vec![]);

        let outcomes = dispatch(&messenger, &mut req).await.unwrap();
        assert_eq!(outcomes, vec![Outcome::TextSent]);
        assert_eq!(messenger.sent(), vec![Sent::Text(123, "hi".to_string())]);
    }

    #[tokio::test]
    async fn test_each_kind_routes_to_its_primitive() {
        let messenger = MockMessenger::new();
        let mut req = request(
            None,
            vec![
                file("a.png", None, b"img"),
                file("b", Some("video/mp4"), b"vid"),
                file("c.mp3", None, b"aud"),
                file("d.pdf", None, b"doc"),
            ],
        );

        dispatch(&messenger, &mut req).await.unwrap();
        assert_eq!(
            messenger.sent(),
            vec![
                Sent::Photo(123, "a.png".to_string(), 3),
                Sent::Video(123, "b".to_string(), 3),
                Sent::Audio(123, "c.mp3".to_string(), 3),
                Sent::Document(123, "d.pdf".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_attachment_skipped_and_processing_continues() {
        let messenger = MockMessenger::new();
        let mut req = request(
            None,
            vec![file("empty.txt", None, b""), file("photo.jpg", None, b"jpeg")],
        );

        let outcomes = dispatch(&messenger, &mut req).await.unwrap();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Skipped {
                    filename: "empty.txt".into()
                },
                Outcome::Sent {
                    kind: AttachmentKind::Image,
                    filename: "photo.jpg".into()
                },
            ]
        );
        assert_eq!(messenger.sent(), vec![Sent::Photo(123, "photo.jpg".to_string(), 4)]);
    }

    #[tokio::test]
    async fn test_cursors_rewound_after_success() {
        let messenger = MockMessenger::new();
        let mut req = request(None, vec![file("a.png", None, b"img"), file("e", None, b"")]);

        dispatch(&messenger, &mut req).await.unwrap();
        assert!(req.attachments.iter().all(|a| a.position() == 0));
    }

    #[tokio::test]
    async fn test_failure_aborts_and_rewinds_failed_attachment() {
        let messenger = MockMessenger::failing_file_send(1);
        let mut req = request(None, vec![file("a.png", None, b"img"), file("b.png", None, b"img")]);

        let err = dispatch(&messenger, &mut req).await.unwrap_err();
        assert!(err.to_string().contains("mock upload failure"));
        assert!(messenger.sent().is_empty());
        assert_eq!(req.attachments[0].position(), 0);
        assert_eq!(req.attachments[1].position(), 0);
    }

    #[tokio::test]
    async fn test_text_failure_aborts_before_attachments() {
        let messenger = MockMessenger::failing_text();
        let mut req = request(Some("hi"), vec![file("a.png", None, b"img")]);

        let err = dispatch(&messenger, &mut req).await.unwrap_err();
        assert!(matches!(err, RelayError::Send(_)));
        assert!(messenger.sent().is_empty());
    }
}
