use bytes::Bytes;
use std::fmt;
use std::io::Cursor;

const FALLBACK_MIME: &str = "application/octet-stream";

/// How an attachment is forwarded to the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    Document,
}

impl AttachmentKind {
    /// Classify by MIME prefix. Anything that is not image, video or audio
    /// is sent as a document.
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            AttachmentKind::Image
        } else if mime.starts_with("video/") {
            AttachmentKind::Video
        } else if mime.starts_with("audio/") {
            AttachmentKind::Audio
        } else {
            AttachmentKind::Document
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentKind::Image => write!(f, "Image"),
            AttachmentKind::Video => write!(f, "Video"),
            AttachmentKind::Audio => write!(f, "Audio"),
            AttachmentKind::Document => write!(f, "Document"),
        }
    }
}

/// Pick the MIME type for an upload: the declared type if non-empty,
/// else a guess from the filename's extension, else octet-stream.
pub fn resolve_mime(declared: Option<&str>, filename: &str) -> String {
    if let Some(declared) = declared.map(str::trim).filter(|d| !d.is_empty()) {
        return declared.to_string();
    }
    mime_guess::from_path(filename)
        .first_raw()
        .unwrap_or(FALLBACK_MIME)
        .to_string()
}

pub fn classify(declared: Option<&str>, filename: &str) -> AttachmentKind {
    AttachmentKind::from_mime(&resolve_mime(declared, filename))
}

/// One uploaded file, fully buffered in memory behind a read cursor.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content_type: Option<String>,
    content: Cursor<Bytes>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            content: Cursor::new(data),
        }
    }

    pub fn kind(&self) -> AttachmentKind {
        classify(self.content_type.as_deref(), &self.filename)
    }

    /// Read everything from the cursor to the end, advancing it.
    pub fn read_to_end(&mut self) -> Bytes {
        let len = self.content.get_ref().len();
        let start = (self.content.position() as usize).min(len);
        let remaining = self.content.get_ref().slice(start..);
        self.content.set_position(len as u64);
        remaining
    }

    pub fn rewind(&mut self) {
        self.content.set_position(0);
    }

    pub fn position(&self) -> u64 {
        self.content.position()
    }
}
