use axum::body::Bytes;

use crate::error::QueueError;

/// An opaque, non-empty payload.
///
/// Emptiness is the wire-level signal for "no message", so an empty
/// `Message` cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message(Bytes);

impl Message {
    pub fn new(content: impl Into<Bytes>) -> Result<Self, QueueError> {
        let content = content.into();
        if content.is_empty() {
            return Err(QueueError::EmptyMessage);
        }
        Ok(Self(content))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl TryFrom<String> for Message {
    type Error = QueueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&'static str> for Message {
    type Error = QueueError;

    fn try_from(value: &'static str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
