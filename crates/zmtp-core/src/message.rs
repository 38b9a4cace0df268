//! Multi-frame ZMTP messages.
//!
//! A message owns its frames in wire order. Frame storage usually comes
//! from the [`Allocator`] and goes back to it on [`Message::reset`].

use core::fmt;
use std::error::Error as StdError;
use std::sync::Arc;

use crate::allocator::Allocator;
use crate::buffer::Buffer;

/// Error attached to a message by whoever produced it.
pub type DeferredError = Arc<dyn StdError + Send + Sync + 'static>;

/// Whether a message carries user payload or a protocol command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    #[default]
    User = 0,
    Command = 1,
}

impl TryFrom<u8> for MessageKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, u8> {
        match value {
            0 => Ok(MessageKind::User),
            1 => Ok(MessageKind::Command),
            other => Err(other),
        }
    }
}

/// A ZMTP message, possibly made of several frames.
///
/// Constructors that take [`Buffer`]s move them in; the caller no longer
/// has access to that storage.
#[derive(Default)]
pub struct Message {
    frames: Vec<Buffer>,
    kind: MessageKind,
    multipart: bool,
    error: Option<DeferredError>,
}

impl Message {
    /// Create a single-frame message.
    pub fn new(frame: Buffer) -> Self {
        Self::from_frames([frame])
    }

    /// Create a message from frames in wire order.
    pub fn from_frames<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Buffer>,
    {
        Self {
            frames: frames.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Create a single-frame message holding a copy of `text`.
    pub fn from_text(text: &str) -> Self {
        Self::new(Buffer::from(text))
    }

    /// Create a message with one frame per text, each copied.
    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_frames(texts.into_iter().map(|t| Buffer::from(t.as_ref())))
    }

    /// Frames in wire order.
    #[inline]
    pub fn frames(&self) -> &[Buffer] {
        &self.frames
    }

    /// Frames in wire order, mutably.
    #[inline]
    pub fn frames_mut(&mut self) -> &mut [Buffer] {
        &mut self.frames
    }

    /// Frame at `index`.
    #[inline]
    pub fn frame(&self, index: usize) -> Option<&Buffer> {
        self.frames.get(index)
    }

    /// Append a frame.
    #[inline]
    pub fn push_frame(&mut self, frame: Buffer) {
        self.frames.push(frame);
    }

    /// Number of frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Check if the message has no frames.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames the message can hold before its frame list reallocates.
    #[inline]
    pub fn frames_capacity(&self) -> usize {
        self.frames.capacity()
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    #[inline]
    pub fn set_kind(&mut self, kind: MessageKind) {
        self.kind = kind;
    }

    #[inline]
    pub fn is_command(&self) -> bool {
        self.kind == MessageKind::Command
    }

    #[inline]
    pub fn is_multipart(&self) -> bool {
        self.multipart
    }

    #[inline]
    pub fn set_multipart(&mut self, multipart: bool) {
        self.multipart = multipart;
    }

    /// Error attached by the producer, if any.
    pub fn error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.error.as_deref()
    }

    /// Attach an error for the consumer to pick up.
    pub fn set_error<E>(&mut self, err: E)
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        self.error = Some(Arc::from(err.into()));
    }

    /// Detach the attached error.
    pub fn take_error(&mut self) -> Option<DeferredError> {
        self.error.take()
    }

    /// Sum of all frame lengths.
    pub fn total_size(&self) -> usize {
        self.frames.iter().map(Buffer::len).sum()
    }

    /// Copy every frame, in order, into one new buffer of exactly
    /// [`total_size`](Self::total_size) bytes.
    pub fn concatenated_bytes(&self) -> Buffer {
        let mut data = Vec::with_capacity(self.total_size());
        for frame in &self.frames {
            data.extend_from_slice(frame);
        }
        Buffer::from_vec(data)
    }

    /// Release every frame to `allocator` and forget it.
    ///
    /// The frame list keeps its capacity so the message can be refilled
    /// without reallocating. Kind, multipart flag and error are untouched.
    pub fn reset(&mut self, allocator: &Allocator) {
        for frame in self.frames.drain(..) {
            allocator.release(frame);
        }
    }
}

impl Clone for Message {
    /// Deep copy. Frames get fresh storage; the attached error is not
    /// carried over.
    fn clone(&self) -> Self {
        Self {
            frames: self.frames.clone(),
            kind: self.kind,
            multipart: self.multipart,
            error: None,
        }
    }
}

impl PartialEq for Message {
    /// Compares frames and metadata, ignoring any attached error.
    fn eq(&self, other: &Self) -> bool {
        self.frames == other.frames
            && self.kind == other.kind
            && self.multipart == other.multipart
    }
}

impl Eq for Message {}

impl From<Buffer> for Message {
    fn from(frame: Buffer) -> Self {
        Self::new(frame)
    }
}

impl From<Vec<Buffer>> for Message {
    fn from(frames: Vec<Buffer>) -> Self {
        Self {
            frames,
            ..Self::default()
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Message{frames:[")?;
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "\"{}\"", frame.as_slice().escape_ascii())?;
        }
        f.write_str("]}")
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("frames", &self.frames)
            .field("kind", &self.kind)
            .field("multipart", &self.multipart)
            .field("error", &self.error.as_ref().map(|e| e.to_string()))
            .finish()
    }
}
