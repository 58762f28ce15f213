//! Wire-format encoder for records and argument lists.
//!
//! Produces byte streams in the same native-endian layout the kernel writes,
//! for fixtures and for synthesizing replay captures.

use crate::argument::ARG_HEADER_SIZE;
use crate::record::PidWidth;
use crate::symbols::{ArgumentType, FSE_ARG_DONE, FSE_EVENTS_DROPPED};

/// Builder for one record, or a bare argument list.
#[derive(Debug, Clone, Default)]
pub struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    /// Start a record with the given header.
    #[must_use]
    pub fn new(event_type: i32, pid: i64, pid_width: PidWidth) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&event_type.to_ne_bytes());
        match pid_width {
            PidWidth::Four => buf.extend_from_slice(&(pid as i32).to_ne_bytes()),
            PidWidth::Eight => buf.extend_from_slice(&pid.to_ne_bytes()),
        }
        Self { buf }
    }

    /// A complete "events dropped" record.
    #[must_use]
    pub fn dropped(pid_width: PidWidth) -> Self {
        Self::new(FSE_EVENTS_DROPPED, 0, pid_width)
    }

    /// Start an argument list with no record header.
    #[must_use]
    pub fn arguments() -> Self {
        Self::default()
    }

    /// Append an argument with an arbitrary tag and payload.
    ///
    /// # Panics
    ///
    /// Panics if the payload is longer than `u16::MAX`.
    #[must_use]
    pub fn raw_argument(mut self, tag: u16, payload: &[u8]) -> Self {
        let len = u16::try_from(payload.len()).expect("argument payload exceeds u16::MAX");
        self.buf.reserve(ARG_HEADER_SIZE + payload.len());
        self.buf.extend_from_slice(&tag.to_ne_bytes());
        self.buf.extend_from_slice(&len.to_ne_bytes());
        self.buf.extend_from_slice(payload);
        self
    }

    fn typed(self, kind: ArgumentType, payload: &[u8]) -> Self {
        self.raw_argument(kind.tag(), payload)
    }

    #[must_use]
    pub fn vnode(self, ptr: u64) -> Self {
        self.typed(ArgumentType::Vnode, &ptr.to_ne_bytes())
    }

    #[must_use]
    pub fn string(self, bytes: &[u8]) -> Self {
        self.typed(ArgumentType::String, bytes)
    }

    #[must_use]
    pub fn path(self, bytes: &[u8]) -> Self {
        self.typed(ArgumentType::Path, bytes)
    }

    #[must_use]
    pub fn int32(self, value: i32) -> Self {
        self.typed(ArgumentType::Int32, &value.to_ne_bytes())
    }

    #[must_use]
    pub fn int64(self, value: i64) -> Self {
        self.typed(ArgumentType::Int64, &value.to_ne_bytes())
    }

    #[must_use]
    pub fn raw(self, ptr: u64) -> Self {
        self.typed(ArgumentType::Raw, &ptr.to_ne_bytes())
    }

    #[must_use]
    pub fn ino(self, ino: u64) -> Self {
        self.typed(ArgumentType::Ino, &ino.to_ne_bytes())
    }

    #[must_use]
    pub fn uid(self, uid: u32) -> Self {
        self.typed(ArgumentType::Uid, &uid.to_ne_bytes())
    }

    #[must_use]
    pub fn gid(self, gid: u32) -> Self {
        self.typed(ArgumentType::Gid, &gid.to_ne_bytes())
    }

    #[must_use]
    pub fn dev(self, dev: u32) -> Self {
        self.typed(ArgumentType::Dev, &dev.to_ne_bytes())
    }

    #[must_use]
    pub fn mode(self, mode: u32) -> Self {
        self.typed(ArgumentType::Mode, &mode.to_ne_bytes())
    }

    #[must_use]
    pub fn finfo(self, bytes: &[u8]) -> Self {
        self.typed(ArgumentType::Finfo, bytes)
    }

    /// Append the length-less list terminator.
    #[must_use]
    pub fn done(mut self) -> Self {
        self.buf.extend_from_slice(&FSE_ARG_DONE.to_ne_bytes());
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let bytes = RecordWriter::new(3, 500, PidWidth::Four).into_bytes();
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..4], &3i32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &500i32.to_ne_bytes());
    }

    #[test]
    fn test_argument_layout() {
        let bytes = RecordWriter::arguments().string(b"hi").done().into_bytes();
        // tag(2) + len(2) + "hi" + done(2)
        assert_eq!(bytes.len(), 8);
        assert_eq!(&bytes[0..2], &ArgumentType::String.tag().to_ne_bytes());
        assert_eq!(&bytes[2..4], &2u16.to_ne_bytes());
        assert_eq!(&bytes[4..6], b"hi");
        assert_eq!(&bytes[6..8], &FSE_ARG_DONE.to_ne_bytes());
    }

    #[test]
    fn test_dropped_has_no_arguments() {
        let writer = RecordWriter::dropped(PidWidth::Eight);
        assert_eq!(writer.len(), 12);
    }
}
