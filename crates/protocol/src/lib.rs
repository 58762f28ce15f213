//! fsedump Protocol - Decoder for the Darwin `/dev/fsevents` byte stream.
//!
//! This crate provides:
//! - [`EventType`], [`ArgumentType`] and [`EventFlags`] matching the kernel's codes
//! - [`ByteCursor`], a bounds-checked view over one read's bytes
//! - [`Decoder`], turning bytes into [`EventRecord`]s with typed [`Argument`]s
//! - [`StreamDriver`], the read loop with carry-over of split records
//! - [`ProcessNameCache`], a single-entry pid to name cache
//! - [`RecordWriter`] for building wire-format byte streams
//!
//! # Wire Format
//!
//! All integers are native-endian. A record is:
//! - 4 bytes: event-type word (code in the low 12 bits, flags above)
//! - 4 or 8 bytes: process id (see [`PidWidth`])
//! - arguments: `u16` tag, `u16` length, `length` payload bytes
//! - 2 bytes: `FSE_ARG_DONE`
//!
//! The `FSE_EVENTS_DROPPED` record has a header only.
//!
//! # Example
//!
//! ```rust
//! use fsedump_protocol::{Argument, ByteCursor, Decoded, Decoder, EventType, PidWidth, RecordWriter};
//!
//! let bytes = RecordWriter::new(EventType::CreateFile.code(), 123, PidWidth::Four)
//!     .string(b"abcde")
//!     .done()
//!     .into_bytes();
//!
//! let mut cursor = ByteCursor::new(&bytes);
//! let Decoded::Record(record) = Decoder::default().decode_next(&mut cursor).unwrap() else {
//!     panic!("complete record expected");
//! };
//! assert_eq!(record.kind(), Some(EventType::CreateFile));
//! assert_eq!(record.pid, 123);
//! assert_eq!(record.arguments, vec![Argument::String(b"abcde".to_vec())]);
//! ```

mod argument;
mod cursor;
mod process;
mod record;
mod stream;
mod symbols;
mod writer;

// Re-export main types at crate root
pub use argument::{
    ARG_HEADER_SIZE, Argument, ArgumentStep, DeviceNumber, Disambiguation, FileMode, TAG_SIZE,
    decode_argument,
};
pub use cursor::{ByteCursor, DecodeError};
pub use process::{ProcessNameCache, ProcessResolver};
pub use record::{
    DEFAULT_MAX_ARGUMENTS, Decoded, Decoder, DecoderConfig, EventRecord, InvalidPidWidth,
    PidWidth,
};
pub use stream::{
    CaptureSource, ChunkSource, DEFAULT_BUFFER_SIZE, EventSink, StreamConfig, StreamDriver,
    StreamError, StreamStats,
};
pub use symbols::{
    ArgumentType, EventFlags, EventType, FSE_ARG_DONE, FSE_EVENTS_DROPPED, FSE_MAX_EVENTS,
    FSE_REPORT, FSE_TYPE_MASK, MODE_TYPE_NAMES, argument_name, event_name,
    mode_type_index, mode_type_name,
};
pub use writer::RecordWriter;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports_accessible() {
        let _ = EventType::CreateFile;
        let _ = ArgumentType::Done;
        let _ = EventFlags::MODE_HLINK;
        let _ = Decoder::default();
        let _ = StreamConfig::default();
        let _ = RecordWriter::arguments();
    }

    #[test]
    fn test_stream_through_public_api() {
        let mut bytes = RecordWriter::new(EventType::Rename.code(), 42, PidWidth::Four)
            .string(b"/tmp/old\0")
            .dev(0x0100_0004)
            .ino(7)
            .mode(0o040755)
            .uid(501)
            .gid(20)
            .string(b"/tmp/new\0")
            .int64(1_234_567)
            .done()
            .into_bytes();
        bytes.extend(RecordWriter::dropped(PidWidth::Four).into_bytes());

        let (records, used) = Decoder::default().decode_all(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(records.len(), 2);

        let rename = &records[0];
        assert_eq!(rename.kind(), Some(EventType::Rename));
        assert_eq!(rename.arguments.len(), 8);
        assert_eq!(rename.path().as_deref(), Some("/tmp/old"));
        let Argument::Mode(mode) = rename.arguments[3] else {
            panic!("expected Mode");
        };
        assert_eq!(mode.type_name(), "DIR");
        assert!(records[1].is_dropped());
    }
}
