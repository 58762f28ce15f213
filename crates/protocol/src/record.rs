//! Event record decoding.
//!
//! A record is an `i32` event-type word and a process id, followed by an
//! argument list ending in `FSE_ARG_DONE`. The "events dropped" sentinel
//! has no argument list at all.

use crate::argument::{Argument, ArgumentStep, Disambiguation, decode_argument};
use crate::cursor::{ByteCursor, DecodeError};
use crate::symbols::{EventFlags, EventType, FSE_EVENTS_DROPPED, FSE_TYPE_MASK};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the process id in the record header.
///
/// Fixed by the producing kernel build; configured, never inferred.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PidWidth {
    #[default]
    Four,
    Eight,
}

impl PidWidth {
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

impl TryFrom<u8> for PidWidth {
    type Error = InvalidPidWidth;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(InvalidPidWidth(other)),
        }
    }
}

impl From<PidWidth> for u8 {
    fn from(width: PidWidth) -> Self {
        width.bytes() as u8
    }
}

/// A pid width other than 4 or 8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid pid width {0}, expected 4 or 8")]
pub struct InvalidPidWidth(pub u8);

impl fmt::Display for PidWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes())
    }
}

/// Decoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Process id width in the record header.
    #[serde(default)]
    pub pid_width: PidWidth,

    /// Arguments kept per record. Later ones are walked past and dropped.
    #[serde(default = "default_max_arguments")]
    pub max_arguments: usize,
}

/// Enough for a rename (two full file-info groups plus a timestamp).
pub const DEFAULT_MAX_ARGUMENTS: usize = 32;

fn default_max_arguments() -> usize {
    DEFAULT_MAX_ARGUMENTS
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            pid_width: PidWidth::default(),
            max_arguments: DEFAULT_MAX_ARGUMENTS,
        }
    }
}

impl DecoderConfig {
    /// Size of a record header under this configuration.
    #[must_use]
    pub const fn header_size(&self) -> usize {
        4 + self.pid_width.bytes()
    }
}

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    /// Raw event-type word, flag bits included.
    pub event_type: i32,
    pub pid: i64,
    pub arguments: Vec<Argument>,
}

impl EventRecord {
    /// Event code with the flag bits masked off.
    #[must_use]
    pub const fn code(&self) -> i32 {
        self.event_type & FSE_TYPE_MASK
    }

    #[must_use]
    pub const fn kind(&self) -> Option<EventType> {
        EventType::from_code(self.code())
    }

    #[must_use]
    pub const fn flags(&self) -> EventFlags {
        EventFlags::from_event_word(self.event_type)
    }

    /// Whether this is the "events dropped" sentinel.
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        self.code() == FSE_EVENTS_DROPPED
    }

    /// First string or path argument, as text.
    #[must_use]
    pub fn path(&self) -> Option<std::borrow::Cow<'_, str>> {
        self.arguments.iter().find_map(Argument::text)
    }
}

/// Outcome of [`Decoder::decode_next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Record(EventRecord),
    /// The record at the cursor continues past the valid bytes. The cursor
    /// has not moved.
    NeedMoreData,
}

/// Decodes records from a [`ByteCursor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    #[must_use]
    pub const fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode the record at the cursor.
    ///
    /// On [`Decoded::Record`] the cursor has moved past the record. On
    /// [`Decoded::NeedMoreData`] it is left at the record start, so the
    /// bytes can be retried once more are available.
    pub fn decode_next(&self, cursor: &mut ByteCursor<'_>) -> Result<Decoded, DecodeError> {
        let start = cursor.offset();
        match self.decode_record(cursor) {
            Ok(Some(record)) => Ok(Decoded::Record(record)),
            Ok(None) | Err(DecodeError::Truncated { .. }) => {
                cursor.rewind_to(start);
                Ok(Decoded::NeedMoreData)
            }
            Err(err) => Err(err),
        }
    }

    /// Decode every complete record in `bytes`.
    ///
    /// Returns the records and the number of bytes they occupied; anything
    /// after that is an incomplete record.
    pub fn decode_all(&self, bytes: &[u8]) -> Result<(Vec<EventRecord>, usize), DecodeError> {
        let mut cursor = ByteCursor::new(bytes);
        let mut records = Vec::new();
        while !cursor.is_empty() {
            match self.decode_next(&mut cursor)? {
                Decoded::Record(record) => records.push(record),
                Decoded::NeedMoreData => break,
            }
        }
        Ok((records, cursor.offset()))
    }

    /// `Ok(None)` when the valid bytes end before the argument list does.
    fn decode_record(&self, cursor: &mut ByteCursor<'_>) -> Result<Option<EventRecord>, DecodeError> {
        let event_type = cursor.peek_i32(0)?;
        let pid = match self.config.pid_width {
            PidWidth::Four => i64::from(cursor.peek_i32(4)?),
            PidWidth::Eight => cursor.peek_i64(4)?,
        };
        cursor.advance(self.config.header_size())?;

        let mut record = EventRecord {
            event_type,
            pid,
            arguments: Vec::new(),
        };

        if record.is_dropped() {
            return Ok(Some(record));
        }

        // Arguments past the cap are still walked so the cursor ends after
        // FSE_ARG_DONE; only their values are dropped.
        let mut state = Disambiguation::new();
        let mut skipped = 0usize;
        loop {
            if cursor.is_empty() {
                return Ok(None);
            }
            match decode_argument(cursor, &mut state)? {
                ArgumentStep::Decoded(argument)
                    if record.arguments.len() < self.config.max_arguments =>
                {
                    record.arguments.push(argument);
                }
                ArgumentStep::Decoded(_) => skipped += 1,
                ArgumentStep::ListComplete => break,
            }
        }

        if skipped > 0 {
            tracing::warn!(
                pid,
                skipped,
                max = self.config.max_arguments,
                "Argument limit reached, extra arguments dropped"
            );
        }

        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::DeviceNumber;
    use crate::writer::RecordWriter;

    fn decoder() -> Decoder {
        Decoder::default()
    }

    #[test]
    fn test_create_file_with_string() {
        let bytes = RecordWriter::new(EventType::CreateFile.code(), 123, PidWidth::Four)
            .string(b"abcde")
            .done()
            .into_bytes();

        let mut cursor = ByteCursor::new(&bytes);
        let decoded = decoder().decode_next(&mut cursor).unwrap();
        assert_eq!(
            decoded,
            Decoded::Record(EventRecord {
                event_type: EventType::CreateFile.code(),
                pid: 123,
                arguments: vec![Argument::String(b"abcde".to_vec())],
            })
        );
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_header_then_done_is_empty_record() {
        let bytes = RecordWriter::new(EventType::Delete.code(), 9, PidWidth::Four)
            .done()
            .into_bytes();
        let (records, used) = decoder().decode_all(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(records.len(), 1);
        assert!(records[0].arguments.is_empty());
        assert_eq!(records[0].kind(), Some(EventType::Delete));
    }

    #[test]
    fn test_dropped_consumes_only_header() {
        let mut bytes = RecordWriter::dropped(PidWidth::Four).into_bytes();
        let next = RecordWriter::new(EventType::Chown.code(), 5, PidWidth::Four)
            .uid(501)
            .done()
            .into_bytes();
        bytes.extend_from_slice(&next);

        let mut cursor = ByteCursor::new(&bytes);
        let Decoded::Record(first) = decoder().decode_next(&mut cursor).unwrap() else {
            panic!("expected a record");
        };
        assert!(first.is_dropped());
        assert!(first.arguments.is_empty());
        assert_eq!(cursor.offset(), 8);

        let Decoded::Record(second) = decoder().decode_next(&mut cursor).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(second.kind(), Some(EventType::Chown));
        assert_eq!(second.arguments, vec![Argument::Uid(501)]);
    }

    #[test]
    fn test_dropped_with_flag_bits() {
        let bytes = RecordWriter::new(FSE_EVENTS_DROPPED | (1 << 29), 0, PidWidth::Four).into_bytes();
        let (records, _) = decoder().decode_all(&bytes).unwrap();
        assert!(records[0].is_dropped());
        assert!(records[0].flags().contains(EventFlags::REMOTE_DIR_EVENT));
    }

    #[test]
    fn test_multiple_records_in_order_and_repeatable() {
        let mut bytes = Vec::new();
        for pid in 1..=3 {
            bytes.extend(
                RecordWriter::new(EventType::ContentModified.code(), pid, PidWidth::Four)
                    .string(b"/tmp/x\0")
                    .dev(0x0100_0002)
                    .ino(42)
                    .done()
                    .into_bytes(),
            );
        }

        let (first, used) = decoder().decode_all(&bytes).unwrap();
        let (second, _) = decoder().decode_all(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(first, second);
        assert_eq!(
            first.iter().map(|r| r.pid).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(
            first[0].arguments[1],
            Argument::Device(DeviceNumber(0x0100_0002))
        );
        assert_eq!(first[0].path().as_deref(), Some("/tmp/x"));
    }

    #[test]
    fn test_split_record_needs_more_data() {
        let bytes = RecordWriter::new(EventType::Rename.code(), 77, PidWidth::Four)
            .string(b"/a")
            .string(b"/b")
            .done()
            .into_bytes();

        // every proper prefix is incomplete and leaves the cursor untouched
        for cut in 0..bytes.len() {
            let mut cursor = ByteCursor::with_valid_len(&bytes, cut);
            assert_eq!(
                decoder().decode_next(&mut cursor).unwrap(),
                Decoded::NeedMoreData,
                "cut at {cut}"
            );
            assert_eq!(cursor.offset(), 0);
        }
    }

    #[test]
    fn test_eight_byte_pid() {
        let config = DecoderConfig {
            pid_width: PidWidth::Eight,
            ..DecoderConfig::default()
        };
        let bytes = RecordWriter::new(EventType::StatChanged.code(), 1 << 40, PidWidth::Eight)
            .done()
            .into_bytes();
        assert_eq!(bytes.len(), 4 + 8 + 2);

        let (records, _) = Decoder::new(config).decode_all(&bytes).unwrap();
        assert_eq!(records[0].pid, 1 << 40);
    }

    fn capped(max_arguments: usize) -> Decoder {
        Decoder::new(DecoderConfig {
            max_arguments,
            ..DecoderConfig::default()
        })
    }

    #[test]
    fn test_argument_cap_skips_to_done() {
        let first = RecordWriter::new(EventType::CreateFile.code(), 1, PidWidth::Four)
            .int32(1)
            .int32(2)
            .int32(3)
            .done()
            .into_bytes();
        let mut bytes = first.clone();
        bytes.extend(
            RecordWriter::new(EventType::Delete.code(), 77, PidWidth::Four)
                .string(b"/x")
                .done()
                .into_bytes(),
        );

        let mut cursor = ByteCursor::new(&bytes);
        let Decoded::Record(record) = capped(2).decode_next(&mut cursor).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(record.arguments, vec![Argument::Int32(1), Argument::Int32(2)]);
        assert_eq!(cursor.offset(), first.len());

        let (records, used) = capped(2).decode_all(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].kind(), Some(EventType::Delete));
        assert_eq!(records[1].pid, 77);
        assert_eq!(records[1].path().as_deref(), Some("/x"));
    }

    #[test]
    fn test_zero_cap_keeps_framing() {
        let mut bytes = Vec::new();
        for pid in [3, 4] {
            bytes.extend(
                RecordWriter::new(EventType::StatChanged.code(), pid, PidWidth::Four)
                    .string(b"/f\0")
                    .mode(0o100644)
                    .done()
                    .into_bytes(),
            );
        }
        let (records, used) = capped(0).decode_all(&bytes).unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(records.iter().map(|r| r.pid).collect::<Vec<_>>(), vec![3, 4]);
        assert!(records.iter().all(|r| r.arguments.is_empty()));
    }

    #[test]
    fn test_capped_record_split_needs_more_data() {
        let bytes = RecordWriter::new(EventType::CreateFile.code(), 1, PidWidth::Four)
            .int32(1)
            .int32(2)
            .int32(3)
            .done()
            .into_bytes();
        // cut inside the third argument, past the cap
        let mut cursor = ByteCursor::with_valid_len(&bytes, bytes.len() - 4);
        assert_eq!(
            capped(2).decode_next(&mut cursor).unwrap(),
            Decoded::NeedMoreData
        );
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn test_unknown_event_code_still_decodes() {
        let bytes = RecordWriter::new(0x0123, 4, PidWidth::Four)
            .int64(-9)
            .done()
            .into_bytes();
        let (records, _) = decoder().decode_all(&bytes).unwrap();
        assert_eq!(records[0].kind(), None);
        assert_eq!(records[0].arguments, vec![Argument::Int64(-9)]);
    }

    #[test]
    fn test_pid_width_from_u8() {
        assert_eq!(PidWidth::try_from(4), Ok(PidWidth::Four));
        assert_eq!(PidWidth::try_from(8), Ok(PidWidth::Eight));
        assert_eq!(PidWidth::try_from(2), Err(InvalidPidWidth(2)));
        assert_eq!(u8::from(PidWidth::Eight), 8);
    }
}
