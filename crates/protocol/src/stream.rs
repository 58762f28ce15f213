//! Read loop feeding the record decoder.
//!
//! One blocking read at a time; everything in a read is decoded before the
//! next read is issued. Shutdown is checked between reads only.

use crate::argument::{ARG_HEADER_SIZE, TAG_SIZE};
use crate::cursor::{ByteCursor, DecodeError};
use crate::record::{Decoded, Decoder, EventRecord};
use crate::symbols::FSE_ARG_DONE;
use serde::{Deserialize, Serialize};
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Default read buffer size (1 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Error type for the read loop.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("read error: {0}")]
    Io(#[from] io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
}

/// Source of raw event bytes.
pub trait ChunkSource {
    /// Read up to `buf.len()` bytes. `Ok(0)` means end of stream.
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<R: Read> ChunkSource for R {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

/// Receives decoded records.
pub trait EventSink {
    fn handle(&mut self, record: EventRecord);
}

impl EventSink for Vec<EventRecord> {
    fn handle(&mut self, record: EventRecord) {
        self.push(record);
    }
}

/// Read-loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Size of the reusable read buffer.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Keep an incomplete trailing record and prepend it to the next read.
    /// When off, the tail is discarded.
    #[serde(default = "default_carry_over")]
    pub carry_over: bool,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_carry_over() -> bool {
    true
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
            carry_over: default_carry_over(),
        }
    }
}

/// Counters for one run of the read loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub reads: u64,
    pub bytes: u64,
    pub records: u64,
    /// "Events dropped" sentinels seen.
    pub dropped: u64,
    /// Bytes of incomplete records thrown away.
    pub discarded_bytes: u64,
}

/// Drives a [`Decoder`] over a [`ChunkSource`].
pub struct StreamDriver<S> {
    source: S,
    decoder: Decoder,
    config: StreamConfig,
    buf: Vec<u8>,
    /// Bytes at the front of `buf` left over from the previous read.
    pending: usize,
    /// Set while skipping a record larger than `buf`: payload bytes still to
    /// drop before the next argument header.
    oversized: Option<usize>,
    stats: StreamStats,
}

impl<S: ChunkSource> StreamDriver<S> {
    pub fn new(source: S, decoder: Decoder, config: StreamConfig) -> Self {
        let size = config.buffer_size.max(decoder.config().header_size());
        Self {
            source,
            decoder,
            config,
            buf: vec![0u8; size],
            pending: 0,
            oversized: None,
            stats: StreamStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Read and decode until end of stream or until `shutdown` is set.
    ///
    /// `shutdown` is checked before every read; a read already in progress
    /// is decoded to completion.
    pub fn run<K: EventSink>(
        &mut self,
        shutdown: &AtomicBool,
        sink: &mut K,
    ) -> Result<StreamStats, StreamError> {
        while !shutdown.load(Ordering::Relaxed) {
            let n = match self.source.read_chunk(&mut self.buf[self.pending..]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            self.stats.reads += 1;
            self.stats.bytes += n as u64;

            let valid = self.pending + n;
            let mut consumed = self.skip_oversized(0, valid)?;
            if self.oversized.is_none() {
                consumed = self.decode_buffer(consumed, valid, sink)?;
            }
            self.keep_tail(consumed, valid)?;
        }

        if self.oversized.take().is_some() {
            tracing::warn!("Stream ended inside an oversized record");
        }
        if self.pending > 0 {
            tracing::warn!(bytes = self.pending, "Stream ended inside a record");
            self.stats.discarded_bytes += self.pending as u64;
            self.pending = 0;
        }

        Ok(self.stats)
    }

    /// Decode records from `buf[start..valid]`, returning the offset reached.
    fn decode_buffer<K: EventSink>(
        &mut self,
        start: usize,
        valid: usize,
        sink: &mut K,
    ) -> Result<usize, DecodeError> {
        let mut cursor = ByteCursor::with_valid_len(&self.buf, valid);
        cursor.advance(start)?;
        while !cursor.is_empty() {
            let record = match self.decoder.decode_next(&mut cursor)? {
                Decoded::Record(record) => record,
                Decoded::NeedMoreData => break,
            };
            self.stats.records += 1;
            if record.is_dropped() {
                self.stats.dropped += 1;
                tracing::warn!(offset = cursor.offset(), "Kernel reported dropped events");
            }
            sink.handle(record);
        }
        Ok(cursor.offset())
    }

    /// Walk the argument list of an oversized record by declared lengths,
    /// dropping it up to and including `FSE_ARG_DONE`.
    ///
    /// Returns the offset reached. No-op unless a skip is in progress.
    fn skip_oversized(&mut self, start: usize, valid: usize) -> Result<usize, DecodeError> {
        let Some(mut skip) = self.oversized else {
            return Ok(start);
        };
        let mut cursor = ByteCursor::with_valid_len(&self.buf, valid);
        cursor.advance(start)?;

        let resume = loop {
            let n = skip.min(cursor.remaining());
            cursor.advance(n)?;
            skip -= n;
            if skip > 0 {
                break Some(skip);
            }
            match cursor.peek_u16(0) {
                Ok(FSE_ARG_DONE) => {
                    cursor.advance(TAG_SIZE)?;
                    break None;
                }
                Ok(_) => match cursor.peek_u16(TAG_SIZE) {
                    Ok(len) => {
                        cursor.advance(ARG_HEADER_SIZE)?;
                        skip = usize::from(len);
                    }
                    Err(DecodeError::Truncated { .. }) => break Some(0),
                    Err(err) => return Err(err),
                },
                Err(DecodeError::Truncated { .. }) => break Some(0),
                Err(err) => return Err(err),
            }
        };

        self.stats.discarded_bytes += (cursor.offset() - start) as u64;
        if resume.is_none() {
            tracing::debug!(offset = cursor.offset(), "Oversized record skipped");
        }
        self.oversized = resume;
        Ok(cursor.offset())
    }

    fn keep_tail(&mut self, consumed: usize, valid: usize) -> Result<(), DecodeError> {
        let tail = valid - consumed;
        if tail == 0 {
            self.pending = 0;
            return Ok(());
        }

        if !self.config.carry_over {
            tracing::warn!(bytes = tail, "Some events may be lost: incomplete record discarded");
            self.stats.discarded_bytes += tail as u64;
            self.pending = 0;
            return Ok(());
        }

        if tail == self.buf.len() {
            // The tail starts at a record header; drop it and every argument
            // that follows, across reads if need be.
            tracing::warn!(
                bytes = tail,
                "Record larger than the read buffer, discarding"
            );
            self.oversized = Some(self.decoder.config().header_size());
            let resumed = self.skip_oversized(consumed, valid)?;
            self.carry(resumed, valid);
            return Ok(());
        }

        tracing::debug!(bytes = tail, "Carrying incomplete record to next read");
        self.carry(consumed, valid);
        Ok(())
    }

    fn carry(&mut self, from: usize, valid: usize) {
        self.buf.copy_within(from..valid, 0);
        self.pending = valid - from;
    }
}

/// Copies every chunk read from `source` to `capture`.
///
/// A capture replayed through [`StreamDriver`] decodes to the same records
/// as the live session.
pub struct CaptureSource<S, W> {
    source: S,
    capture: W,
}

impl<S, W> CaptureSource<S, W> {
    pub fn new(source: S, capture: W) -> Self {
        Self { source, capture }
    }

    pub fn into_parts(self) -> (S, W) {
        (self.source, self.capture)
    }
}

impl<S: ChunkSource, W: Write> ChunkSource for CaptureSource<S, W> {
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.source.read_chunk(buf)?;
        self.capture.write_all(&buf[..n])?;
        Ok(n)
    }
}
