//! Bounds-checked read position over one read's worth of bytes.

use thiserror::Error;

/// Error type for decoding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not enough bytes left to decode the next field.
    #[error("truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// An advance past the valid length. Indicates a framing bug.
    #[error("advance of {requested} bytes past valid length ({remaining} remaining)")]
    OutOfRange { requested: usize, remaining: usize },
}

/// A read position over `buffer[..valid_len]`.
///
/// Invariant: `offset <= valid_len <= buffer.len()`. Bytes past `valid_len`
/// are never exposed, even when the buffer is larger.
#[derive(Debug, Clone, Copy)]
pub struct ByteCursor<'a> {
    buffer: &'a [u8],
    offset: usize,
    valid_len: usize,
}

impl<'a> ByteCursor<'a> {
    /// Cursor over the whole slice.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            offset: 0,
            valid_len: buffer.len(),
        }
    }

    /// Cursor over the first `valid_len` bytes of `buffer`.
    ///
    /// `valid_len` is clamped to the buffer size.
    #[must_use]
    pub fn with_valid_len(buffer: &'a [u8], valid_len: usize) -> Self {
        Self {
            buffer,
            offset: 0,
            valid_len: valid_len.min(buffer.len()),
        }
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn valid_len(&self) -> usize {
        self.valid_len
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.valid_len - self.offset
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The next `n` bytes, without advancing.
    pub fn peek(&self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.peek_at(0, n)
    }

    /// `n` bytes starting `skip` bytes past the current offset, without
    /// advancing.
    pub fn peek_at(&self, skip: usize, n: usize) -> Result<&'a [u8], DecodeError> {
        let needed = skip.saturating_add(n);
        if needed > self.remaining() {
            return Err(DecodeError::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        let start = self.offset + skip;
        Ok(&self.buffer[start..start + n])
    }

    pub fn advance(&mut self, n: usize) -> Result<(), DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::OutOfRange {
                requested: n,
                remaining: self.remaining(),
            });
        }
        self.offset += n;
        Ok(())
    }

    /// Peek `N` bytes at `skip` as a fixed-size array.
    pub fn peek_array<const N: usize>(&self, skip: usize) -> Result<[u8; N], DecodeError> {
        let bytes = self.peek_at(skip, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn peek_u16(&self, skip: usize) -> Result<u16, DecodeError> {
        self.peek_array(skip).map(u16::from_ne_bytes)
    }

    pub fn peek_i32(&self, skip: usize) -> Result<i32, DecodeError> {
        self.peek_array(skip).map(i32::from_ne_bytes)
    }

    pub fn peek_i64(&self, skip: usize) -> Result<i64, DecodeError> {
        self.peek_array(skip).map(i64::from_ne_bytes)
    }

    /// Move back to an offset previously returned by [`Self::offset`].
    ///
    /// Used to undo a partially decoded record.
    pub(crate) fn rewind_to(&mut self, offset: usize) {
        debug_assert!(offset <= self.offset);
        self.offset = offset.min(self.offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_does_not_advance() {
        let data = [1u8, 2, 3, 4];
        let cursor = ByteCursor::new(&data);
        assert_eq!(cursor.peek(2).unwrap(), &[1, 2]);
        assert_eq!(cursor.offset(), 0);
        assert_eq!(cursor.remaining(), 4);
    }

    #[test]
    fn test_valid_len_hides_tail() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let cursor = ByteCursor::with_valid_len(&data, 3);
        assert_eq!(cursor.remaining(), 3);
        assert_eq!(
            cursor.peek(4),
            Err(DecodeError::Truncated {
                needed: 4,
                remaining: 3
            })
        );
    }

    #[test]
    fn test_valid_len_clamped_to_buffer() {
        let data = [0u8; 4];
        let cursor = ByteCursor::with_valid_len(&data, 100);
        assert_eq!(cursor.valid_len(), 4);
    }

    #[test]
    fn test_advance_past_end_is_out_of_range() {
        let data = [0u8; 4];
        let mut cursor = ByteCursor::new(&data);
        cursor.advance(3).unwrap();
        assert_eq!(
            cursor.advance(2),
            Err(DecodeError::OutOfRange {
                requested: 2,
                remaining: 1
            })
        );
        assert_eq!(cursor.offset(), 3);
        cursor.advance(1).unwrap();
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_peek_integers_native_endian() {
        let mut data = Vec::new();
        data.extend_from_slice(&0xb33fu16.to_ne_bytes());
        data.extend_from_slice(&(-7i32).to_ne_bytes());
        let cursor = ByteCursor::new(&data);
        assert_eq!(cursor.peek_u16(0).unwrap(), 0xb33f);
        assert_eq!(cursor.peek_i32(2).unwrap(), -7);
        assert!(cursor.peek_i64(2).is_err());
    }

    #[test]
    fn test_peek_at_overflowing_skip() {
        let data = [0u8; 4];
        let cursor = ByteCursor::new(&data);
        assert!(matches!(
            cursor.peek_at(usize::MAX, 2),
            Err(DecodeError::Truncated { .. })
        ));
    }
}
