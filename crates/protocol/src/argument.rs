//! Type-length-value argument decoding.
//!
//! Each argument on the wire is a `u16` tag, a `u16` length and `length`
//! payload bytes, all in native byte order. The `FSE_ARG_DONE` tag ends the
//! list and has no length field.

use crate::cursor::{ByteCursor, DecodeError};
use crate::symbols::{ArgumentType, FSE_ARG_DONE, mode_type_name};
use std::borrow::Cow;
use std::fmt;

/// Width of the tag field.
pub const TAG_SIZE: usize = 2;

/// Width of the tag and length fields together.
pub const ARG_HEADER_SIZE: usize = 4;

/// A packed `dev_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceNumber(pub u32);

impl DeviceNumber {
    /// High 8 bits, as Darwin's `major()`.
    #[must_use]
    pub const fn major(self) -> u32 {
        (self.0 >> 24) & 0xff
    }

    /// Low 24 bits, as Darwin's `minor()`.
    #[must_use]
    pub const fn minor(self) -> u32 {
        self.0 & 0x00ff_ffff
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.major(), self.minor())
    }
}

/// A packed `mode_t`: permission bits and file-type bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(pub u32);

impl FileMode {
    #[must_use]
    pub const fn permissions(self) -> u32 {
        self.0 & 0x0000_ffff
    }

    #[must_use]
    pub const fn type_bits(self) -> u32 {
        self.0 & 0xffff_f000
    }

    /// Symbolic file type, `"?"` if the type bits have no table entry.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        mode_type_name(self.type_bits())
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o} ({})", self.permissions() & 0o7777, self.type_name())
    }
}

/// One decoded argument. Every variant owns its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    /// Kernel vnode pointer. Opaque, never dereferenced.
    Vnode(u64),
    String(Vec<u8>),
    Path(Vec<u8>),
    Int32(i32),
    Int64(i64),
    /// Raw kernel pointer. Opaque.
    Raw(u64),
    Inode(u64),
    Uid(u32),
    Gid(u32),
    /// A `FSE_ARG_DEV` directly following a `FSE_ARG_VNODE`.
    FilesystemId(u32),
    Device(DeviceNumber),
    Mode(FileMode),
    FileInfo(Vec<u8>),
    /// Unrecognized tag, or a known fixed-width tag whose declared length is
    /// shorter than its natural width.
    Unknown { tag: u16, bytes: Vec<u8> },
}

impl Argument {
    /// Wire tag this argument was decoded from.
    #[must_use]
    pub const fn tag(&self) -> u16 {
        let kind = match self {
            Self::Vnode(_) => ArgumentType::Vnode,
            Self::String(_) => ArgumentType::String,
            Self::Path(_) => ArgumentType::Path,
            Self::Int32(_) => ArgumentType::Int32,
            Self::Int64(_) => ArgumentType::Int64,
            Self::Raw(_) => ArgumentType::Raw,
            Self::Inode(_) => ArgumentType::Ino,
            Self::Uid(_) => ArgumentType::Uid,
            Self::Gid(_) => ArgumentType::Gid,
            Self::FilesystemId(_) | Self::Device(_) => ArgumentType::Dev,
            Self::Mode(_) => ArgumentType::Mode,
            Self::FileInfo(_) => ArgumentType::Finfo,
            Self::Unknown { tag, .. } => return *tag,
        };
        kind.tag()
    }

    /// Text of a `String` or `Path` payload, trailing NULs stripped.
    #[must_use]
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::String(bytes) | Self::Path(bytes) => {
                let end = bytes
                    .iter()
                    .rposition(|&b| b != 0)
                    .map_or(0, |pos| pos + 1);
                Some(String::from_utf8_lossy(&bytes[..end]))
            }
            _ => None,
        }
    }
}

/// Whether the previous argument in the current record was a vnode.
///
/// Scoped to one record: create a fresh value for every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Disambiguation {
    after_vnode: bool,
}

impl Disambiguation {
    #[must_use]
    pub const fn new() -> Self {
        Self { after_vnode: false }
    }

    #[must_use]
    pub const fn after_vnode(self) -> bool {
        self.after_vnode
    }
}

/// Result of decoding at one argument position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentStep {
    Decoded(Argument),
    /// The `FSE_ARG_DONE` terminator was consumed.
    ListComplete,
}

/// Decode one argument at the cursor.
///
/// On `Truncated` the cursor is left where it was. On success it has moved
/// past the declared length, whatever the typed decode used of it.
pub fn decode_argument(
    cursor: &mut ByteCursor<'_>,
    state: &mut Disambiguation,
) -> Result<ArgumentStep, DecodeError> {
    let tag = cursor.peek_u16(0)?;
    if tag == FSE_ARG_DONE {
        cursor.advance(TAG_SIZE)?;
        return Ok(ArgumentStep::ListComplete);
    }

    let len = usize::from(cursor.peek_u16(TAG_SIZE)?);
    let payload = cursor.peek_at(ARG_HEADER_SIZE, len)?;

    let argument = decode_payload(tag, payload, state);
    if let Argument::Unknown { tag, bytes } = &argument {
        tracing::debug!(
            offset = cursor.offset(),
            tag = *tag,
            len = bytes.len(),
            "Undecoded argument"
        );
    }

    cursor.advance(ARG_HEADER_SIZE + len)?;
    Ok(ArgumentStep::Decoded(argument))
}

fn decode_payload(tag: u16, payload: &[u8], state: &mut Disambiguation) -> Argument {
    let unknown = || Argument::Unknown {
        tag,
        bytes: payload.to_vec(),
    };

    let Some(kind) = ArgumentType::from_tag(tag) else {
        state.after_vnode = false;
        return unknown();
    };

    let follows_vnode = std::mem::replace(&mut state.after_vnode, kind == ArgumentType::Vnode);

    let decoded = match kind {
        ArgumentType::Vnode => read::<8>(payload).map(|b| Argument::Vnode(u64::from_ne_bytes(b))),
        ArgumentType::String => Some(Argument::String(payload.to_vec())),
        ArgumentType::Path => Some(Argument::Path(payload.to_vec())),
        ArgumentType::Int32 => read::<4>(payload).map(|b| Argument::Int32(i32::from_ne_bytes(b))),
        ArgumentType::Int64 => read::<8>(payload).map(|b| Argument::Int64(i64::from_ne_bytes(b))),
        ArgumentType::Raw => read::<8>(payload).map(|b| Argument::Raw(u64::from_ne_bytes(b))),
        ArgumentType::Ino => read::<8>(payload).map(|b| Argument::Inode(u64::from_ne_bytes(b))),
        ArgumentType::Uid => read::<4>(payload).map(|b| Argument::Uid(u32::from_ne_bytes(b))),
        ArgumentType::Gid => read::<4>(payload).map(|b| Argument::Gid(u32::from_ne_bytes(b))),
        ArgumentType::Dev => read::<4>(payload).map(|b| {
            let raw = u32::from_ne_bytes(b);
            if follows_vnode {
                Argument::FilesystemId(raw)
            } else {
                Argument::Device(DeviceNumber(raw))
            }
        }),
        ArgumentType::Mode => {
            read::<4>(payload).map(|b| Argument::Mode(FileMode(u32::from_ne_bytes(b))))
        }
        ArgumentType::Finfo => Some(Argument::FileInfo(payload.to_vec())),
        // handled before the length is read
        ArgumentType::Done => None,
    };

    decoded.unwrap_or_else(unknown)
}

fn read<const N: usize>(payload: &[u8]) -> Option<[u8; N]> {
    payload.get(..N)?.try_into().ok()
}
