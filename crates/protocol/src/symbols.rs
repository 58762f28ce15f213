//! fsevents event and argument codes, and their display names.
//!
//! The numeric values match the Darwin kernel's `bsd/sys/fsevents.h` exactly.
//! Every table here is a `const` or a `match`, so lookups are free of
//! initialization order and safe to call from any thread.

use bitflags::bitflags;

/// Mask selecting the event code from the raw event-type word.
pub const FSE_TYPE_MASK: i32 = 0x0fff;

/// Event code of the "events dropped" sentinel record.
pub const FSE_EVENTS_DROPPED: i32 = 999;

/// Number of event codes the kernel accepts in a clone request.
pub const FSE_MAX_EVENTS: usize = 15;

/// Event-list value asking the kernel to report an event type.
pub const FSE_REPORT: i8 = 1;

/// Argument tag terminating a record's argument list. Carries no length.
pub const FSE_ARG_DONE: u16 = 0xb33f;

/// Known event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum EventType {
    CreateFile = 0,
    Delete = 1,
    StatChanged = 2,
    Rename = 3,
    ContentModified = 4,
    Exchange = 5,
    FinderInfoChanged = 6,
    CreateDir = 7,
    Chown = 8,
    XattrModified = 9,
    XattrRemoved = 10,
    DocIdCreated = 11,
    DocIdChanged = 12,
    UnmountPending = 13,
    Clone = 14,
    EventsDropped = FSE_EVENTS_DROPPED,
}

impl EventType {
    /// All event types that may appear in a clone request's event list.
    pub const REPORTABLE: [EventType; FSE_MAX_EVENTS] = [
        Self::CreateFile,
        Self::Delete,
        Self::StatChanged,
        Self::Rename,
        Self::ContentModified,
        Self::Exchange,
        Self::FinderInfoChanged,
        Self::CreateDir,
        Self::Chown,
        Self::XattrModified,
        Self::XattrRemoved,
        Self::DocIdCreated,
        Self::DocIdChanged,
        Self::UnmountPending,
        Self::Clone,
    ];

    /// Look up an event type by its masked code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        let kind = match code {
            0 => Self::CreateFile,
            1 => Self::Delete,
            2 => Self::StatChanged,
            3 => Self::Rename,
            4 => Self::ContentModified,
            5 => Self::Exchange,
            6 => Self::FinderInfoChanged,
            7 => Self::CreateDir,
            8 => Self::Chown,
            9 => Self::XattrModified,
            10 => Self::XattrRemoved,
            11 => Self::DocIdCreated,
            12 => Self::DocIdChanged,
            13 => Self::UnmountPending,
            14 => Self::Clone,
            FSE_EVENTS_DROPPED => Self::EventsDropped,
            _ => return None,
        };
        Some(kind)
    }

    /// The kernel's numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// The kernel's constant name, e.g. `FSE_CREATE_FILE`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateFile => "FSE_CREATE_FILE",
            Self::Delete => "FSE_DELETE",
            Self::StatChanged => "FSE_STAT_CHANGED",
            Self::Rename => "FSE_RENAME",
            Self::ContentModified => "FSE_CONTENT_MODIFIED",
            Self::Exchange => "FSE_EXCHANGE",
            Self::FinderInfoChanged => "FSE_FINDER_INFO_CHANGED",
            Self::CreateDir => "FSE_CREATE_DIR",
            Self::Chown => "FSE_CHOWN",
            Self::XattrModified => "FSE_XATTR_MODIFIED",
            Self::XattrRemoved => "FSE_XATTR_REMOVED",
            Self::DocIdCreated => "FSE_DOCID_CREATED",
            Self::DocIdChanged => "FSE_DOCID_CHANGED",
            Self::UnmountPending => "FSE_UNMOUNT_PENDING",
            Self::Clone => "FSE_CLONE",
            Self::EventsDropped => "FSE_EVENTS_DROPPED",
        }
    }

    /// Short human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::CreateFile => "Created",
            Self::Delete => "Deleted",
            Self::StatChanged => "Changed stat",
            Self::Rename => "Renamed",
            Self::ContentModified => "Modified",
            Self::Exchange => "Exchanged",
            Self::FinderInfoChanged => "Finder info",
            Self::CreateDir => "Created dir",
            Self::Chown => "Chowned",
            Self::XattrModified => "Changed xattr",
            Self::XattrRemoved => "Removed xattr",
            Self::DocIdCreated => "DocID created",
            Self::DocIdChanged => "DocID changed",
            Self::UnmountPending => "Unmount pending",
            Self::Clone => "Cloned",
            Self::EventsDropped => "Events dropped",
        }
    }
}

bitflags! {
    /// Flag bits carried in the high part of the event-type word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EventFlags: u32 {
        /// Subject is a hard link.
        const MODE_HLINK = 1 << 31;
        /// Last hard link to the subject.
        const MODE_LAST_HLINK = 1 << 30;
        /// Event originated on a remote directory.
        const REMOTE_DIR_EVENT = 1 << 29;
        /// A path argument was truncated by the kernel.
        const TRUNCATED_PATH = 1 << 28;
        /// Directory-optimization state should be cleared.
        const MODE_CLEAR_DIROPT = 1 << 27;
    }
}

impl EventFlags {
    /// Extract the flag bits from a raw event-type word.
    #[must_use]
    pub const fn from_event_word(word: i32) -> Self {
        Self::from_bits_truncate(word as u32)
    }
}

/// Known argument tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ArgumentType {
    Vnode = 0x0001,
    String = 0x0002,
    Path = 0x0003,
    Int32 = 0x0004,
    Int64 = 0x0005,
    Raw = 0x0006,
    Ino = 0x0007,
    Uid = 0x0008,
    Dev = 0x0009,
    Mode = 0x000a,
    Gid = 0x000b,
    Finfo = 0x000c,
    Done = FSE_ARG_DONE,
}

impl ArgumentType {
    /// Look up an argument type by tag.
    #[must_use]
    pub const fn from_tag(tag: u16) -> Option<Self> {
        let kind = match tag {
            0x0001 => Self::Vnode,
            0x0002 => Self::String,
            0x0003 => Self::Path,
            0x0004 => Self::Int32,
            0x0005 => Self::Int64,
            0x0006 => Self::Raw,
            0x0007 => Self::Ino,
            0x0008 => Self::Uid,
            0x0009 => Self::Dev,
            0x000a => Self::Mode,
            0x000b => Self::Gid,
            0x000c => Self::Finfo,
            FSE_ARG_DONE => Self::Done,
            _ => return None,
        };
        Some(kind)
    }

    #[must_use]
    pub const fn tag(self) -> u16 {
        self as u16
    }

    /// The kernel's constant name, e.g. `FSE_ARG_VNODE`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vnode => "FSE_ARG_VNODE",
            Self::String => "FSE_ARG_STRING",
            Self::Path => "FSE_ARG_PATH",
            Self::Int32 => "FSE_ARG_INT32",
            Self::Int64 => "FSE_ARG_INT64",
            Self::Raw => "FSE_ARG_RAW",
            Self::Ino => "FSE_ARG_INO",
            Self::Uid => "FSE_ARG_UID",
            Self::Dev => "FSE_ARG_DEV",
            Self::Mode => "FSE_ARG_MODE",
            Self::Gid => "FSE_ARG_GID",
            Self::Finfo => "FSE_ARG_FINFO",
            Self::Done => "FSE_ARG_DONE",
        }
    }

    /// Natural payload width for fixed-width tags, `None` for
    /// variable-length ones.
    #[must_use]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Vnode | Self::Raw | Self::Ino | Self::Int64 => Some(8),
            Self::Int32 | Self::Uid | Self::Gid | Self::Dev | Self::Mode => Some(4),
            Self::String | Self::Path | Self::Finfo | Self::Done => None,
        }
    }
}

/// Name of an event code, after masking off the flag bits.
#[must_use]
pub fn event_name(word: i32) -> Option<&'static str> {
    EventType::from_code(word & FSE_TYPE_MASK).map(EventType::name)
}

/// Name of an argument tag.
#[must_use]
pub fn argument_name(tag: u16) -> Option<&'static str> {
    ArgumentType::from_tag(tag).map(ArgumentType::name)
}

/// File-type names indexed by [`mode_type_index`].
pub const MODE_TYPE_NAMES: [&str; 9] = [
    "NONE", "FIFO", "CHR", "DIR", "BLK", "REG", "LNK", "SOCK", "BAD",
];

/// Map the `S_IFMT` nibble (`type_bits >> 12`) onto [`MODE_TYPE_NAMES`].
///
/// FIFO is the only odd file-type code; the even ones are halved and shifted
/// past it, so `S_IFCHR` (2) lands on 2, `S_IFDIR` (4) on 3 and so on up to
/// `S_IFWHT` (14) on `BAD`. Any other value has no entry.
#[must_use]
pub const fn mode_type_index(type_bits: u32) -> Option<usize> {
    match type_bits >> 12 {
        0 => Some(0),
        1 => Some(1),
        n if n % 2 == 0 && n <= 14 => Some(n as usize / 2 + 1),
        _ => None,
    }
}

/// Symbolic file-type name for packed mode type bits, `"?"` if unknown.
#[must_use]
pub const fn mode_type_name(type_bits: u32) -> &'static str {
    match mode_type_index(type_bits) {
        Some(index) => MODE_TYPE_NAMES[index],
        None => "?",
    }
}
