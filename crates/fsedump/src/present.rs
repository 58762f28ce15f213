//! Plain-text rendering of decoded records.

use fsedump_protocol::{
    Argument, EventRecord, EventSink, EventType, ProcessNameCache, ProcessResolver,
};
use std::io::{self, Write};

/// Writes one line per record and resolves process names on the way.
pub struct Presenter<W, R> {
    out: W,
    names: ProcessNameCache<R>,
    error: Option<io::Error>,
}

impl<W: Write, R: ProcessResolver> Presenter<W, R> {
    pub fn new(out: W, resolver: R) -> Self {
        Self {
            out,
            names: ProcessNameCache::new(resolver),
            error: None,
        }
    }

    /// Flush output and report the first write error, if any.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write, R: ProcessResolver> EventSink for Presenter<W, R> {
    fn handle(&mut self, record: EventRecord) {
        // stop writing after the first failure (e.g. closed pipe)
        if self.error.is_some() {
            return;
        }
        let line = if record.is_dropped() {
            format_dropped()
        } else {
            let name = self.names.name(record.pid);
            format_record(&record, name)
        };
        if let Err(err) = writeln!(self.out, "{line}") {
            tracing::error!(error = %err, "Failed to write event");
            self.error = Some(err);
        }
    }
}

pub fn format_dropped() -> String {
    "*** Some events were dropped by the kernel".to_string()
}

/// `<label> pid=<pid> (<name>) [flags=..] <args..>`
pub fn format_record(record: &EventRecord, process: Option<&str>) -> String {
    let label = match record.kind() {
        Some(kind) => kind.label().to_string(),
        None => format!("UNKNOWN({})", record.code()),
    };

    let mut line = format!(
        "{label:<16} pid={} ({})",
        record.pid,
        process.unwrap_or("?")
    );

    let flags = record.flags();
    if !flags.is_empty() {
        let names: Vec<&str> = flags.iter_names().map(|(name, _)| name).collect();
        line.push_str(&format!(" flags={}", names.join("|")));
    }

    for argument in &record.arguments {
        line.push(' ');
        line.push_str(&format_argument(argument));
    }
    line
}

pub fn format_argument(argument: &Argument) -> String {
    match argument {
        Argument::Vnode(ptr) => format!("vnode={ptr:#x}"),
        Argument::String(_) => format!("string={:?}", argument.text().unwrap_or_default()),
        Argument::Path(_) => format!("path={:?}", argument.text().unwrap_or_default()),
        Argument::Int32(v) => format!("int32={v}"),
        Argument::Int64(v) => format!("int64={v}"),
        Argument::Raw(ptr) => format!("raw={ptr:#x}"),
        Argument::Inode(ino) => format!("ino={ino}"),
        Argument::Uid(uid) => format!("uid={uid}"),
        Argument::Gid(gid) => format!("gid={gid}"),
        Argument::FilesystemId(id) => format!("fsid={id:#x}"),
        Argument::Device(dev) => format!("dev={dev}"),
        Argument::Mode(mode) => format!("mode={mode}"),
        Argument::FileInfo(bytes) => format!("finfo=<{} bytes>", bytes.len()),
        Argument::Unknown { tag, bytes } => format!("arg{tag:#06x}=<{} bytes>", bytes.len()),
    }
}

/// The event table, one `<code> <name> <label>` line per type.
pub fn event_table() -> String {
    EventType::REPORTABLE
        .iter()
        .chain(std::iter::once(&EventType::EventsDropped))
        .map(|kind| format!("{:>4}  {:<26} {}\n", kind.code(), kind.name(), kind.label()))
        .collect()
}
