//! Opening and cloning the fsevents device.
//!
//! The device node itself delivers nothing; reads come from a descriptor
//! obtained with the `FSEVENTS_CLONE` ioctl, which also selects the
//! reported event types and the kernel queue depth.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for device setup.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device exists but the caller lacks privileges.
    #[error("opening {} requires root permissions", .0.display())]
    PermissionDenied(PathBuf),

    /// No device node at the path.
    #[error("device {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("FSEVENTS_CLONE ioctl failed: {0}")]
    Clone(#[source] io::Error),

    #[error("live fsevents capture is only available on macOS; use `replay`")]
    Unsupported,
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
fn classify_open_error(path: &Path, err: io::Error) -> DeviceError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => DeviceError::PermissionDenied(path.to_path_buf()),
        io::ErrorKind::NotFound => DeviceError::NotFound(path.to_path_buf()),
        _ => DeviceError::Open {
            path: path.to_path_buf(),
            source: err,
        },
    }
}

/// Open `path`, clone it for every event type, and return the clone.
#[cfg(target_os = "macos")]
pub fn open_cloned(path: &Path, queue_depth: i32) -> Result<File, DeviceError> {
    use fsedump_protocol::{FSE_MAX_EVENTS, FSE_REPORT};
    use std::os::fd::{AsRawFd, FromRawFd};

    /// `fsevent_clone_args` from `bsd/sys/fsevents.h`.
    #[repr(C)]
    struct CloneArgs {
        event_list: *mut i8,
        num_events: i32,
        event_queue_depth: i32,
        fd: *mut libc::c_int,
    }

    const IOC_IN: libc::c_ulong = 0x8000_0000;
    const IOCPARM_MASK: libc::c_ulong = 0x1fff;

    /// `_IOW('s', 1, fsevent_clone_args)`
    const FSEVENTS_CLONE: libc::c_ulong = IOC_IN
        | ((std::mem::size_of::<CloneArgs>() as libc::c_ulong & IOCPARM_MASK) << 16)
        | ((b's' as libc::c_ulong) << 8)
        | 1;

    let device = File::open(path).map_err(|e| classify_open_error(path, e))?;

    let mut events = [FSE_REPORT; FSE_MAX_EVENTS];
    let mut cloned: libc::c_int = -1;
    let mut args = CloneArgs {
        event_list: events.as_mut_ptr(),
        num_events: FSE_MAX_EVENTS as i32,
        event_queue_depth: queue_depth,
        fd: &mut cloned,
    };

    // SAFETY: `args` and the buffers it points to outlive the call, and the
    // layout matches the kernel's fsevent_clone_args.
    let rc = unsafe { libc::ioctl(device.as_raw_fd(), FSEVENTS_CLONE, &mut args as *mut CloneArgs) };
    if rc < 0 {
        return Err(DeviceError::Clone(io::Error::last_os_error()));
    }

    tracing::debug!(fd = cloned, queue_depth, "Cloned fsevents descriptor");

    // The original descriptor is no longer needed
    drop(device);

    // SAFETY: the ioctl succeeded, so `cloned` is a fresh descriptor owned by us.
    Ok(unsafe { File::from_raw_fd(cloned) })
}

#[cfg(not(target_os = "macos"))]
pub fn open_cloned(path: &Path, _queue_depth: i32) -> Result<File, DeviceError> {
    tracing::debug!(path = %path.display(), "No fsevents device on this platform");
    Err(DeviceError::Unsupported)
}

/// Whether the process runs with root privileges.
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_distinct() {
        let err = classify_open_error(
            Path::new("/dev/fsevents"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, DeviceError::PermissionDenied(_)));
        assert_eq!(err.to_string(), "opening /dev/fsevents requires root permissions");
    }

    #[test]
    fn test_missing_device_is_distinct() {
        let err = classify_open_error(
            Path::new("/dev/nope"),
            io::Error::from(io::ErrorKind::NotFound),
        );
        assert!(matches!(err, DeviceError::NotFound(_)));
    }

    #[test]
    fn test_other_open_errors_keep_source() {
        let err = classify_open_error(
            Path::new("/dev/fsevents"),
            io::Error::other("busy"),
        );
        assert!(matches!(err, DeviceError::Open { .. }));
        assert!(err.to_string().contains("busy"));
    }

    #[test]
    #[cfg(not(target_os = "macos"))]
    fn test_open_unsupported_off_macos() {
        let err = open_cloned(Path::new("/dev/fsevents"), 100).unwrap_err();
        assert!(matches!(err, DeviceError::Unsupported));
    }
}
