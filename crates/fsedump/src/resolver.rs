//! Platform process-name lookup.

use fsedump_protocol::ProcessResolver;

/// Looks up process names through the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl ProcessResolver for SystemResolver {
    fn resolve(&mut self, pid: i64) -> Option<String> {
        let pid = i32::try_from(pid).ok().filter(|&p| p > 0)?;
        lookup(pid)
    }
}

#[cfg(target_os = "macos")]
fn lookup(pid: i32) -> Option<String> {
    // MAXCOMLEN is 16; proc_name fills p_name, which may be twice that
    let mut buf = [0u8; 64];
    // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
    let len = unsafe {
        libc::proc_name(
            pid,
            buf.as_mut_ptr().cast::<libc::c_void>(),
            buf.len() as u32,
        )
    };
    if len <= 0 {
        return None;
    }
    let name = &buf[..len as usize];
    Some(String::from_utf8_lossy(name).into_owned())
}

#[cfg(not(target_os = "macos"))]
fn lookup(pid: i32) -> Option<String> {
    std::fs::read_to_string(format!("/proc/{pid}/comm"))
        .ok()
        .map(|name| name.trim_end().to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pids_resolve_to_none() {
        let mut resolver = SystemResolver;
        assert_eq!(resolver.resolve(0), None);
        assert_eq!(resolver.resolve(-1), None);
        assert_eq!(resolver.resolve(i64::MAX), None);
    }

    #[test]
    fn test_own_process_resolves() {
        let mut resolver = SystemResolver;
        let name = resolver.resolve(i64::from(std::process::id()));
        assert!(name.is_some_and(|n| !n.is_empty()));
    }
}
