//! Process-name lookup with a single-entry cache.
//!
//! Consecutive events usually come from the same process, so remembering
//! only the last pid avoids most lookups.

/// Resolves a process id to a short name.
pub trait ProcessResolver {
    /// `None` if the process is gone or the name is unavailable.
    fn resolve(&mut self, pid: i64) -> Option<String>;
}

impl<F> ProcessResolver for F
where
    F: FnMut(i64) -> Option<String>,
{
    fn resolve(&mut self, pid: i64) -> Option<String> {
        self(pid)
    }
}

/// Remembers the last resolved `(pid, name)` pair.
///
/// The entry is reused only when the requested pid equals the cached pid;
/// any other pid replaces it. A failed lookup is cached as well.
#[derive(Debug)]
pub struct ProcessNameCache<R> {
    resolver: R,
    last: Option<(i64, Option<String>)>,
}

impl<R: ProcessResolver> ProcessNameCache<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            last: None,
        }
    }

    /// Name for `pid`, resolving only on a cache miss.
    pub fn name(&mut self, pid: i64) -> Option<&str> {
        let hit = matches!(&self.last, Some((cached, _)) if *cached == pid);
        if !hit {
            let name = self.resolver.resolve(pid);
            tracing::trace!(pid, ?name, "Resolved process name");
            self.last = Some((pid, name));
        }
        self.last.as_ref().and_then(|(_, name)| name.as_deref())
    }
}
