//! Registry of windows this engine opened.

use tracing::debug;

use crate::subsystems::host::{WindowHandle, WindowManager};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenSession {
    pub handle: WindowHandle,
    /// Lowercased catalog name.
    pub site: String,
}

/// In-memory list of open sessions in opening order.  Empty on restart.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Vec<OpenSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the host to open `url`; track it under `name` on success.
    pub fn open(&mut self, windows: &mut dyn WindowManager, name: &str, url: &str) -> bool {
        match windows.open(url) {
            Some(handle) => {
                let site = name.to_lowercase();
                debug!(%site, ?handle, "session opened");
                self.sessions.push(OpenSession { handle, site });
                true
            }
            None => false,
        }
    }

    /// Close every live session whose name contains `token`
    /// (case-insensitive).  Matching sessions found already closed by the
    /// host are dropped too but do not count.  Returns whether anything was
    /// closed.
    pub fn close_by_name(&mut self, windows: &mut dyn WindowManager, token: &str) -> bool {
        let token = token.to_lowercase();
        let mut closed = false;
        self.sessions.retain(|s| {
            if !s.site.contains(&token) {
                return true;
            }
            if !windows.is_closed(s.handle) {
                windows.close(s.handle);
                closed = true;
            }
            false
        });
        closed
    }

    /// Close everything still open, then forget every entry.
    pub fn close_all(&mut self, windows: &mut dyn WindowManager) {
        for s in self.sessions.drain(..) {
            if !windows.is_closed(s.handle) {
                windows.close(s.handle);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.sessions.iter().map(|s| s.site.as_str()).collect()
    }

    pub fn sessions(&self) -> &[OpenSession] {
        &self.sessions
    }
}
