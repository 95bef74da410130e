//! Window manager adapters.

use std::collections::{HashMap, HashSet};
use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use super::{WindowHandle, WindowManager};
use crate::error::AppError;

/// Opens each URL by spawning `<launcher> <url>` as a child process.
///
/// The child is the window: closing kills it, and a child that has exited
/// on its own counts as closed.  Launchers that hand the URL to an already
/// running browser and exit immediately therefore produce sessions that are
/// reported closed right away.
pub struct LauncherWindows {
    program: String,
    args: Vec<String>,
    next_id: u64,
    children: HashMap<WindowHandle, Child>,
}

impl LauncherWindows {
    /// `command` is split on whitespace; the first word is the program.
    pub fn new(command: &str) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
            next_id: 1,
            children: HashMap::new(),
        })
    }

    /// Spawn the launcher for `url` and track the child under a new handle.
    pub fn launch(&mut self, url: &str) -> Result<WindowHandle, AppError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AppError::Window(format!("cannot spawn {}: {e}", self.program)))?;

        let handle = WindowHandle(self.next_id);
        self.next_id += 1;
        debug!(program = %self.program, %url, pid = child.id(), "window launched");
        self.children.insert(handle, child);
        Ok(handle)
    }
}

impl WindowManager for LauncherWindows {
    fn open(&mut self, url: &str) -> Option<WindowHandle> {
        match self.launch(url) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(%url, error = %e, "window launch failed");
                None
            }
        }
    }

    fn close(&mut self, handle: WindowHandle) {
        if let Some(mut child) = self.children.remove(&handle) {
            if let Err(e) = child.kill() {
                debug!(?handle, error = %e, "window already gone");
            }
            let _ = child.wait();
        }
    }

    fn is_closed(&mut self, handle: WindowHandle) -> bool {
        let Some(child) = self.children.get_mut(&handle) else {
            return true;
        };
        if matches!(child.try_wait(), Ok(None)) {
            return false;
        }
        // Exited (or unwaitable): reaped, stop tracking it.
        self.children.remove(&handle);
        true
    }
}

/// Tracks handles without showing anything.  Used when no launcher is
/// configured; a handle stays open until closed.
#[derive(Default)]
pub struct HeadlessWindows {
    next_id: u64,
    open: HashSet<WindowHandle>,
}

impl HeadlessWindows {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowManager for HeadlessWindows {
    fn open(&mut self, url: &str) -> Option<WindowHandle> {
        self.next_id += 1;
        let handle = WindowHandle(self.next_id);
        debug!(%url, ?handle, "headless window opened");
        self.open.insert(handle);
        Some(handle)
    }

    fn close(&mut self, handle: WindowHandle) {
        self.open.remove(&handle);
    }

    fn is_closed(&mut self, handle: WindowHandle) -> bool {
        !self.open.contains(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_tracks_open_and_close() {
        let mut w = HeadlessWindows::new();
        let a = w.open("https://a.example").unwrap();
        let b = w.open("https://b.example").unwrap();
        assert_ne!(a, b);
        assert!(!w.is_closed(a));
        w.close(a);
        assert!(w.is_closed(a));
        assert!(!w.is_closed(b));
    }

    #[test]
    fn blank_launcher_rejected() {
        assert!(LauncherWindows::new("   ").is_none());
    }

    #[test]
    fn missing_launcher_refuses_open() {
        let mut w = LauncherWindows::new("definitely-not-a-real-browser-binary --new-tab").unwrap();
        let err = w.launch("https://example.com").unwrap_err();
        assert!(matches!(err, AppError::Window(_)));
        assert!(w.open("https://example.com").is_none());
        assert!(w.children.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn exited_launchers_are_forgotten() {
        use crate::subsystems::assistant::sessions::SessionRegistry;
        use std::time::{Duration, Instant};

        let mut w = LauncherWindows::new("true").unwrap();
        let mut reg = SessionRegistry::new();
        for name in ["a", "b", "c", "d", "e"] {
            assert!(reg.open(&mut w, name, "https://example.com"));
        }
        assert_eq!(w.children.len(), 5);

        let deadline = Instant::now() + Duration::from_secs(5);
        while w.children.values_mut().any(|c| matches!(c.try_wait(), Ok(None))) {
            assert!(Instant::now() < deadline, "launchers did not exit");
            std::thread::sleep(Duration::from_millis(20));
        }

        reg.close_all(&mut w);
        assert!(reg.is_empty());
        assert!(w.children.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn launcher_child_is_the_window() {
        // `sleep 30` stands in for a browser process that stays up.
        let mut w = LauncherWindows::new("sleep").unwrap();
        let h = w.open("30").unwrap();
        assert!(!w.is_closed(h));
        w.close(h);
        assert!(w.is_closed(h));
    }
}
