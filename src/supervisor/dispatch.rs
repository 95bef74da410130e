//! Supervisor dispatch — generic trait for subsystem request handlers.
//!
//! Each subsystem implements [`BusHandler`] and registers with the supervisor
//! under its [`BusHandler::prefix`].  The supervisor routes incoming bus
//! messages to the matching handler without knowing the concrete type.
//!
//! # Method routing
//!
//! Method strings follow the form `"prefix/action"`.  The supervisor extracts
//! the first `/`-delimited segment and looks it up in its handler table; the
//! full method is passed on so the handler can do its own secondary routing.
//!
//! # Single writer
//!
//! Handlers are owned by the supervisor loop and receive `&mut self`, so any
//! state they hold is only ever touched from that one task.

use tokio::sync::oneshot;

use crate::supervisor::bus::{BusPayload, BusResult};

/// A subsystem that can handle [`crate::supervisor::bus::BusMessage`]s.
pub trait BusHandler: Send {
    /// The method prefix this handler owns (e.g. `"assistant"`).
    ///
    /// Must be unique across all registered handlers.  The supervisor panics
    /// on startup if two handlers share the same prefix.
    fn prefix(&self) -> &str;

    /// Handle an incoming request, taking ownership of `reply_tx`.
    ///
    /// Implementations **must not block** — resolve `reply_tx` before
    /// returning.
    fn handle_request(
        &mut self,
        method: &str,
        payload: BusPayload,
        reply_tx: oneshot::Sender<BusResult>,
    );

    /// Handle an incoming notification (fire-and-forget, no reply expected).
    ///
    /// Default: silently ignore.
    fn handle_notification(&mut self, _method: &str, _payload: BusPayload) {}

    /// Called once when the supervisor loop exits.
    fn shutdown(&mut self) {}
}
