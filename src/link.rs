//! Controller link - outbound side of the connection to the controller
//!
//! The page manager only sees the [`ControllerLink`] trait. The wire
//! transport lives behind it; [`ChannelLink`] hands commands to whatever
//! task owns the socket and [`RecordingLink`] keeps them for inspection.

use crate::protocol::OutboundCommand;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{trace, warn};

/// Sink for panel to controller commands
///
/// Note: `send` takes `&self` and must not block; the manager calls it from
/// its serial executor.
pub trait ControllerLink: Send + Sync {
    fn name(&self) -> &str;

    fn send(&self, command: OutboundCommand);

    /// Whether the controller is reachable. Default: always connected
    fn is_connected(&self) -> bool {
        true
    }
}

/// Link backed by an unbounded tokio channel
pub struct ChannelLink {
    tx: mpsc::UnboundedSender<OutboundCommand>,
}

impl ChannelLink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ControllerLink for ChannelLink {
    fn name(&self) -> &str {
        "channel"
    }

    fn send(&self, command: OutboundCommand) {
        trace!("→ {}", command);
        if self.tx.send(command).is_err() {
            warn!("⚠️ Controller link closed, dropping outbound command");
        }
    }

    fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Link that records every command, for tests and dry runs
#[derive(Default)]
pub struct RecordingLink {
    sent: Mutex<Vec<OutboundCommand>>,
}

impl RecordingLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<OutboundCommand> {
        self.sent.lock().clone()
    }

    /// Drain the recorded commands
    pub fn take(&self) -> Vec<OutboundCommand> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl ControllerLink for RecordingLink {
    fn name(&self) -> &str {
        "recording"
    }

    fn send(&self, command: OutboundCommand) {
        self.sent.lock().push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Message;

    #[tokio::test]
    async fn test_channel_link_delivers_in_order() {
        let (link, mut rx) = ChannelLink::new();
        link.send(OutboundCommand::new(1, 5, Message::Push));
        link.send(OutboundCommand::new(1, 5, Message::Release));
        assert_eq!(rx.recv().await.unwrap().message, Message::Push);
        assert_eq!(rx.recv().await.unwrap().message, Message::Release);
        drop(rx);
        assert!(!link.is_connected());
    }

    #[test]
    fn test_recording_link_take() {
        let link = RecordingLink::new();
        link.send(OutboundCommand::new(1, 2, Message::Level(30)));
        assert_eq!(link.sent().len(), 1);
        assert_eq!(link.take().len(), 1);
        assert!(link.sent().is_empty());
    }
}
