//! Panel runtime - the serial executor that owns the page manager
//!
//! Producers never touch the manager. They push into channels through a
//! cloneable [`PanelHandle`] and return immediately; one tokio task drains
//! them with `select!` and applies every change in arrival order:
//!
//! ```text
//! controller link ─┐
//! REPL ────────────┼─► commands ─┐
//! config watcher ──┘             │
//! touch input ──────► clicks ────┼─► PanelRuntime ─► PageManager
//! manager ──────────► subviews ──┘        ▲
//!                                         │
//! timer tasks (popup timeouts, animations)┘
//! ```
//!
//! Settings changed inside the manager are published on a watch channel
//! after each step (see [`PanelHandle::subscribe_settings`]).

use crate::config::SystemSettings;
use crate::manager::{ClickEvent, PageManager, PanelSnapshot, PlatformEvent, TimerRequest};
use crate::panel::ButtonHandle;
use crate::protocol::{ProtocolEvent, StringMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Work for the executor, other than clicks and subview updates
#[derive(Debug)]
pub enum RuntimeCommand {
    Event(ProtocolEvent),
    Platform(PlatformEvent),
    Settings(SystemSettings),
    Timer(TimerRequest),
    Login {
        user: Option<String>,
        password: String,
    },
    Snapshot(oneshot::Sender<PanelSnapshot>),
    Shutdown,
}

// ============================================================================
// PanelHandle
// ============================================================================

/// Cloneable producer side of the runtime
#[derive(Clone)]
pub struct PanelHandle {
    commands: mpsc::UnboundedSender<RuntimeCommand>,
    clicks: mpsc::UnboundedSender<ClickEvent>,
    subviews: mpsc::UnboundedSender<ButtonHandle>,
    shutdown: Arc<watch::Sender<bool>>,
    settings: watch::Receiver<SystemSettings>,
}

impl PanelHandle {
    fn send(&self, command: RuntimeCommand) {
        if self.commands.send(command).is_err() {
            warn!("⚠️ Panel runtime stopped, command dropped");
        }
    }

    /// Queue a protocol event from the controller link
    pub fn deliver(&self, event: ProtocolEvent) {
        self.send(RuntimeCommand::Event(event));
    }

    /// Queue a command line generated inside the panel
    pub fn inject_line(&self, port: u16, line: &str) {
        self.deliver(ProtocolEvent::String(StringMessage::internal(port, line)));
    }

    pub fn mouse_event(&self, event: ClickEvent) {
        if self.clicks.send(event).is_err() {
            warn!("⚠️ Panel runtime stopped, click dropped");
        }
    }

    pub fn update_subview_item(&self, handle: ButtonHandle) {
        if self.subviews.send(handle).is_err() {
            warn!("⚠️ Panel runtime stopped, subview update dropped");
        }
    }

    pub fn platform_event(&self, event: PlatformEvent) {
        self.send(RuntimeCommand::Platform(event));
    }

    pub fn update_settings(&self, settings: SystemSettings) {
        self.send(RuntimeCommand::Settings(settings));
    }

    /// Password entered on the panel, with the user name for user logins
    pub fn login(&self, user: Option<&str>, password: &str) {
        self.send(RuntimeCommand::Login {
            user: user.map(str::to_string),
            password: password.to_string(),
        });
    }

    /// Settings as last changed by the manager, including system page edits
    pub fn subscribe_settings(&self) -> watch::Receiver<SystemSettings> {
        self.settings.clone()
    }

    /// Navigation state after every command queued before this call
    pub async fn snapshot(&self) -> Option<PanelSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.commands.send(RuntimeCommand::Snapshot(tx)).ok()?;
        rx.await.ok()
    }

    /// Stop the executor; idle or busy, it exits after the current command
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        // wakes a loop blocked on an empty command queue
        let _ = self.commands.send(RuntimeCommand::Shutdown);
    }

    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }
}

// ============================================================================
// PanelRuntime
// ============================================================================

/// Executor task state
pub struct PanelRuntime {
    manager: PageManager,
    commands: mpsc::UnboundedReceiver<RuntimeCommand>,
    /// Fed to timer tasks so expired timers re-enter the command queue
    commands_tx: mpsc::UnboundedSender<RuntimeCommand>,
    clicks: mpsc::UnboundedReceiver<ClickEvent>,
    subviews: mpsc::UnboundedReceiver<ButtonHandle>,
    subviews_tx: mpsc::UnboundedSender<ButtonHandle>,
    shutdown: watch::Receiver<bool>,
    settings: watch::Sender<SystemSettings>,
    published_generation: u64,
    /// Key of the last handled click, for coalescing repeats
    last_click: Option<(ButtonHandle, bool)>,
}

impl PanelRuntime {
    /// Move the manager onto its own task
    ///
    /// The join handle yields the manager back once the loop ends.
    pub fn spawn(manager: PageManager) -> (PanelHandle, JoinHandle<PageManager>) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (clicks_tx, clicks) = mpsc::unbounded_channel();
        let (subviews_tx, subviews) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown) = watch::channel(false);
        let (settings_tx, settings) = watch::channel(manager.settings().clone());
        let published_generation = manager.settings_generation();

        let handle = PanelHandle {
            commands: commands_tx.clone(),
            clicks: clicks_tx,
            subviews: subviews_tx.clone(),
            shutdown: Arc::new(shutdown_tx),
            settings,
        };
        let runtime = PanelRuntime {
            manager,
            commands,
            commands_tx,
            clicks,
            subviews,
            subviews_tx,
            shutdown,
            settings: settings_tx,
            published_generation,
            last_click: None,
        };
        (handle, tokio::spawn(runtime.run()))
    }

    async fn run(mut self) -> PageManager {
        info!("🚀 Panel runtime started");
        // power-up popups may already have armed timers
        self.drain_requests();

        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
                Some(command) = self.commands.recv() => {
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Some(click) = self.clicks.recv() => self.handle_click(click),
                Some(handle) = self.subviews.recv() => {
                    self.manager.process_subview_update(handle);
                }
            }

            self.drain_requests();
            if self.manager.is_stopped() {
                info!("Panel stopped by command");
                break;
            }
        }

        info!("Panel runtime stopped");
        self.manager
    }

    /// Returns false when the loop must stop
    fn handle_command(&mut self, command: RuntimeCommand) -> bool {
        match command {
            RuntimeCommand::Event(event) => self.manager.deliver(event),
            RuntimeCommand::Platform(event) => self.manager.platform_event(event),
            RuntimeCommand::Settings(settings) => {
                debug!("Applying new system settings");
                self.manager.update_settings(settings);
            }
            RuntimeCommand::Timer(timer) => self.manager.on_timer(timer),
            RuntimeCommand::Login { user, password } => {
                self.manager.login(user.as_deref(), &password);
            }
            RuntimeCommand::Snapshot(reply) => {
                let _ = reply.send(self.manager.snapshot());
            }
            RuntimeCommand::Shutdown => return false,
        }
        true
    }

    fn handle_click(&mut self, click: ClickEvent) {
        let key = click.key();
        if key.is_some() && key == self.last_click {
            trace!("Duplicate click {:?} coalesced", key);
            return;
        }
        self.last_click = key;
        self.manager.mouse_event(click);
    }

    /// Turn the manager's timer and subview requests into queue entries
    fn drain_requests(&mut self) {
        for timer in self.manager.take_timers() {
            let tx = self.commands_tx.clone();
            trace!("Timer armed: {:?}", timer);
            tokio::spawn(async move {
                tokio::time::sleep(timer.delay()).await;
                let _ = tx.send(RuntimeCommand::Timer(timer));
            });
        }
        for handle in self.manager.take_subview_updates() {
            let _ = self.subviews_tx.send(handle);
        }

        let generation = self.manager.settings_generation();
        if generation != self.published_generation {
            self.published_generation = generation;
            self.settings.send_replace(self.manager.settings().clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::RecordingLink;
    use crate::panel::{Address, Rect};
    use crate::project::{ButtonDef, PageDef, ProjectDef, ProjectResources, SubPageDef, SubViewDef};
    use crate::protocol::{Message, OutboundCommand};
    use crate::surface::{RecordingSurface, SurfaceCall};
    use std::time::Duration;

    fn make_test_project() -> ProjectDef {
        ProjectDef {
            name: "Runtime".into(),
            pages: vec![PageDef {
                id: 1,
                name: "Main".into(),
                buttons: vec![
                    ButtonDef {
                        index: 1,
                        rect: Rect::new(0, 0, 100, 100),
                        channel: Some(Address::new(1, 7)),
                        ..ButtonDef::default()
                    },
                    ButtonDef {
                        index: 2,
                        kind: crate::panel::ButtonType::SubPageView,
                        address: Some(Address::new(1, 60)),
                        subview: Some(SubViewDef {
                            items: vec!["Toast".into()],
                            ..SubViewDef::default()
                        }),
                        ..ButtonDef::default()
                    },
                ],
                ..PageDef::default()
            }],
            subpages: vec![SubPageDef {
                id: 500,
                name: "Toast".into(),
                rect: Rect::new(500, 500, 100, 100),
                timeout: 1,
                ..SubPageDef::default()
            }],
            ..ProjectDef::default()
        }
    }

    fn make_test_runtime() -> (
        PanelHandle,
        JoinHandle<PageManager>,
        Arc<RecordingLink>,
        Arc<RecordingSurface>,
    ) {
        let resources = ProjectResources::new(make_test_project()).unwrap();
        let link = Arc::new(RecordingLink::new());
        let surface = Arc::new(RecordingSurface::new());
        let mut manager = PageManager::new(
            Arc::new(resources),
            link.clone(),
            surface.clone(),
            SystemSettings::default(),
        );
        manager.start().unwrap();
        let (handle, task) = PanelRuntime::spawn(manager);
        (handle, task, link, surface)
    }

    /// Poll until `check` holds or a second has passed
    async fn wait_for(check: impl Fn() -> bool) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        check()
    }

    #[tokio::test]
    async fn test_injected_line_is_dispatched() {
        let (handle, task, _link, _surface) = make_test_runtime();
        handle.inject_line(1, "@PPN-Toast");

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.visible_popups.len(), 1);
        assert_eq!(snapshot.dispatched, 1);

        handle.shutdown();
        let manager = task.await.unwrap();
        assert_eq!(manager.snapshot().dispatched, 1);
        assert!(!handle.is_running());
    }

    #[tokio::test]
    async fn test_popup_timeout_fires() {
        let (handle, task, _link, _surface) = make_test_runtime();
        handle.inject_line(1, "@PPN-Toast");
        assert_eq!(handle.snapshot().await.unwrap().visible_popups.len(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(handle.snapshot().await.unwrap().visible_popups.is_empty());

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_repeated_clicks_are_coalesced() {
        let (handle, task, link, _surface) = make_test_runtime();
        let button = ButtonHandle::new(1, 1);
        let press = ClickEvent::Handle { handle: button, pressed: true, x: 5, y: 5 };
        let release = ClickEvent::Handle { handle: button, pressed: false, x: 5, y: 5 };
        for event in [press, press, release, release] {
            handle.mouse_event(event);
        }

        assert!(wait_for(|| link.sent().len() >= 2).await);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            link.sent(),
            vec![
                OutboundCommand::new(1, 7, Message::Push),
                OutboundCommand::new(1, 7, Message::Release),
            ]
        );

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_subview_updates_reach_surface() {
        let (handle, task, _link, surface) = make_test_runtime();
        handle.inject_line(1, "^SSH-60,Toast");

        let expected = SurfaceCall::SubViewItems {
            handle: ButtonHandle::new(1, 2),
            visible: vec!["Toast".into()],
        };
        assert!(wait_for(|| surface.calls().contains(&expected)).await);

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_settings_changes_are_published() {
        let (handle, task, _link, _surface) = make_test_runtime();
        let mut settings = handle.subscribe_settings();
        assert_eq!(settings.borrow().log_level, "info");

        handle.update_settings(SystemSettings {
            log_level: "trace".into(),
            ..SystemSettings::default()
        });
        tokio::time::timeout(Duration::from_secs(1), settings.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settings.borrow_and_update().log_level, "trace");

        handle.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_command_ends_loop() {
        let (handle, task, _link, surface) = make_test_runtime();
        handle.inject_line(1, "SHUTDOWN");

        let manager = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(manager.is_stopped());
        assert!(surface.calls().contains(&SurfaceCall::Shutdown));
        assert!(handle.snapshot().await.is_none());
    }
}
