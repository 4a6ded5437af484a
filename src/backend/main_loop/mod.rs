//! Backend main event loop: one task owns the client core and the socket.

pub mod handlers;
pub mod state;

pub use state::ConnectionState;

use std::future::pending;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use futures_util::StreamExt;
use tokio::runtime::Builder;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_tungstenite::tungstenite;
use tracing::{error, info};

use super::connection::WsStream;
use crate::client::Client;
use crate::config::Config;
use crate::protocol::{BackendAction, GuiEvent};

/// How often the loop looks at the UI channel when nothing else happens.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Loop state owned by the backend thread.
pub struct Driver {
    pub(super) client: Client,
    pub(super) ws: Option<WsStream>,
    pub(super) reconnect_at: Option<Instant>,
    pub(super) event_tx: Sender<GuiEvent>,
}

/// What woke the loop up.
enum Wake {
    Frame(Option<Result<tungstenite::Message, tungstenite::Error>>),
    Reconnect,
    Notification,
    Poll,
}

/// Run the backend event loop on a current-thread tokio runtime.
///
/// Returns when the UI sends [`BackendAction::Shutdown`] or drops its sender.
pub fn run_backend(config: Config, action_rx: Receiver<BackendAction>, event_tx: Sender<GuiEvent>) {
    let rt = match Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to create tokio runtime");
            let _ = event_tx.send(GuiEvent::Status(format!("Backend failed to start: {}", e)));
            return;
        }
    };

    rt.block_on(async move {
        let mut driver = Driver::new(Client::new(config), event_tx);
        driver.run(action_rx).await;
    });
}

impl Driver {
    pub fn new(client: Client, event_tx: Sender<GuiEvent>) -> Self {
        Self {
            client,
            ws: None,
            reconnect_at: None,
            event_tx,
        }
    }

    pub async fn run(&mut self, action_rx: Receiver<BackendAction>) {
        info!(nickname = %self.client.nickname(), "Backend started");
        let effects = self.client.start();
        self.execute(effects).await;

        loop {
            // Drain UI actions (non-blocking)
            loop {
                let action = match action_rx.try_recv() {
                    Ok(action) => action,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => BackendAction::Shutdown,
                };
                let shutdown = matches!(action, BackendAction::Shutdown);
                let effects = self
                    .client
                    .handle_action(action, std::time::Instant::now());
                self.execute(effects).await;
                if shutdown {
                    info!("Backend shutting down");
                    return;
                }
            }

            let reconnect_at = self.reconnect_at;
            let notify_at = self.client.next_deadline().map(Instant::from_std);

            let wake = tokio::select! {
                frame = next_frame(&mut self.ws) => Wake::Frame(frame),
                _ = sleep_until_some(reconnect_at) => Wake::Reconnect,
                _ = sleep_until_some(notify_at) => Wake::Notification,
                _ = sleep(POLL_INTERVAL) => Wake::Poll,
            };

            let effects = match wake {
                Wake::Frame(frame) => self.handle_frame(frame),
                Wake::Reconnect => {
                    self.reconnect_at = None;
                    self.client.reconnect_elapsed()
                }
                Wake::Notification => self.client.tick(std::time::Instant::now()),
                Wake::Poll => continue,
            };
            self.execute(effects).await;
        }
    }
}

async fn next_frame(
    ws: &mut Option<WsStream>,
) -> Option<Result<tungstenite::Message, tungstenite::Error>> {
    match ws {
        Some(ws) => ws.next().await,
        None => pending().await,
    }
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
