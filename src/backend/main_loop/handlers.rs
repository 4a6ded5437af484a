//! Effect execution and inbound frame handling for the backend loop.

use std::collections::VecDeque;

use futures_util::SinkExt;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, trace, warn};

use super::Driver;
use crate::backend::connection::{decode_message, establish_connection, Inbound};
use crate::protocol::Effect;

impl Driver {
    /// Perform effects in order. Effects produced while doing so (transport
    /// callbacks) run after the ones already queued.
    pub async fn execute(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Open {
                    endpoint,
                    subprotocols,
                } => match establish_connection(&endpoint, &subprotocols).await {
                    Ok(ws) => {
                        self.ws = Some(ws);
                        queue.extend(self.client.transport_opened());
                    }
                    Err(e) => {
                        warn!(%endpoint, error = %e, "Connection failed");
                        queue.extend(self.client.transport_error(&e.to_string()));
                    }
                },
                Effect::Send(line) => {
                    let Some(ws) = self.ws.as_mut() else {
                        debug!(%line, "No transport, line dropped");
                        continue;
                    };
                    trace!(%line, "Sending");
                    if let Err(e) = ws.send(Message::Text(format!("{}\r\n", line))).await {
                        warn!(error = %e, "Write failed");
                        self.ws = None;
                        queue.extend(self.client.transport_error(&e.to_string()));
                    }
                }
                Effect::Close => {
                    if let Some(mut ws) = self.ws.take() {
                        let frame = CloseFrame {
                            code: CloseCode::Normal,
                            reason: "".into(),
                        };
                        if let Err(e) = ws.close(Some(frame)).await {
                            debug!(error = %e, "Close handshake failed");
                        }
                    }
                }
                Effect::ScheduleReconnect(delay) => {
                    self.reconnect_at = Instant::now().checked_add(delay);
                    if self.reconnect_at.is_none() {
                        warn!(?delay, "Reconnect delay out of range, timer not armed");
                    }
                }
                Effect::CancelReconnect => self.reconnect_at = None,
                Effect::Gui(event) => {
                    let _ = self.event_tx.send(event);
                }
            }
        }
    }

    /// Turn one read result into client effects.
    pub(super) fn handle_frame(
        &mut self,
        frame: Option<Result<Message, tungstenite::Error>>,
    ) -> Vec<Effect> {
        match frame {
            Some(Ok(message)) => match decode_message(message) {
                Inbound::Text(text) => self.client.receive_frame(&text, std::time::Instant::now()),
                Inbound::Closed(code) => {
                    self.ws = None;
                    self.client.transport_closed(code)
                }
                Inbound::Ignored => Vec::new(),
            },
            Some(Err(e)) => {
                warn!(error = %e, "Read error");
                self.ws = None;
                self.client.transport_error(&e.to_string())
            }
            None => {
                debug!("Stream ended without close frame");
                self.ws = None;
                self.client.transport_closed(None)
            }
        }
    }
}
