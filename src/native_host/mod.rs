//! Chrome native messaging host.
//!
//! The extension forwards browser events and UI requests on stdin; rule
//! updates, notifications and responses go back on stdout.

mod bridge;
mod messages;
mod protocol;

pub use bridge::{NativeNotifier, NativeRuleHost, Outbox, TabRegistry};
pub use messages::{ControlMessage, HostEvent, IncomingMessage, OutgoingMessage};
pub use protocol::{read_frame, write_frame};

use crate::app::Sitewarden;
use crate::config::Config;
use crate::constants::MAX_MESSAGE_SIZE;
use crate::platform::{Notifier, RuleHost, TabHost};
use crate::store::Store;
use log::{debug, error, warn};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

pub struct NativeHost {
    app: Sitewarden,
    tabs: Arc<TabRegistry>,
    rules: Arc<NativeRuleHost>,
    outbox: Outbox,
    outgoing: mpsc::UnboundedReceiver<OutgoingMessage>,
}

impl NativeHost {
    pub fn new(store: Store, config: &Config) -> Self {
        let (outbox, outgoing) = Outbox::channel();
        let tabs = Arc::new(TabRegistry::default());
        let rules = Arc::new(NativeRuleHost::new(outbox.clone()));
        let notifier = Arc::new(NativeNotifier::new(outbox.clone()));
        let app = Sitewarden::new(
            store,
            Arc::clone(&tabs) as Arc<dyn TabHost>,
            Arc::clone(&rules) as Arc<dyn RuleHost>,
            notifier as Arc<dyn Notifier>,
            config,
        );
        Self {
            app,
            tabs,
            rules,
            outbox,
            outgoing,
        }
    }

    /// Serve until `reader` reaches end of input, then stop the background
    /// tasks and drain every queued message to `writer`.
    pub async fn run<R, W>(self, mut reader: R, mut writer: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Self {
            app,
            tabs,
            rules,
            outbox,
            mut outgoing,
        } = self;

        let writer_task = tokio::spawn(async move {
            while let Some(message) = outgoing.recv().await {
                let Some(payload) = encode_outgoing(&message) else {
                    continue;
                };
                write_frame(&mut writer, &payload).await?;
            }
            Ok::<_, io::Error>(())
        });

        app.start();
        let session = Session {
            app: &app,
            tabs: &tabs,
            rules: &rules,
            outbox: &outbox,
        };
        let served = session.serve(&mut reader).await;
        app.shutdown().await;

        // Closing every sender ends the writer once the queue is empty
        drop((app, tabs, rules, outbox));
        let written = writer_task
            .await
            .map_err(io::Error::other)?;
        served.and(written)
    }
}

/// Encode `message` for the wire. A response too large for one frame is
/// replaced by an error response for the same action; any other message
/// that cannot be sent is dropped.
fn encode_outgoing(message: &OutgoingMessage) -> Option<Vec<u8>> {
    let payload = match serde_json::to_vec(message) {
        Ok(payload) => payload,
        Err(e) => {
            error!("Failed to encode outgoing message: {e}");
            return None;
        }
    };
    if payload.len() <= MAX_MESSAGE_SIZE {
        return Some(payload);
    }

    error!(
        "Outgoing message of {} bytes exceeds the {MAX_MESSAGE_SIZE} byte limit",
        payload.len()
    );
    match message {
        OutgoingMessage::Response { action, .. } => {
            let fallback = OutgoingMessage::Response {
                action: action.clone(),
                ok: false,
                error: Some(format!("Response too large: {} bytes", payload.len())),
                data: None,
            };
            serde_json::to_vec(&fallback).ok()
        }
        OutgoingMessage::UpdateDynamicRules { .. } | OutgoingMessage::Notify { .. } => None,
    }
}

struct Session<'a> {
    app: &'a Sitewarden,
    tabs: &'a TabRegistry,
    rules: &'a NativeRuleHost,
    outbox: &'a Outbox,
}

impl Session<'_> {
    async fn serve<R: AsyncRead + Unpin>(&self, reader: &mut R) -> io::Result<()> {
        while let Some(frame) = read_frame(reader).await? {
            match serde_json::from_slice::<IncomingMessage>(&frame) {
                Ok(message) => self.dispatch(message).await,
                Err(e) => warn!("Ignoring unreadable message: {e}"),
            }
        }
        debug!("Extension closed the connection");
        Ok(())
    }

    async fn dispatch(&self, message: IncomingMessage) {
        match message {
            IncomingMessage::Event(event) => {
                self.track_host_state(&event);
                self.app.handle_event(&event).await;
            }
            IncomingMessage::Control(control) => {
                let action = control.action();
                let response = match self.app.handle_control(control).await {
                    Ok(data) => OutgoingMessage::Response {
                        action: action.to_string(),
                        ok: true,
                        error: None,
                        data,
                    },
                    Err(e) => {
                        warn!("{action} failed: {e}");
                        OutgoingMessage::Response {
                            action: action.to_string(),
                            ok: false,
                            error: Some(e.into()),
                            data: None,
                        }
                    }
                };
                if let Err(e) = self.outbox.send(response) {
                    error!("Failed to respond to {action}: {e}");
                }
            }
        }
    }

    /// Keep the host-side mirrors (tab URLs, installed rule ids) current.
    fn track_host_state(&self, event: &HostEvent) {
        match event {
            HostEvent::TabActivated { tab_id, url: Some(url) } | HostEvent::TabUpdated { tab_id, url } => {
                self.tabs.set_url(*tab_id, url);
            }
            HostEvent::TabRemoved { tab_id } => self.tabs.remove(*tab_id),
            HostEvent::RulesInstalled { rule_ids } => self.rules.set_installed(rule_ids.clone()),
            HostEvent::TabActivated { url: None, .. }
            | HostEvent::NavigationCompleted { .. }
            | HostEvent::StorageChanged { .. } => {}
        }
    }
}
