//! Downstream consumers of lifecycle events
//!
//! The tracker only returns events; the cycle hands them to a `SinkChain`. Sinks
//! must not block for long: the email sink only enqueues, and a background task
//! drains the queue, so a slow SMTP server never stalls a polling cycle.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, warn};

use crate::email::{EmailService, ReversalAlert};
use crate::event_journal::EventJournal;
use crate::flight_tracker::{EventKind, LifecycleEvent};

pub trait EventSink: Send + Sync {
    fn dispatch(&self, events: &[LifecycleEvent]);
}

/// Fan-out to every configured sink, in order
#[derive(Default)]
pub struct SinkChain {
    sinks: Vec<Box<dyn EventSink>>,
}

impl SinkChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for SinkChain {
    fn dispatch(&self, events: &[LifecycleEvent]) {
        if events.is_empty() {
            return;
        }
        for sink in &self.sinks {
            sink.dispatch(events);
        }
    }
}

/// Logs each event and counts it per kind
pub struct LoggingSink;

impl EventSink for LoggingSink {
    fn dispatch(&self, events: &[LifecycleEvent]) {
        for event in events {
            if event.is_reversal() {
                warn!(callsign = %event.callsign, "{}", event);
            } else {
                info!(callsign = %event.callsign, "{}", event);
            }
            metrics::counter!("fencewatch.events_total", "kind" => event.kind.as_str())
                .increment(1);
        }
    }
}

/// Appends each event to the daily event journal
pub struct JournalSink {
    journal: EventJournal,
}

impl JournalSink {
    pub fn new(journal: EventJournal) -> Self {
        Self { journal }
    }
}

impl EventSink for JournalSink {
    fn dispatch(&self, events: &[LifecycleEvent]) {
        for event in events {
            if let Err(e) = self.journal.append(event.at, &event.to_string()) {
                error!("Failed to journal event for {}: {:#}", event.callsign, e);
            }
        }
    }
}

/// Delivery channel for reversal alerts
#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn deliver(&self, alert: &ReversalAlert) -> Result<()>;
}

#[async_trait]
impl AlertTransport for EmailService {
    async fn deliver(&self, alert: &ReversalAlert) -> Result<()> {
        self.send_reversal_alert(alert).await?;
        Ok(())
    }
}

/// Queues a reversal alert for every `ReversalDetected` event
pub struct AlertSink {
    sender: flume::Sender<ReversalAlert>,
    zone_label: String,
}

impl AlertSink {
    /// Create the sink and spawn the background delivery task
    ///
    /// The task ends once every sender (the sink) has been dropped and the queue
    /// is drained.
    pub fn spawn(
        transport: Arc<dyn AlertTransport>,
        zone_label: impl Into<String>,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = flume::unbounded::<ReversalAlert>();

        let handle = tokio::spawn(
            async move {
                while let Ok(alert) = receiver.recv_async().await {
                    match transport.deliver(&alert).await {
                        Ok(()) => {
                            info!("Alert sent for {}", alert.callsign);
                            metrics::counter!("fencewatch.alerts_sent_total").increment(1);
                        }
                        Err(e) => {
                            error!("Failed to send alert for {}: {:#}", alert.callsign, e);
                            metrics::counter!("fencewatch.alerts_failed_total").increment(1);
                        }
                    }
                }
            }
            .instrument(tracing::info_span!("alert_delivery")),
        );

        (
            Self {
                sender,
                zone_label: zone_label.into(),
            },
            handle,
        )
    }
}

impl EventSink for AlertSink {
    fn dispatch(&self, events: &[LifecycleEvent]) {
        for event in events {
            let EventKind::ReversalDetected { delta_deg } = event.kind else {
                continue;
            };
            let alert = ReversalAlert {
                callsign: event.callsign.clone(),
                delta_deg,
                detected_at: event.at,
                zone_label: self.zone_label.clone(),
            };
            if self.sender.send(alert).is_err() {
                error!("Alert queue closed, dropping alert for {}", event.callsign);
            }
        }
    }
}
