//! Telemetry recorder: structured decision-point events, fire-and-forget.
//!
//! Recording must never block or abort the calling workflow: events go
//! through a bounded channel into a background drain task; a full channel
//! drops the event with a low-severity log line, and sink failures are
//! retried a bounded number of times before being swallowed. Telemetry is
//! purely observational and never gates behavior.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};

/// A named event with a flat scalar property map.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    pub name: String,
    pub properties: Map<String, Value>,
    pub ts: DateTime<Utc>,
}

/// Destination for drained events. Emission failures are the sink's own
/// problem; the recorder retries then drops.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: &TelemetryEvent) -> anyhow::Result<()>;
}

/// Default sink: structured log lines under the `telemetry` target.
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn emit(&self, event: &TelemetryEvent) -> anyhow::Result<()> {
        let properties = Value::Object(event.properties.clone());
        tracing::info!(
            target: "telemetry",
            name = %event.name,
            properties = %properties,
            ts = %event.ts.to_rfc3339(),
            "event"
        );
        Ok(())
    }
}

/// In-memory sink for tests and local inspection.
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl MemorySink {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.name).collect()
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, event: &TelemetryEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?
            .push(event.clone());
        Ok(())
    }
}

enum Envelope {
    Event(TelemetryEvent),
    Flush(oneshot::Sender<()>),
}

/// Handle shared by every component; cheap to clone. Dropping all handles
/// shuts the drain task down.
#[derive(Clone)]
pub struct TelemetryRecorder {
    tx: mpsc::Sender<Envelope>,
}

impl TelemetryRecorder {
    /// Spawn the drain task. `buffer` bounds in-flight events; `retries` is
    /// the per-event emission retry budget.
    pub fn spawn(sink: Arc<dyn TelemetrySink>, buffer: usize, retries: u32) -> Self {
        let (tx, mut rx) = mpsc::channel::<Envelope>(buffer.max(1));
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                match envelope {
                    Envelope::Event(event) => {
                        let mut attempt = 0;
                        loop {
                            match sink.emit(&event) {
                                Ok(()) => break,
                                Err(e) if attempt < retries => {
                                    attempt += 1;
                                    tracing::debug!(
                                        name = %event.name,
                                        attempt,
                                        "telemetry emit retry: {e}"
                                    );
                                }
                                Err(e) => {
                                    tracing::warn!(
                                        name = %event.name,
                                        "telemetry event dropped after {attempt} retries: {e}"
                                    );
                                    break;
                                }
                            }
                        }
                    }
                    Envelope::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });
        Self { tx }
    }

    /// Record an event. Never blocks and never fails the caller; when the
    /// channel is full the event is dropped with a debug log line.
    pub fn record(&self, name: &str, properties: Map<String, Value>) {
        let event = TelemetryEvent {
            name: name.to_string(),
            properties,
            ts: Utc::now(),
        };
        if let Err(e) = self.tx.try_send(Envelope::Event(event)) {
            tracing::debug!(name, "telemetry event dropped: {e}");
        }
    }

    /// Wait until every event recorded before this call has been drained.
    /// Used at shutdown and in tests; the hot path never awaits this.
    pub async fn flush(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(Envelope::Flush(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// Build a flat property map from key/value pairs.
pub fn props<I, K>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn events_reach_the_sink_in_order() {
        let sink = Arc::new(MemorySink::default());
        let recorder = TelemetryRecorder::spawn(sink.clone(), 16, 1);
        recorder.record("first", props([("n", json!(1))]));
        recorder.record("second", props([("n", json!(2))]));
        recorder.flush().await;
        assert_eq!(sink.names(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn failing_sink_never_propagates() {
        struct Broken;
        impl TelemetrySink for Broken {
            fn emit(&self, _event: &TelemetryEvent) -> anyhow::Result<()> {
                anyhow::bail!("sink offline")
            }
        }
        let recorder = TelemetryRecorder::spawn(Arc::new(Broken), 4, 2);
        // Must not panic or error out.
        recorder.record("doomed", Map::new());
        recorder.flush().await;
    }

    #[tokio::test]
    async fn full_channel_drops_instead_of_blocking() {
        struct Slow;
        impl TelemetrySink for Slow {
            fn emit(&self, _event: &TelemetryEvent) -> anyhow::Result<()> {
                std::thread::sleep(std::time::Duration::from_millis(5));
                Ok(())
            }
        }
        let recorder = TelemetryRecorder::spawn(Arc::new(Slow), 1, 0);
        for i in 0..64 {
            // Some of these overflow the buffer; record must return promptly
            // either way.
            recorder.record(&format!("burst-{i}"), Map::new());
        }
        recorder.flush().await;
    }
}
