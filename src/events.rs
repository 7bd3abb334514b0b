//! One-way notifications from the workers to whoever drives the UI

use std::sync::mpsc::{Receiver, Sender};

use crate::fishing::CatchRecord;

/// Event emitted by a worker; delivery is fire-and-forget
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// Free-form progress line from the automation loop
    Log(String),
    /// Short status string ("running", "paused: out of bait", ...)
    Status(String),
    /// A landed and transcribed catch
    Record(CatchRecord),
    /// A hooked fish got away during reeling
    Escaped,
    /// Progress line from the popup handler
    PopupLog(String),
}

/// Cloneable sending half handed to each worker.
///
/// A missing receiver is not an error: events are dropped and the trace log
/// still carries them.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: Option<Sender<CoreEvent>>,
}

impl EventSink {
    pub fn new(tx: Sender<CoreEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Sink that only traces
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, Receiver<CoreEvent>) {
        let (tx, rx) = std::sync::mpsc::channel();
        (Self::new(tx), rx)
    }

    pub fn log(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("[FISH] {}", text);
        self.send(CoreEvent::Log(text));
    }

    pub fn status(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("[STATUS] {}", text);
        self.send(CoreEvent::Status(text));
    }

    pub fn record(&self, record: CatchRecord) {
        tracing::info!(
            "[RECORD] {} {} {:.3}kg new_record={}",
            record.name,
            record.quality.label(),
            record.weight,
            record.is_new_record
        );
        self.send(CoreEvent::Record(record));
    }

    pub fn escaped(&self) {
        tracing::info!("[RECORD] fish escaped");
        self.send(CoreEvent::Escaped);
    }

    pub fn popup_log(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!("[POPUP] {}", text);
        self.send(CoreEvent::PopupLog(text));
    }

    fn send(&self, event: CoreEvent) {
        if let Some(tx) = &self.tx {
            // receiver gone means the controller is shutting down
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_delivers_in_order() {
        let (sink, rx) = EventSink::channel();
        sink.log("casting");
        sink.status("running");
        sink.escaped();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                CoreEvent::Log("casting".into()),
                CoreEvent::Status("running".into()),
                CoreEvent::Escaped,
            ]
        );
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.popup_log("still fine");
        EventSink::discard().status("nobody listening");
    }
}
