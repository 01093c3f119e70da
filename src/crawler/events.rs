//! Scan notifications
//!
//! Observers receive events through an [`EventSink`] handed to the walker.
//! Sinks never influence control flow; a sink that drops events is as valid
//! as one that records them.

use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// Something that happened during a scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    /// One fetch attempt finished, successfully or not
    Attempt {
        url: String,
        /// Zero-based attempt index
        attempt: u32,
        status: String,
    },

    /// A page was merged into the scan result
    PageProcessed {
        page: u32,
        /// Pages completed / pages requested, in `0.0..=1.0`
        progress: f64,
        records: usize,
    },

    /// A record or page could not be processed
    ScanFailure { message: String },
}

/// Receiver for scan notifications
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ScanEvent);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ScanEvent) {}
}

/// Forwards events into a channel the caller drains
impl EventSink for UnboundedSender<ScanEvent> {
    fn emit(&self, event: ScanEvent) {
        // A closed receiver means nobody is listening anymore
        let _ = self.send(event);
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ScanEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events seen so far, in emission order
    pub fn events(&self) -> Vec<ScanEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn attempts(&self) -> Vec<ScanEvent> {
        self.filtered(|e| matches!(e, ScanEvent::Attempt { .. }))
    }

    pub fn pages(&self) -> Vec<ScanEvent> {
        self.filtered(|e| matches!(e, ScanEvent::PageProcessed { .. }))
    }

    pub fn failures(&self) -> Vec<ScanEvent> {
        self.filtered(|e| matches!(e, ScanEvent::ScanFailure { .. }))
    }

    fn filtered(&self, keep: impl Fn(&ScanEvent) -> bool) -> Vec<ScanEvent> {
        self.events().into_iter().filter(|e| keep(e)).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ScanEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
