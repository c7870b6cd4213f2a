//! Outbound JSON-lines protocol. One object per line on stdout; nothing
//! else may write there.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::models::{Emotion, SessionStats};
use crate::sensing::ActivitySnapshot;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    Update {
        active_window: Option<String>,
        total_time_sec: u64,
        switches: u64,
        keys: u64,
        mouse: u64,
        is_inactive: bool,
        top_apps: Vec<(String, u64)>,
    },
    LeoComment {
        content: String,
        focus_score: u8,
        emotion: Emotion,
    },
    InitialAdvice {
        content: String,
    },
    Scold {
        target: String,
        message: String,
    },
    Status {
        message: String,
    },
    Report {
        content: String,
        stats: SessionStats,
        final_score: u8,
        grade: String,
        total_iterations: usize,
    },
}

impl From<ActivitySnapshot> for OutboundEvent {
    fn from(snapshot: ActivitySnapshot) -> Self {
        OutboundEvent::Update {
            active_window: snapshot.active_window,
            total_time_sec: snapshot.total_time_sec,
            switches: snapshot.switches,
            keys: snapshot.keys,
            mouse: snapshot.mouse,
            is_inactive: snapshot.is_inactive,
            top_apps: snapshot.top_apps,
        }
    }
}

impl OutboundEvent {
    pub fn status(message: impl Into<String>) -> Self {
        OutboundEvent::Status {
            message: message.into(),
        }
    }
}

/// Shared line writer. Cloning shares the sink, and each event is written
/// and flushed under one lock so lines never interleave.
#[derive(Clone)]
pub struct Emitter {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl Emitter {
    pub fn new(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn emit(&self, event: &OutboundEvent) -> Result<()> {
        let line = serde_json::to_string(event).context("Failed to serialize outbound event")?;
        let mut sink = match self.sink.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(sink, "{line}").context("Failed to write outbound event")?;
        sink.flush().context("Failed to flush outbound event")?;
        Ok(())
    }
}

/// In-memory sink for tests and embedding.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn lines(&self) -> Vec<String> {
        let bytes = match self.0.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.lock() {
            Ok(mut guard) => guard.extend_from_slice(buf),
            Err(poisoned) => poisoned.into_inner().extend_from_slice(buf),
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn emit_one(event: OutboundEvent) -> Value {
        let buffer = SharedBuffer::default();
        let emitter = Emitter::new(Box::new(buffer.clone()));
        emitter.emit(&event).unwrap();
        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        serde_json::from_str(&lines[0]).unwrap()
    }

    #[test]
    fn update_packet_shape() {
        let value = emit_one(OutboundEvent::Update {
            active_window: Some("Terminal".into()),
            total_time_sec: 12,
            switches: 3,
            keys: 40,
            mouse: 7,
            is_inactive: false,
            top_apps: vec![("Terminal".into(), 10), ("Safari".into(), 2)],
        });
        assert_eq!(
            value,
            json!({
                "type": "update",
                "active_window": "Terminal",
                "total_time_sec": 12,
                "switches": 3,
                "keys": 40,
                "mouse": 7,
                "is_inactive": false,
                "top_apps": [["Terminal", 10], ["Safari", 2]],
            })
        );
    }

    #[test]
    fn comment_and_scold_tags() {
        let comment = emit_one(OutboundEvent::LeoComment {
            content: "Focus.".into(),
            focus_score: 40,
            emotion: Emotion::Worried,
        });
        assert_eq!(comment["type"], "leo_comment");
        assert_eq!(comment["emotion"], "worried");

        let scold = emit_one(OutboundEvent::Scold {
            target: "YouTube".into(),
            message: "Enough.".into(),
        });
        assert_eq!(scold, json!({"type": "scold", "target": "YouTube", "message": "Enough."}));

        assert_eq!(emit_one(OutboundEvent::status("ready"))["type"], "status");
    }

    #[test]
    fn report_packet_carries_stats() {
        let value = emit_one(OutboundEvent::Report {
            content: "# Report".into(),
            stats: SessionStats::default(),
            final_score: 50,
            grade: "C".into(),
            total_iterations: 0,
        });
        assert_eq!(value["type"], "report");
        assert_eq!(value["final_score"], 50);
        assert_eq!(value["stats"]["total_switches"], 0);
    }
}
