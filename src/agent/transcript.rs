//! Session transcript.
//!
//! Every externally visible moment of a run (status changes, the plan,
//! assistant text, tool traffic) is recorded as an event and echoed to
//! stdout for immediate feedback.

use chrono::{DateTime, Utc};

/// One recorded moment of an agent run.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEvent {
    Status(String),
    Plan(String),
    Assistant(String),
    ToolCall { name: String, arguments: String },
    ToolResponse { name: String, response: String },
}

/// An event plus the moment it was recorded.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub at: DateTime<Utc>,
    pub event: TranscriptEvent,
}

/// Ordered event log for a single run.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an event and prints it in a shape matched to its kind.
    pub fn push(&mut self, event: TranscriptEvent) {
        match &event {
            TranscriptEvent::Status(message) => println!("{}", message),
            TranscriptEvent::Plan(content) => println!("\nPlan:\n{}", content),
            TranscriptEvent::Assistant(content) => {
                if !content.is_empty() {
                    println!("\nAssistant:\n{}", content);
                }
            }
            TranscriptEvent::ToolCall { name, arguments } => {
                println!("\nTool call: {} with arguments {}", name, arguments);
            }
            TranscriptEvent::ToolResponse { name, response } => {
                println!("\nTool response for {}: {}", name, response);
            }
        }
        self.entries.push(TranscriptEntry {
            at: Utc::now(),
            event,
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn events(&self) -> impl Iterator<Item = &TranscriptEvent> {
        self.entries.iter().map(|entry| &entry.event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_recorded_in_order() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEvent::Status("Generating plan...".into()));
        transcript.push(TranscriptEvent::Plan("1. do the thing".into()));
        transcript.push(TranscriptEvent::ToolCall {
            name: "url_to_markdown".into(),
            arguments: "{\"url\":\"https://example.com\"}".into(),
        });

        assert_eq!(transcript.entries().len(), 3);
        assert_eq!(
            transcript.entries()[0].event,
            TranscriptEvent::Status("Generating plan...".into())
        );
        assert!(matches!(
            transcript.entries()[2].event,
            TranscriptEvent::ToolCall { .. }
        ));
        assert!(transcript.entries()[0].at <= transcript.entries()[2].at);
    }
}
