use context::SwitchEvent;

use crate::{EventSink, gate::remote_address};

/// Writes every switch event to the log as an audit record.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl LogEventSink {
    fn message(event: &SwitchEvent) -> String {
        format!(
            "Switch {}: authentication switched from '{}' to '{}' (remote: {})",
            event.kind().as_str(),
            event.previous().username(),
            event.current().username(),
            remote_address(event.details()),
        )
    }
}

impl EventSink for LogEventSink {
    fn publish(&self, event: SwitchEvent) {
        log::info!(
            kind = event.kind().as_str(),
            previous = event.previous().username(),
            current = event.current().username();
            "{}",
            Self::message(&event)
        );
    }
}
