use console::Style;
use std::sync::{Mutex, PoisonError};

/// Write-only narration sink for build progress.
pub trait Ui: Send + Sync {
    fn say(&self, message: &str);

    fn error(&self, message: &str);
}

/// Prints `==> <prefix>: <message>` lines to stderr.
pub struct ConsoleUi {
    prefix: String,
}

impl ConsoleUi {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
        }
    }
}

impl Default for ConsoleUi {
    fn default() -> Self {
        Self::new("ankabuild")
    }
}

impl Ui for ConsoleUi {
    fn say(&self, message: &str) {
        let arrow = Style::new().green().bold().apply_to("==>");
        eprintln!("{arrow} {}: {message}", self.prefix);
    }

    fn error(&self, message: &str) {
        let arrow = Style::new().red().bold().apply_to("==>");
        let text = Style::new().red().apply_to(message);
        eprintln!("{arrow} {}: {text}", self.prefix);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiMessage {
    Say(String),
    Error(String),
}

/// Records every message; used by tests and by callers that render output
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryUi {
    messages: Mutex<Vec<UiMessage>>,
}

impl MemoryUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<UiMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                UiMessage::Error(text) => Some(text),
                UiMessage::Say(_) => None,
            })
            .collect()
    }

    fn push(&self, message: UiMessage) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }
}

impl Ui for MemoryUi {
    fn say(&self, message: &str) {
        self.push(UiMessage::Say(message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.push(UiMessage::Error(message.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_ui_keeps_order_and_filters_errors() {
        let ui = MemoryUi::new();
        ui.say("creating");
        ui.error("boom");
        ui.say("cleaning up");

        assert_eq!(
            ui.messages(),
            vec![
                UiMessage::Say("creating".to_owned()),
                UiMessage::Error("boom".to_owned()),
                UiMessage::Say("cleaning up".to_owned()),
            ]
        );
        assert_eq!(ui.errors(), vec!["boom".to_owned()]);
    }
}
