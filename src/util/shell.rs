//! Centralized shell output for bosun.
//!
//! All user-facing status lines, warnings, and non-fatal errors go through
//! `Shell`. Non-fatal reporting never aborts resolution: callers report and
//! keep going, and the single fatal exit point lives in the binary.
//!
//! Every message is also recorded, so tests can construct a capturing shell
//! and assert on what was reported without scraping stderr.

use std::fmt::Display;
use std::sync::{Arc, Mutex};

/// A recorded shell message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Plain output line (stdout).
    Log(String),
    /// Status line with a verb, e.g. `Starting development server ...`.
    Status(String, String),
    /// Non-fatal warning.
    Warn(String),
    /// Non-fatal error report.
    Error(String),
}

struct ShellInner {
    print: bool,
    messages: Mutex<Vec<Message>>,
}

/// Shared output handle. Cloning is cheap and all clones observe the same
/// recorded message log.
#[derive(Clone)]
pub struct Shell {
    inner: Arc<ShellInner>,
}

impl Shell {
    /// Create a shell that prints to stdout/stderr.
    pub fn new() -> Self {
        Shell {
            inner: Arc::new(ShellInner {
                print: true,
                messages: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a shell that only records messages. Used by tests.
    pub fn capturing() -> Self {
        Shell {
            inner: Arc::new(ShellInner {
                print: false,
                messages: Mutex::new(Vec::new()),
            }),
        }
    }

    fn record(&self, message: Message) {
        if let Ok(mut messages) = self.inner.messages.lock() {
            messages.push(message);
        }
    }

    /// Print a plain line to stdout.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        if self.inner.print {
            println!("{}", message);
        }
        self.record(Message::Log(message));
    }

    /// Print a right-aligned status verb followed by a message.
    pub fn status(&self, verb: &str, message: impl Display) {
        let message = message.to_string();
        if self.inner.print {
            eprintln!("{:>12} {}", verb, message);
        }
        self.record(Message::Status(verb.to_string(), message));
    }

    /// Report a non-fatal warning.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        if self.inner.print {
            eprintln!("warning: {}", message);
        }
        self.record(Message::Warn(message));
    }

    /// Report a non-fatal error.
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        if self.inner.print {
            eprintln!("error: {}", message);
        }
        self.record(Message::Error(message));
    }

    /// All recorded messages, in order.
    pub fn messages(&self) -> Vec<Message> {
        self.inner
            .messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Recorded warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Warn(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Recorded non-fatal errors.
    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Error(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Recorded plain output lines.
    pub fn logs(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                Message::Log(s) => Some(s),
                _ => None,
            })
            .collect()
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capturing_records_in_order() {
        let shell = Shell::capturing();
        shell.log("hello");
        shell.warn("careful");
        shell.error("broken");

        assert_eq!(
            shell.messages(),
            vec![
                Message::Log("hello".to_string()),
                Message::Warn("careful".to_string()),
                Message::Error("broken".to_string()),
            ]
        );
    }

    #[test]
    fn test_clones_share_log() {
        let shell = Shell::capturing();
        let clone = shell.clone();
        clone.warn("from clone");

        assert_eq!(shell.warnings(), vec!["from clone".to_string()]);
    }

    #[test]
    fn test_filtered_accessors() {
        let shell = Shell::capturing();
        shell.warn("w1");
        shell.error("e1");
        shell.warn("w2");

        assert_eq!(shell.warnings(), vec!["w1".to_string(), "w2".to_string()]);
        assert_eq!(shell.errors(), vec!["e1".to_string()]);
        assert!(shell.logs().is_empty());
    }
}
