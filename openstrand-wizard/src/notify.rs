// User feedback surfaces
//
// `Notifier` is the toast surface, `Navigator` the post-publish router. The controller
// only talks to these traits; the binary wires console/log implementations and tests
// record what was sent.

use log::{error, info, warn};
use std::fmt;
use std::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// A transient, non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, title, message)
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, title, message)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, title, message)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, title, message)
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Writes notices to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => error!(
                "[PHASE: notify] [STEP: {}] {}: {}",
                notice.level, notice.title, notice.message
            ),
            NoticeLevel::Warning => warn!(
                "[PHASE: notify] [STEP: {}] {}: {}",
                notice.level, notice.title, notice.message
            ),
            _ => info!(
                "[PHASE: notify] [STEP: {}] {}: {}",
                notice.level, notice.title, notice.message
            ),
        }
    }
}

/// Prints notices for a terminal user (errors to stderr) and logs them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        let line = format!(
            "[{}] {}: {}",
            notice.level.to_string().to_uppercase(),
            notice.title,
            notice.message
        );
        match notice.level {
            NoticeLevel::Error | NoticeLevel::Warning => eprintln!("{}", line),
            _ => println!("{}", line),
        }
        LogNotifier.notify(notice);
    }
}

/// Forwards notices over a channel to whatever drives the presentation.
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notice>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::Receiver<Notice>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notice: Notice) {
        // A dropped receiver means nobody is listening anymore.
        let _ = self.tx.send(notice);
    }
}

/// Headless router: records the destination in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        info!("[PHASE: navigate] Navigating to {}", route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_notifier_delivers_in_order() {
        let (notifier, rx) = ChannelNotifier::new();
        notifier.notify(Notice::info("Uploading", "a.csv"));
        notifier.notify(Notice::error("Upload failed", "quota"));

        let got: Vec<Notice> = rx.try_iter().collect();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].level, NoticeLevel::Info);
        assert_eq!(got[1].title, "Upload failed");
    }

    #[test]
    fn channel_notifier_survives_dropped_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(Notice::success("Published", "ok"));
    }
}
