use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Normal,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    /// Bumped on every `show`, so front-ends can tell a repeat of the same text apart.
    pub seq: u64,
}

/// The single on-screen notification region.
///
/// Each `show` replaces the message and whatever dismissal was pending. A zero
/// duration keeps the message up until the next `show`.
#[derive(Debug)]
pub struct Notifier {
    current: Option<Notification>,
    visible: bool,
    hide_at: Option<Instant>,
    default_duration: Duration,
    seq: u64,
}

impl Notifier {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            current: None,
            visible: false,
            hide_at: None,
            default_duration,
            seq: 0,
        }
    }

    /// Shows `message` with the default auto-dismiss delay.
    pub fn info(&mut self, message: impl Into<String>) {
        self.show(message, NotificationKind::Normal, self.default_duration);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(message, NotificationKind::Error, self.default_duration);
    }

    /// Shows `message` until replaced.
    pub fn persist(&mut self, message: impl Into<String>) {
        self.show(message, NotificationKind::Normal, Duration::ZERO);
    }

    pub fn show(&mut self, message: impl Into<String>, kind: NotificationKind, duration: Duration) {
        self.show_at(Instant::now(), message, kind, duration);
    }

    pub fn show_at(
        &mut self,
        now: Instant,
        message: impl Into<String>,
        kind: NotificationKind,
        duration: Duration,
    ) {
        self.seq += 1;
        self.current = Some(Notification {
            message: message.into(),
            kind,
            seq: self.seq,
        });
        self.visible = true;
        self.hide_at = if duration.is_zero() {
            None
        } else {
            Some(now + duration)
        };
    }

    /// Hides the message once its deadline has passed. Returns true when this
    /// call performed the dismissal.
    #[cfg(any(feature = "gui", test))]
    pub fn refresh_at(&mut self, now: Instant) -> bool {
        match self.hide_at {
            Some(deadline) if now >= deadline => {
                self.visible = false;
                self.hide_at = None;
                true
            }
            _ => false,
        }
    }

    #[cfg(feature = "gui")]
    pub fn refresh(&mut self) -> bool {
        self.refresh_at(Instant::now())
    }

    /// The message on screen, if any.
    pub fn visible(&self) -> Option<&Notification> {
        if self.visible {
            self.current.as_ref()
        } else {
            None
        }
    }

    /// The last message shown, visible or not.
    pub fn last(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// Pending dismissal deadline, used by front-ends to schedule a repaint.
    #[cfg(any(feature = "gui", test))]
    pub fn hide_at(&self) -> Option<Instant> {
        self.hide_at
    }
}
