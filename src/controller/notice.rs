use std::time::Duration;

use super::Task;

/// Notification channel. Each kind holds at most one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    Info,
    Error,
}

impl NoticeKind {
    pub const ALL: [NoticeKind; 2] = [NoticeKind::Info, NoticeKind::Error];

    pub fn label(self) -> &'static str {
        match self {
            NoticeKind::Info => "info",
            NoticeKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NoticeKind,
}

#[derive(Debug, Default)]
struct Slot {
    current: Option<Notification>,
    generation: u64,
}

/// Both notification channels plus the delay after which they clear.
#[derive(Debug)]
pub struct Notices {
    info: Slot,
    error: Slot,
    timeout: Duration,
}

impl Notices {
    pub fn new(timeout: Duration) -> Self {
        Self {
            info: Slot::default(),
            error: Slot::default(),
            timeout,
        }
    }

    pub fn get(&self, kind: NoticeKind) -> Option<&Notification> {
        self.slot(kind).current.as_ref()
    }

    /// Replace the message on `kind` and return the task that clears it.
    pub fn show(&mut self, kind: NoticeKind, message: impl Into<String>) -> Task {
        let after = self.timeout;
        let message = message.into();
        let slot = self.slot_mut(kind);
        slot.generation += 1;
        tracing::debug!(kind = kind.label(), generation = slot.generation, %message, "notice shown");
        slot.current = Some(Notification { message, kind });
        Task::ClearNotice {
            kind,
            generation: slot.generation,
            after,
        }
    }

    /// Clear `kind` if `generation` is still the one on display.
    pub fn expire(&mut self, kind: NoticeKind, generation: u64) -> bool {
        let slot = self.slot_mut(kind);
        if slot.generation != generation || slot.current.is_none() {
            return false;
        }
        slot.current = None;
        true
    }

    fn slot(&self, kind: NoticeKind) -> &Slot {
        match kind {
            NoticeKind::Info => &self.info,
            NoticeKind::Error => &self.error,
        }
    }

    fn slot_mut(&mut self, kind: NoticeKind) -> &mut Slot {
        match kind {
            NoticeKind::Info => &mut self.info,
            NoticeKind::Error => &mut self.error,
        }
    }
}
