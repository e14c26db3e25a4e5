use crate::{Identity, RequestDetails};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    /// A substitute identity was installed.
    Enter,
    /// An existing substitute was unwound back to its source.
    Exit,
}

impl SwitchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Exit => "exit",
        }
    }
}

/// Notification that the active identity of a request changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchEvent {
    kind: SwitchKind,
    previous: Identity,
    current: Identity,
    details: RequestDetails,
}

impl SwitchEvent {
    pub fn enter(previous: Identity, current: Identity) -> Self {
        Self {
            kind: SwitchKind::Enter,
            previous,
            current,
            details: RequestDetails::default(),
        }
    }

    pub fn exit(previous: Identity, current: Identity) -> Self {
        Self {
            kind: SwitchKind::Exit,
            previous,
            current,
            details: RequestDetails::default(),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: RequestDetails) -> Self {
        self.details = details;
        self
    }

    pub fn kind(&self) -> SwitchKind {
        self.kind
    }

    pub fn previous(&self) -> &Identity {
        &self.previous
    }

    pub fn current(&self) -> &Identity {
        &self.current
    }

    pub fn details(&self) -> RequestDetails {
        self.details
    }
}
