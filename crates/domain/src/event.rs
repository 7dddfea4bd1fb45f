use serde::{Deserialize, Serialize};

/// Which workflow the dashboard currently shows. Reflects navigation only;
/// it does not gate counter mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Manual,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A dismissible user-facing notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Status events published by the coordinator, consumed only by the
/// rendering side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UiEvent {
    /// New counter value to display
    CounterChanged { value: u64 },
    /// An auto run began counting toward `max`
    AutoStarted { max: u32 },
    /// Tick progress of the active auto run
    AutoProgress { current: u32, max: u32 },
    /// The auto run ended (complete, stopped, or failed); controls re-enable
    AutoFinished,
    /// Device presence transition
    DeviceStatus { connected: bool },
    ModeChanged(Mode),
    Notice(Notice),
}
