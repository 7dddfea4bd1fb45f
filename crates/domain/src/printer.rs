use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::settings::PrinterSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Styling for one emitted line. Transports apply these best-effort:
/// a printer that ignores emphasis still prints the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextStyle {
    pub align: Alignment,
    pub emphasis: bool,
    pub double_size: bool,
}

impl TextStyle {
    /// Large centered emphasized text, used for receipt headers.
    pub fn title() -> Self {
        Self {
            align: Alignment::Center,
            emphasis: true,
            double_size: true,
        }
    }

    pub fn centered() -> Self {
        Self {
            align: Alignment::Center,
            ..Self::default()
        }
    }

    pub fn emphasized() -> Self {
        Self {
            emphasis: true,
            ..Self::default()
        }
    }
}

/// Printer transport that infrastructure implementations must provide.
///
/// One transport object holds at most one live device handle. `connect`
/// binds the handle to the settings passed in; callers close the handle
/// before printing with different settings.
#[async_trait]
pub trait PrinterTransport: Send + Sync {
    /// Open a handle to the device described by `settings`
    async fn connect(&mut self, settings: &PrinterSettings) -> Result<(), TransportError>;

    /// Close the handle. Safe to call without one.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Check if a handle is currently open
    fn is_connected(&self) -> bool;

    /// Emit one styled text line (the transport appends the line feed)
    async fn emit(&mut self, text: &str, style: TextStyle) -> Result<(), TransportError>;

    /// Cut the paper. Callers treat failure as cosmetic.
    async fn cut(&mut self) -> Result<(), TransportError>;
}
