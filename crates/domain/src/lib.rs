//! Domain layer - Pure types and seams with no I/O
//!
//! This crate contains:
//! - Value Objects (Counter, PrinterSettings, AutoRunConfig, TextStyle)
//! - Events published to the rendering side (UiEvent)
//! - Capability interfaces (traits) implemented by infrastructure
//!
//! Principles:
//! - No dependencies on infrastructure
//! - Invariants enforced at domain level
//! - Testable in isolation

pub mod counter;
pub mod error;
pub mod event;
pub mod printer;
pub mod probe;
pub mod settings;

// Re-export commonly used types
pub use counter::Counter;
pub use error::{ConfigError, TransportError};
pub use event::{Mode, Notice, NoticeLevel, UiEvent};
pub use printer::{Alignment, PrinterTransport, TextStyle};
pub use probe::DeviceProbe;
pub use settings::{AutoRunConfig, PrinterSettings};
