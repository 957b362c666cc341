//! Abstraction over the external media-playback engine.
//!
//! The engine handle is not thread-safe: the `PlayerController` moves it onto
//! one dedicated thread and is the only code that ever calls these methods.

#[cfg(feature = "mpv")]
pub mod mpv;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine rejected command `{command}`: {reason}")]
    Command { command: String, reason: String },

    #[error("property `{name}` unavailable: {reason}")]
    Property { name: String, reason: String },

    #[error("engine is shut down")]
    Shutdown,
}

impl EngineError {
    pub fn command(command: impl Into<String>, reason: impl ToString) -> Self {
        EngineError::Command {
            command: command.into(),
            reason: reason.to_string(),
        }
    }

    pub fn property(name: impl Into<String>, reason: impl ToString) -> Self {
        EngineError::Property {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

/// A decoded property value from a property-change event.
///
/// `Unavailable` is emitted when the engine reports the property without a
/// usable value (for example while switching files); the observer keeps the
/// previously cached value in that case.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Double(f64),
    Flag(bool),
    Int(i64),
    Text(String),
    Unavailable,
}

/// Why the engine stopped producing frames for the current file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Eof,
    Stopped,
    Error,
}

/// Events emitted by the engine, polled by the controller loop.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    PropertyChanged { name: String, value: PropertyValue },
    EndOfStream { reason: EndReason },
    Shutdown,
}

/// The command/property/event surface the controller needs from a playback
/// engine. Implementations are exercised from exactly one thread.
pub trait MediaEngine: Send {
    /// Bind the engine's render surface to a host window.
    fn attach_window(&mut self, handle: i64) -> Result<(), EngineError>;

    /// Issue a string command (`loadfile`, `seek`, `osd-overlay`, ...).
    fn command(&mut self, name: &str, args: &[&str]) -> Result<(), EngineError>;

    fn set_property_f64(&mut self, name: &str, value: f64) -> Result<(), EngineError>;
    fn set_property_i64(&mut self, name: &str, value: i64) -> Result<(), EngineError>;
    fn set_property_bool(&mut self, name: &str, value: bool) -> Result<(), EngineError>;
    fn set_property_str(&mut self, name: &str, value: &str) -> Result<(), EngineError>;

    fn get_property_f64(&mut self, name: &str) -> Result<f64, EngineError>;
    fn get_property_i64(&mut self, name: &str) -> Result<i64, EngineError>;
    fn get_property_bool(&mut self, name: &str) -> Result<bool, EngineError>;
    fn get_property_str(&mut self, name: &str) -> Result<String, EngineError>;

    /// Register interest in property-change events for `name`.
    fn observe_property(&mut self, name: &str) -> Result<(), EngineError>;

    /// Non-blocking poll for the next pending event.
    fn poll_event(&mut self) -> Option<EngineEvent>;
}
