//! A firmware-grade structured event log: an LZSS packet codec over a circular
//! dictionary, a flash-backed ring that persists the compressed stream, a compact line
//! protocol for turning a registered format string and its parameters into one log line,
//! and a decoder that reverses the compact form back into readable text.
//!
//! The top-level entry point is [`logger::Logger`]; the other modules are its components
//! and can be used independently (for instance, [`codec`] on its own to compress an
//! arbitrary byte stream with the same packet discipline).

pub mod codec;
pub mod decode;
pub mod dictionary;
pub mod format;
pub mod logger;
pub mod registry;
pub mod storage;
pub mod value;

pub use logger::{LineMode, Logger};
pub use registry::{LogEntry, Registry, Severity, Writer};
pub use value::Value;
