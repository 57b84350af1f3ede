//! Component B: the flash-backed ring that persists compressed log packets.

pub mod flash;
pub mod index;
pub mod ring;

pub use flash::{FlashDevice, MemoryFlash};
pub use index::StorageIndex;
pub use ring::RingLog;
