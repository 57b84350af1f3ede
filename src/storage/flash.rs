//! The flash driver boundary. This crate never talks to hardware directly; a host
//! implements [`FlashDevice`] over whatever NOR flash (or, in a hosted build, a memory-
//! mapped file) backs the ring.

/// A raw, byte-addressed flash device with page write and sector erase granularity.
///
/// Implementations are expected to be synchronous: the ring holds its single mutex for the
/// full duration of any call into this trait, matching the firmware's single-threaded
/// access discipline (concurrency model).
pub trait FlashDevice {
    /// Erase `sector`, leaving every byte in it `0xFF`.
    fn erase_sector(&mut self, sector: usize);

    /// Write `data` starting at `(sector, page, byte)` without erasing first. Flash write
    /// can only clear bits, so the caller is responsible for writing to already-erased (or
    /// still-`0xFF`) space.
    fn write(&mut self, sector: usize, page: usize, byte: usize, data: &[u8]);

    /// Read `dst.len()` bytes starting at `(sector, page, byte)` into `dst`.
    fn read(&self, sector: usize, page: usize, byte: usize, dst: &mut [u8]);

    /// Reset the watchdog timer. Called before every sector erase and before every write
    /// verify retry, matching the original firmware's habit of kicking the dog around any
    /// operation slow enough to risk a timeout.
    fn kick_watchdog(&mut self);
}

/// An in-memory [`FlashDevice`] for tests and hosted builds: a flat byte array that treats
/// "erase" as setting a sector to `0xFF` and otherwise allows any byte to be overwritten
/// (unlike real NOR flash, which can only clear bits between erases). Read-back verify in
/// [`super::ring::RingLog`] still exercises the same code path.
#[derive(Clone)]
pub struct MemoryFlash {
    sectors: Vec<[u8; super::index::PAGES_PER_SECTOR * super::index::PAGE_SIZE]>,
}

impl MemoryFlash {
    pub fn new() -> Self {
        MemoryFlash {
            sectors: (0..super::index::SECTOR_COUNT)
                .map(|_| [0xFFu8; super::index::PAGES_PER_SECTOR * super::index::PAGE_SIZE])
                .collect(),
        }
    }
}

impl Default for MemoryFlash {
    fn default() -> Self {
        MemoryFlash::new()
    }
}

impl FlashDevice for MemoryFlash {
    fn erase_sector(&mut self, sector: usize) {
        self.sectors[sector] = [0xFFu8; super::index::PAGES_PER_SECTOR * super::index::PAGE_SIZE];
    }

    fn write(&mut self, sector: usize, page: usize, byte: usize, data: &[u8]) {
        let offset = page * super::index::PAGE_SIZE + byte;
        self.sectors[sector][offset..offset + data.len()].copy_from_slice(data);
    }

    fn read(&self, sector: usize, page: usize, byte: usize, dst: &mut [u8]) {
        let offset = page * super::index::PAGE_SIZE + byte;
        dst.copy_from_slice(&self.sectors[sector][offset..offset + dst.len()]);
    }

    fn kick_watchdog(&mut self) {}
}
