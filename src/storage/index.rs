//! Addressing into the flash ring: `(sector, page, byte)` with modular carry arithmetic.

/// Sectors in the ring. Frozen geometry (§3).
pub const SECTOR_COUNT: usize = 12;
/// Pages per sector.
pub const PAGES_PER_SECTOR: usize = 256;
/// Bytes per page.
pub const PAGE_SIZE: usize = 256;
/// Pages that make up one packet (§4.A/§4.B: a packet is 1024 compressed bytes).
pub const PAGES_PER_PACKET: usize = 4;

/// A position in the ring, addressed as sector/page/byte-within-page rather than a flat
/// offset, mirroring how the flash driver itself addresses storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageIndex {
    pub sector: usize,
    pub page: usize,
    pub byte: usize,
}

impl StorageIndex {
    pub const ZERO: StorageIndex = StorageIndex {
        sector: 0,
        page: 0,
        byte: 0,
    };

    pub fn new(sector: usize, page: usize, byte: usize) -> Self {
        debug_assert!(sector < SECTOR_COUNT);
        debug_assert!(page < PAGES_PER_SECTOR);
        debug_assert!(byte < PAGE_SIZE);
        StorageIndex { sector, page, byte }
    }

    /// Flat byte offset into the whole ring, treating it as one contiguous array. Useful
    /// only for distance arithmetic; never used to address the flash driver directly.
    fn flat(&self) -> usize {
        (self.sector * PAGES_PER_SECTOR + self.page) * PAGE_SIZE + self.byte
    }

    fn from_flat(flat: usize) -> Self {
        let total = SECTOR_COUNT * PAGES_PER_SECTOR * PAGE_SIZE;
        let flat = flat % total;
        let byte = flat % PAGE_SIZE;
        let page = (flat / PAGE_SIZE) % PAGES_PER_SECTOR;
        let sector = flat / (PAGE_SIZE * PAGES_PER_SECTOR);
        StorageIndex { sector, page, byte }
    }

    /// Advance by `count` bytes, carrying through page and sector with wraparound.
    pub fn advance(&self, count: usize) -> StorageIndex {
        StorageIndex::from_flat(self.flat() + count)
    }

    /// Round the page up to the next `PAGES_PER_PACKET` boundary, carrying into the next
    /// sector (wrapping) if that crosses the sector's last page.
    pub fn aligned_to_packet_boundary(&self) -> StorageIndex {
        let remainder = self.page % PAGES_PER_PACKET;
        if remainder == 0 {
            return *self;
        }
        let rounded_page = self.page + (PAGES_PER_PACKET - remainder);
        if rounded_page >= PAGES_PER_SECTOR {
            StorageIndex::new((self.sector + 1) % SECTOR_COUNT, 0, 0)
        } else {
            StorageIndex::new(self.sector, rounded_page, 0)
        }
    }

    /// Forward modular distance, in bytes, from `self` to `other`.
    pub fn distance_to(&self, other: &StorageIndex) -> usize {
        let total = SECTOR_COUNT * PAGES_PER_SECTOR * PAGE_SIZE;
        (other.flat() + total - self.flat()) % total
    }

}
