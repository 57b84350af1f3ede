//! The flash-backed ring: a fixed number of sectors, written page by page, wrapping
//! forever. Writers and readers each keep their own cursor and their own LZSS dictionary,
//! since they are reading/writing independent packets that may be many sectors apart.

use crate::codec;
use crate::dictionary::Dictionary;

use super::flash::FlashDevice;
use super::index::{StorageIndex, PAGES_PER_PACKET, PAGE_SIZE, SECTOR_COUNT};

/// Bytes of compressed data per packet. The dictionary is reset at every packet boundary
/// on both the write and the read side, which is what lets a reader start decompressing
/// from any packet without replaying everything written before it.
pub const PACKET_SIZE: usize = PAGES_PER_PACKET * PAGE_SIZE;

/// Number of consecutive verify failures tolerated before a write is given up on and
/// reported through tracing rather than retried further.
const WRITE_VERIFY_RETRIES: usize = 20;

fn page_is_empty<F: FlashDevice>(flash: &F, sector: usize, page: usize) -> bool {
    let mut buf = [0u8; PAGE_SIZE];
    flash.read(sector, page, 0, &mut buf);
    buf.iter().all(|&b| b == 0xFF)
}

fn sector_is_empty<F: FlashDevice>(flash: &F, sector: usize) -> bool {
    page_is_empty(flash, sector, 0)
}

/// Scan for the sector currently being written to: the first sector (in address order)
/// whose last page is still entirely erased. A brand-new device has every sector erased,
/// so sector 0 is found immediately and the ring starts from empty.
fn find_last_used_sector<F: FlashDevice>(flash: &F) -> Option<usize> {
    (0..SECTOR_COUNT).find(|&sector| page_is_empty(flash, sector, super::index::PAGES_PER_SECTOR - 1))
}

/// Within the write sector, find the first page that has not yet been written, by scanning
/// downward from the second-to-last page.
fn find_first_unused_page<F: FlashDevice>(flash: &F, sector: usize) -> usize {
    for page in (0..super::index::PAGES_PER_SECTOR - 1).rev() {
        if !page_is_empty(flash, sector, page) {
            return page + 1;
        }
    }
    0
}

/// Boot-time recovery of the write cursor: find the sector mid-write, find the first
/// unused page in it, and round up to a packet boundary. If no sector looks mid-write (a
/// freshly erased device, or one where every sector is fully used, which cannot happen
/// under normal operation since the ring always keeps at least one sector ahead of the
/// reader) erase sector 0 and start there.
fn recover_write_index<F: FlashDevice>(flash: &mut F) -> StorageIndex {
    match find_last_used_sector(flash) {
        Some(sector) => {
            let page = find_first_unused_page(flash, sector);
            StorageIndex::new(sector, page, 0).aligned_to_packet_boundary()
        }
        None => {
            flash.erase_sector(0);
            StorageIndex::ZERO
        }
    }
}

/// The reader starts at the first sector after the write sector whose first page has been
/// written. If nothing has been written yet, the reader starts exactly where the writer
/// is, which reports zero readable bytes.
fn find_start_of_log_sector<F: FlashDevice>(flash: &F, write_index: StorageIndex) -> StorageIndex {
    for i in 1..SECTOR_COUNT {
        let candidate = (write_index.sector + i) % SECTOR_COUNT;
        if !sector_is_empty(flash, candidate) {
            return StorageIndex::new(candidate, 0, 0);
        }
    }
    write_index
}

/// A structured event log ring: compresses entries on write and decompresses them on
/// read, persisting the compressed stream across a fixed set of flash sectors.
pub struct RingLog<F: FlashDevice> {
    flash: F,
    write_index: StorageIndex,
    write_dict: Dictionary,
    write_packet_remaining: usize,
    read_index: StorageIndex,
    read_dict: Dictionary,
    read_packet_remaining: usize,
}

impl<F: FlashDevice> RingLog<F> {
    /// Recover the write cursor and locate the reader's starting sector from whatever is
    /// already on `flash`. Call once at boot.
    pub fn new(mut flash: F) -> Self {
        let write_index = recover_write_index(&mut flash);
        let read_index = find_start_of_log_sector(&flash, write_index);
        RingLog {
            flash,
            write_index,
            write_dict: Dictionary::new(),
            write_packet_remaining: PACKET_SIZE,
            read_index,
            read_dict: Dictionary::new(),
            read_packet_remaining: PACKET_SIZE,
        }
    }

    pub const fn packet_size() -> usize {
        PACKET_SIZE
    }

    /// The underlying flash device, for a host that needs to persist it across reboots
    /// (or, in tests, snapshot it to exercise boot recovery).
    pub fn flash(&self) -> &F {
        &self.flash
    }

    /// Compress and append `data` (a fully-rendered log line) to the ring, resetting the
    /// write dictionary every time a packet fills up.
    pub fn write(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            if self.write_packet_remaining == 0 {
                self.write_dict.reset();
                self.write_packet_remaining = PACKET_SIZE;
            }
            let mut compressed = [0u8; PACKET_SIZE];
            let budget = self.write_packet_remaining.min(compressed.len());
            let outcome = codec::compress(&mut self.write_dict, data, &mut compressed, budget);
            self.write_compressed(&compressed[..outcome.output_len]);
            self.write_packet_remaining -= outcome.output_len;
            data = &data[outcome.input_consumed..];
        }
    }

    /// Write `bytes` page by page, stopping at the first page whose write never verifies.
    /// A verify failure is a zero-byte short write: the cursor does not advance past it, so
    /// the unconfirmed bytes (and everything queued after them) are dropped rather than
    /// leaving a gap the reader would later decompress as noise.
    fn write_compressed(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            let free_in_page = PAGE_SIZE - self.write_index.byte;
            let chunk_len = free_in_page.min(bytes.len());
            if !self.verified_write(self.write_index, &bytes[..chunk_len]) {
                break;
            }
            let filled_page = chunk_len == free_in_page;
            self.write_index = self.write_index.advance(chunk_len);
            bytes = &bytes[chunk_len..];
            if filled_page && self.write_index.page == 0 {
                self.flash.kick_watchdog();
                self.flash.erase_sector(self.write_index.sector);
            }
        }
    }

    /// Write `data` at `at`, retrying up to [`WRITE_VERIFY_RETRIES`] times against a
    /// read-back comparison. Returns whether the write was ever confirmed.
    fn verified_write(&mut self, at: StorageIndex, data: &[u8]) -> bool {
        let mut readback = vec![0u8; data.len()];
        for _ in 0..WRITE_VERIFY_RETRIES {
            self.flash.kick_watchdog();
            self.flash.write(at.sector, at.page, at.byte, data);
            self.flash.read(at.sector, at.page, at.byte, &mut readback);
            if readback == data {
                return true;
            }
        }
        tracing::warn!(
            sector = at.sector,
            page = at.page,
            byte = at.byte,
            "flash write did not verify after {} retries",
            WRITE_VERIFY_RETRIES
        );
        false
    }

    fn read_at(&self, mut at: StorageIndex, dst: &mut [u8]) {
        let mut offset = 0;
        while offset < dst.len() {
            let remaining_in_page = PAGE_SIZE - at.byte;
            let chunk_len = remaining_in_page.min(dst.len() - offset);
            self.flash.read(at.sector, at.page, at.byte, &mut dst[offset..offset + chunk_len]);
            at = at.advance(chunk_len);
            offset += chunk_len;
        }
    }

    /// Bytes of compressed data not yet consumed by the reader.
    pub fn max_readable_bytes(&self) -> usize {
        self.read_index.distance_to(&self.write_index)
    }

    /// Decompress entries into `output`, returning how many bytes were produced. Returns
    /// `0` once the reader has caught up with the writer.
    pub fn read(&mut self, output: &mut [u8]) -> usize {
        let mut written = 0;
        while written < output.len() {
            if self.read_packet_remaining == 0 {
                self.read_dict.reset();
                self.read_packet_remaining = PACKET_SIZE;
            }
            let available = self.max_readable_bytes();
            if available == 0 {
                break;
            }
            let chunk_cap = self.read_packet_remaining.min(available);
            let mut buf = [0u8; PACKET_SIZE];
            self.read_at(self.read_index, &mut buf[..chunk_cap]);
            let outcome = codec::decompress(&mut self.read_dict, &buf[..chunk_cap], &mut output[written..], chunk_cap);
            if outcome.input_consumed == 0 && outcome.output_len == 0 {
                break;
            }
            self.read_index = self.read_index.advance(outcome.input_consumed);
            self.read_packet_remaining -= outcome.input_consumed;
            written += outcome.output_len;
        }
        written
    }

    /// Erase the whole ring and reset both cursors to the start. A maintenance operation,
    /// distinct from the incremental erase the write path performs on crossing into a new
    /// sector.
    pub fn erase_all(&mut self) {
        for sector in 0..SECTOR_COUNT {
            self.flash.kick_watchdog();
            self.flash.erase_sector(sector);
        }
        self.write_index = StorageIndex::ZERO;
        self.write_dict.reset();
        self.write_packet_remaining = PACKET_SIZE;
        self.read_index = StorageIndex::ZERO;
        self.read_dict.reset();
        self.read_packet_remaining = PACKET_SIZE;
    }
}
