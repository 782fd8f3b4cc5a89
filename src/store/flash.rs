//! Flash Page Pair Store
//!
//! Durable store on two erase pages of a NOR flash. The whole key table
//! lives in RAM and every commit rewrites it to the inactive page:
//!
//! ```text
//! page: ┌───────┬──────┬───────────────────────────────────────┐
//!       │ magic │ seq  │ slot 0 │ slot 1 │ ... │ slot N-1       │
//!       └───────┴──────┴───────────────────────────────────────┘
//! slot: ┌──────────────────────────┬───────┬─────────┐
//!       │ "namespace:key" NUL pad  │ value │ 0xFF x4 │
//!       └──────────────────────────┴───────┴─────────┘
//! ```
//!
//! Entries are written before the header. A power cut before the header
//! lands leaves an unheaded page that `init` skips, so the previous page
//! stays authoritative and a key reads either its old or its new value.

use embedded_storage::nor_flash::NorFlash;
use heapless::String;

use crate::config::{FLASH_STORE_SLOTS, MAX_KEY_LEN};
use crate::store::{DurableStore, StoreError};

/// Header marker of a committed page (also encodes the layout version)
pub const STORE_MAGIC: u32 = 0x4C46_5331;

/// Header size: magic and sequence number
pub const HEADER_LEN: usize = 8;

/// Size of the NUL-padded `namespace:key` field of a slot
pub const ENTRY_KEY_LEN: usize = 32;

/// Size of one slot: key field, value and padding to a double word
pub const ENTRY_LEN: usize = ENTRY_KEY_LEN + 8;

/// Size of the committed table
pub const TABLE_LEN: usize = HEADER_LEN + FLASH_STORE_SLOTS * ENTRY_LEN;

const ERASED: u8 = 0xFF;
const ERASED_WORD: u32 = 0xFFFF_FFFF;

const READ_FAILED: StoreError = StoreError::Io(-1);
const WRITE_FAILED: StoreError = StoreError::Io(-2);
const ERASE_FAILED: StoreError = StoreError::Io(-3);
const TABLE_FULL: StoreError = StoreError::Io(-4);

/// Durable store on two consecutive flash pages
pub struct FlashStore<F> {
    flash: F,
    offset: u32,
    page_size: u32,
    table: [u8; TABLE_LEN],
    active: Option<usize>,
    seq: u32,
}

impl<F: NorFlash> FlashStore<F> {
    /// Create a store on the pages at `offset` and `offset + page_size`
    #[must_use]
    pub fn new(flash: F, offset: u32, page_size: u32) -> Self {
        Self {
            flash,
            offset,
            page_size,
            table: [ERASED; TABLE_LEN],
            active: None,
            seq: 0,
        }
    }

    /// Page holding the current table, `None` before the first commit
    #[must_use]
    pub const fn active_page(&self) -> Option<usize> {
        self.active
    }

    /// Sequence number of the current table
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.seq
    }

    fn page_offset(&self, page: usize) -> u32 {
        if page == 0 {
            self.offset
        } else {
            self.offset + self.page_size
        }
    }

    fn read_header(&mut self, page: usize) -> Result<(u32, u32), StoreError> {
        let mut header = [0u8; HEADER_LEN];
        self.flash
            .read(self.page_offset(page), &mut header)
            .map_err(|_| READ_FAILED)?;
        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let seq = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        Ok((magic, seq))
    }

    fn entry_key(namespace: &str, key: &str) -> [u8; ENTRY_KEY_LEN] {
        let mut field = [0u8; ENTRY_KEY_LEN];
        let parts = [namespace.as_bytes(), b":", key.as_bytes()];
        for (dst, src) in field.iter_mut().zip(parts.iter().flat_map(|p| p.iter())) {
            *dst = *src;
        }
        field
    }

    fn find_slot(&self, field: &[u8; ENTRY_KEY_LEN]) -> Option<usize> {
        (0..FLASH_STORE_SLOTS).find(|&slot| {
            let at = HEADER_LEN + slot * ENTRY_LEN;
            &self.table[at..at + ENTRY_KEY_LEN] == field
        })
    }

    fn free_slot(&self) -> Option<usize> {
        (0..FLASH_STORE_SLOTS).find(|&slot| self.table[HEADER_LEN + slot * ENTRY_LEN] == ERASED)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let target = self.active.map_or(0, |page| 1 - page);
        let offset = self.page_offset(target);
        let seq = self.seq.wrapping_add(1);

        self.flash
            .erase(offset, offset + self.page_size)
            .map_err(|_| ERASE_FAILED)?;
        self.flash
            .write(offset + HEADER_LEN as u32, &self.table[HEADER_LEN..])
            .map_err(|_| WRITE_FAILED)?;

        let mut header = [0u8; HEADER_LEN];
        header[..4].copy_from_slice(&STORE_MAGIC.to_le_bytes());
        header[4..].copy_from_slice(&seq.to_le_bytes());
        self.flash.write(offset, &header).map_err(|_| WRITE_FAILED)?;

        self.table[..HEADER_LEN].copy_from_slice(&header);
        self.active = Some(target);
        self.seq = seq;
        Ok(())
    }

    fn clear(&mut self) {
        self.table = [ERASED; TABLE_LEN];
        self.active = None;
        self.seq = 0;
    }
}

impl<F: NorFlash> DurableStore for FlashStore<F> {
    type Handle = String<MAX_KEY_LEN>;

    fn init(&mut self) -> Result<(), StoreError> {
        let mut newest: Option<(usize, u32)> = None;
        for page in 0..2 {
            match self.read_header(page)? {
                (STORE_MAGIC, seq) => {
                    if newest.map_or(true, |(_, best)| seq > best) {
                        newest = Some((page, seq));
                    }
                }
                (ERASED_WORD, _) => {}
                _ => return Err(StoreError::NeedsErase),
            }
        }

        self.clear();
        if let Some((page, seq)) = newest {
            let offset = self.page_offset(page);
            self.flash
                .read(offset, &mut self.table)
                .map_err(|_| READ_FAILED)?;
            self.active = Some(page);
            self.seq = seq;
        }
        Ok(())
    }

    fn open(&mut self, namespace: &str) -> Result<Self::Handle, StoreError> {
        String::try_from(namespace).map_err(|()| StoreError::Unavailable)
    }

    fn get_u32(&mut self, handle: &Self::Handle, key: &str, default: u32) -> u32 {
        let field = Self::entry_key(handle, key);
        self.find_slot(&field).map_or(default, |slot| {
            let at = HEADER_LEN + slot * ENTRY_LEN + ENTRY_KEY_LEN;
            u32::from_le_bytes([
                self.table[at],
                self.table[at + 1],
                self.table[at + 2],
                self.table[at + 3],
            ])
        })
    }

    fn put_u32(&mut self, handle: &Self::Handle, key: &str, value: u32) -> Result<(), StoreError> {
        let field = Self::entry_key(handle, key);
        let slot = self
            .find_slot(&field)
            .or_else(|| self.free_slot())
            .ok_or(TABLE_FULL)?;

        let at = HEADER_LEN + slot * ENTRY_LEN;
        self.table[at..at + ENTRY_KEY_LEN].copy_from_slice(&field);
        self.table[at + ENTRY_KEY_LEN..at + ENTRY_KEY_LEN + 4].copy_from_slice(&value.to_le_bytes());
        self.commit()
    }

    fn close(&mut self, _handle: Self::Handle) {}

    fn erase_all(&mut self) -> Result<(), StoreError> {
        let from = self.page_offset(0);
        self.flash
            .erase(from, from + 2 * self.page_size)
            .map_err(|_| ERASE_FAILED)?;
        self.clear();
        Ok(())
    }
}

impl<F> core::fmt::Debug for FlashStore<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashStore")
            .field("offset", &self.offset)
            .field("active", &self.active)
            .field("seq", &self.seq)
            .finish_non_exhaustive()
    }
}
