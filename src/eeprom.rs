//! Top-level controller: dispatches `init`/`read`/`write` to the sector
//! owning a given logical address, and implements the swap/compaction
//! commit protocol (`spec.md` §4.4).

use crate::error::{Error, ReadStatus};
use crate::flash::Flash;
use crate::page::{self, ERASED_HW, ERASED_W};
use crate::params::Params;
use crate::sector::{self, RuntimeContext};

/// EEPROM controller. Owns the layout `Params` and a borrowed runtime
/// context per sector; talks to flash exclusively through `F: Flash`.
///
/// `MAX_ENTRIES_PER_PAGE` bounds the transient page image built in RAM
/// during a page swap (`spec.md` §4.4 Step A) -- it must be greater than
/// or equal to `Params::entries_per_page()` for the configured page size.
/// This is the no-heap, `no_std` equivalent of the original's
/// compile-time-sized on-stack page buffer.
pub struct Eeprom<'a, F: Flash, const MAX_ENTRIES_PER_PAGE: usize> {
    params: Params,
    flash: &'a F,
    contexts: &'a mut [RuntimeContext],
}

impl<'a, F: Flash, const MAX_ENTRIES_PER_PAGE: usize> Eeprom<'a, F, MAX_ENTRIES_PER_PAGE> {
    /// Creates a new controller. `contexts` must have exactly
    /// `params.sector_count` entries; its contents are overwritten by the
    /// next call to `init()`.
    pub fn new(params: Params, flash: &'a F, contexts: &'a mut [RuntimeContext]) -> Self {
        params.validate();
        debug_assert_eq!(
            contexts.len() as u32,
            params.sector_count,
            "contexts slice must have one entry per sector"
        );
        debug_assert!(
            params.entries_per_page() as usize <= MAX_ENTRIES_PER_PAGE,
            "MAX_ENTRIES_PER_PAGE is too small for the configured page size"
        );
        Eeprom {
            params,
            flash,
            contexts,
        }
    }

    /// Runs boot reconciliation (`spec.md` §4.1) for every sector. Must be
    /// called once before any `read`/`write`.
    pub fn init(&mut self) -> Result<(), Error> {
        for sector in 0..self.params.sector_count {
            let ctx = sector::boot_reconcile(self.flash, &self.params, sector)?;
            self.contexts[sector as usize] = ctx;
        }
        Ok(())
    }

    /// Reads the latest value stored for `logical_addr` (`spec.md` §4.2).
    pub fn read(&mut self, logical_addr: u16) -> ReadStatus {
        let sector = self.params.sector_of(logical_addr);
        let ctx = self.contexts[sector as usize];
        if !ctx.is_valid(&self.params) {
            return self.fault(sector);
        }
        match sector::scan_read(self.flash, &self.params, sector, &ctx, logical_addr) {
            Some(value) => ReadStatus::Found(value),
            None => ReadStatus::Empty,
        }
    }

    /// Writes `value` for `logical_addr` (`spec.md` §4.3). Writing the
    /// current value is a no-op success (idempotence).
    pub fn write(&mut self, logical_addr: u16, value: u16) -> Result<(), Error> {
        let sector = self.params.sector_of(logical_addr);
        match self.read(logical_addr) {
            ReadStatus::Found(old) if old == value => return Ok(()),
            ReadStatus::Fault => return Err(Error::InconsistentSectorState),
            _ => {}
        }

        let ctx = self.contexts[sector as usize];
        let page_base = self.params.page_base(sector, ctx.active_page);
        let page_end = page_base + self.params.page_size;

        if ctx.first_empty_offset < page_end {
            let _unlocked = unsafe { self.flash.unlock_guard()? };
            unsafe { self.program_entry_at(ctx.first_empty_offset, logical_addr, value)? };
            self.contexts[sector as usize].first_empty_offset += page::ENTRY_SIZE;
            Ok(())
        } else {
            self.swap_to_next_page(sector, logical_addr, value)
        }
    }

    fn fault(&mut self, sector: u32) -> ReadStatus {
        match sector::force_init(self.flash, &self.params, sector) {
            Ok(ctx) => {
                self.contexts[sector as usize] = ctx;
            }
            Err(_e) => {
                #[cfg(feature = "log")]
                log::error!("sector {} fault recovery itself failed", sector);
            }
        }
        ReadStatus::Fault
    }

    /// Writes a data entry's value half first, then its address half, so
    /// a crash mid-program leaves either a fully-written entry or one
    /// whose address still reads as the empty sentinel -- never a live
    /// address paired with a torn value.
    unsafe fn program_entry_at(&self, addr: u32, logical_addr: u16, value: u16) -> Result<(), Error> {
        self.flash.program_u16(addr + 2, value)?;
        self.flash.program_u16(addr, logical_addr)?;
        Ok(())
    }

    /// Swap-to-next-page compaction commit protocol (`spec.md` §4.4).
    fn swap_to_next_page(&mut self, sector: u32, new_addr: u16, new_value: u16) -> Result<(), Error> {
        let old_page = self.contexts[sector as usize].active_page;
        let new_page = self.params.next_page(old_page);
        let old_base = self.params.page_base(sector, old_page);
        let new_base = self.params.page_base(sector, new_page);
        let entries_per_page = self.params.entries_per_page();

        // Step A: build the next page's entry image in RAM. The new entry
        // goes first so it shadows any prior value for its own key.
        let mut image = [ERASED_W; MAX_ENTRIES_PER_PAGE];
        image[0] = page::pack_entry(new_addr, new_value);
        let mut top: usize = 1;
        for idx in (0..entries_per_page).rev() {
            let (addr, value) = page::read_entry(self.flash, old_base, idx);
            if addr == ERASED_HW {
                continue;
            }
            if !image[..top].iter().any(|w| (*w & 0xffff) as u16 == addr) {
                image[top] = page::pack_entry(addr, value);
                top += 1;
            }
        }

        // Step B: idempotence check against a prior crashed swap.
        let header_erased = self.flash.read_u16(new_base) == ERASED_HW
            && self.flash.read_u16(new_base + 2) == page::RESERVED;
        let entries_match = (0..entries_per_page as usize)
            .all(|idx| page::read_entry_word(self.flash, new_base, idx as u32) == image[idx]);

        let _unlocked = unsafe { self.flash.unlock_guard()? };
        if !(header_erased && entries_match) {
            // Step C: erase destination, program the built image.
            unsafe { self.flash.erase_pages(new_base, 1)? };
            for idx in 0..top {
                let entry_addr = page::entry_addr(new_base, idx as u32);
                let addr = (image[idx] & 0xffff) as u16;
                let value = (image[idx] >> 16) as u16;
                unsafe { self.program_entry_at(entry_addr, addr, value)? };
            }
        }

        // Step D: commit the destination header, then the new active page
        // is durable and reachable from boot reconciliation alone.
        unsafe {
            sector::set_page_status(self.flash, &self.params, sector, new_page, page::STATUS_ACTIVE)?
        };
        self.contexts[sector as usize] = RuntimeContext {
            active_page: new_page,
            first_empty_offset: page::entry_addr(new_base, top as u32),
        };
        #[cfg(feature = "log")]
        log::debug!(
            "sector {} swapped page {} -> {} ({} live entries)",
            sector,
            old_page,
            new_page,
            top
        );

        // Step E: retire the old page.
        unsafe { sector::erase_page(self.flash, &self.params, sector, old_page)? };

        Ok(())
    }
}
