//! Build-time layout parameters for the emulated EEPROM.
//!
//! The teacher crate took `first_page_address` / `page_size` / `page_count`
//! as plain constructor arguments (or read them from linker-provided
//! symbols for the single-sector default case). This generalizes that into
//! an explicit struct so a single `Eeprom` instance can own more than one
//! independent wear-leveling ring (`spec.md` §2's "one or more independent
//! sectors").

/// Layout parameters for an [`crate::Eeprom`] instance.
#[derive(Copy, Clone, Debug)]
pub struct Params {
    /// Absolute address of the first page of sector 0.
    pub first_sector_offset: u32,
    /// Size of a single flash page, in bytes. Must be a multiple of the
    /// flash controller's erase granularity.
    pub page_size: u32,
    /// Number of physical pages per sector ring (`P` in `spec.md`). Must be
    /// at least 3: boot reconciliation's two-ACTIVE-page resolution
    /// (`sector::resolve_two_active`) disambiguates a crash-mid-swap state
    /// by checking whether the two ACTIVE pages are `{0, P-1}` (wrapped) or
    /// some other adjacent pair (not wrapped), and at `P == 2` those are the
    /// same pair -- `{0, 1}` is simultaneously the only non-wrapped adjacent
    /// pair and the only `{0, P-1}` wrap pair, so the two directed swaps
    /// `0->1` and `1->0` become indistinguishable from header state alone.
    pub pages_per_sector: u32,
    /// Number of independent sectors.
    pub sector_count: u32,
}

impl Params {
    pub(crate) fn validate(&self) {
        debug_assert!(
            self.pages_per_sector >= 3,
            "EEPROM page count per sector must be at least 3 (2 pages make the \
             boot-time two-ACTIVE-page wrap check ambiguous, see the field doc \
             on Params::pages_per_sector)"
        );
        debug_assert!(
            self.sector_count >= 1,
            "EEPROM sector count must be at least 1"
        );
        debug_assert_eq!(
            self.page_size % 4,
            0,
            "EEPROM page size must be a multiple of 4 bytes"
        );
        debug_assert!(
            self.page_size > crate::page::HEADER_SIZE,
            "EEPROM page size must hold the header plus at least one entry"
        );
    }

    /// Amount of 4-byte data entry slots available per page.
    pub(crate) fn entries_per_page(&self) -> u32 {
        (self.page_size - crate::page::HEADER_SIZE) / crate::page::ENTRY_SIZE
    }

    /// Amount of logical addresses routed to a single sector -- the number
    /// of distinct keys a sector's entry log can ever hold live at once.
    pub(crate) fn entries_per_sector(&self) -> u32 {
        self.entries_per_page()
    }

    /// Absolute base address of `sector`.
    pub(crate) fn sector_base(&self, sector: u32) -> u32 {
        self.first_sector_offset + sector * self.pages_per_sector * self.page_size
    }

    /// Absolute base address of `page` within `sector`.
    pub(crate) fn page_base(&self, sector: u32, page: u32) -> u32 {
        self.sector_base(sector) + page * self.page_size
    }

    /// Sector owning a given logical address.
    pub(crate) fn sector_of(&self, logical_addr: u16) -> u32 {
        u32::from(logical_addr) / self.entries_per_sector()
    }

    /// Page following `page` in the sector's ring.
    pub(crate) fn next_page(&self, page: u32) -> u32 {
        (page + 1) % self.pages_per_sector
    }
}

// Default EEPROM (single sector), filled in by the linker script, matching
// the teacher's `_eeprom_start` / `_page_size` / `_eeprom_pages` symbols.
#[cfg(feature = "default-eeprom")]
extern "C" {
    #[link_name = "_eeprom_start"]
    static EEPROM_START: u32;
    #[link_name = "_page_size"]
    static EEPROM_PAGE_SIZE: u32;
    #[link_name = "_eeprom_pages"]
    static EEPROM_PAGES: u32;
}

#[cfg(feature = "default-eeprom")]
impl Params {
    /// Builds [`Params`] for a single sector whose location is supplied by
    /// the linker script (`_eeprom_start`, `_page_size`, `_eeprom_pages`).
    pub fn from_linker_script() -> Params {
        let first_sector_offset = unsafe { &EEPROM_START } as *const u32 as u32;
        let page_size = unsafe { &EEPROM_PAGE_SIZE } as *const u32 as u32;
        let pages_per_sector = unsafe { &EEPROM_PAGES } as *const u32 as u32;
        Params {
            first_sector_offset,
            page_size,
            pages_per_sector,
            sector_count: 1,
        }
    }
}
