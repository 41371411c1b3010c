//! Per-sector runtime state and the flash-adjacent helpers shared by boot
//! reconciliation, scan-read and append-write (`spec.md` §3, §4.1-§4.3).

use crate::flash::{Flash, FlashResult};
use crate::page::{self, PageState};
use crate::params::Params;

/// In-RAM cache of a sector's state, reconstructible from flash alone
/// (`spec.md` §3's `RuntimeContext`).
///
/// Owned by the caller (see `spec.md` §9's note on replacing the original's
/// module-scope singleton with explicit dependency injection): an
/// `Eeprom` is handed a `&mut [RuntimeContext]`, one slot per sector,
/// rather than keeping a static array itself.
#[derive(Copy, Clone, Debug)]
pub struct RuntimeContext {
    pub(crate) active_page: u32,
    pub(crate) first_empty_offset: u32,
}

impl RuntimeContext {
    /// Sentinel state meaning "not yet populated by `init()`". Any read or
    /// write against a sector left in this state is treated as a fault.
    pub const UNINIT: RuntimeContext = RuntimeContext {
        active_page: u32::MAX,
        first_empty_offset: 0,
    };

    pub(crate) fn is_valid(&self, params: &Params) -> bool {
        self.active_page < params.pages_per_sector
    }
}

/// Reads the header status of `page` in `sector`.
pub(crate) fn page_status<F: Flash>(flash: &F, params: &Params, sector: u32, page: u32) -> u16 {
    page::read_status(flash, params.page_base(sector, page))
}

/// Programs `page`'s header status. Flash must be unlocked by the caller.
pub(crate) unsafe fn set_page_status<F: Flash>(
    flash: &F,
    params: &Params,
    sector: u32,
    page: u32,
    status: u16,
) -> FlashResult {
    flash.program_u16(params.page_base(sector, page), status)
}

/// Whether `page` currently holds anything other than the erased pattern.
pub(crate) fn is_page_dirty<F: Flash>(flash: &F, params: &Params, sector: u32, page: u32) -> bool {
    let base = params.page_base(sector, page);
    if flash.read_u16(base) != page::ERASED_HW || flash.read_u16(base + 2) != page::RESERVED {
        return true;
    }
    for idx in 0..params.entries_per_page() {
        if page::read_entry_word(flash, base, idx) != page::ERASED_W {
            return true;
        }
    }
    false
}

/// Erases `page`, skipping the flash erase call entirely if it is already
/// fully erased -- avoids unnecessary wear, mirroring the teacher's
/// `is_page_dirty` guard.
pub(crate) unsafe fn erase_page<F: Flash>(
    flash: &F,
    params: &Params,
    sector: u32,
    page: u32,
) -> FlashResult {
    if is_page_dirty(flash, params, sector, page) {
        flash.erase_pages(params.page_base(sector, page), 1)
    } else {
        Ok(())
    }
}

/// Forward-scans `page` for the first empty entry slot, returning its
/// absolute address. If the page is full, returns the address just past
/// its last entry (i.e. the page's end).
pub(crate) fn first_empty_address<F: Flash>(
    flash: &F,
    params: &Params,
    sector: u32,
    page: u32,
) -> u32 {
    let base = params.page_base(sector, page);
    for idx in 0..params.entries_per_page() {
        let (addr, _) = page::read_entry(flash, base, idx);
        if addr == page::ERASED_HW {
            return page::entry_addr(base, idx);
        }
    }
    base + params.page_size
}

/// Scan-read (`spec.md` §4.2): walks the active page backward from the
/// last written slot looking for `logical_addr`. Returns `None` if not
/// found ("empty").
pub(crate) fn scan_read<F: Flash>(
    flash: &F,
    params: &Params,
    sector: u32,
    ctx: &RuntimeContext,
    logical_addr: u16,
) -> Option<u16> {
    let base = params.page_base(sector, ctx.active_page);
    let first_entry = page::entry_addr(base, 0);
    if ctx.first_empty_offset <= first_entry {
        return None;
    }
    let written = (ctx.first_empty_offset - first_entry) / crate::page::ENTRY_SIZE;
    for idx in (0..written).rev() {
        let (addr, value) = page::read_entry(flash, base, idx);
        if addr == logical_addr {
            return Some(value);
        }
    }
    None
}

/// Boot reconciliation for a single sector (`spec.md` §4.1). Leaves the
/// sector with exactly one ACTIVE page on flash and returns the matching
/// `RuntimeContext`.
pub(crate) fn boot_reconcile<F: Flash>(
    flash: &F,
    params: &Params,
    sector: u32,
) -> FlashResult<RuntimeContext> {
    let _unlocked = unsafe { flash.unlock_guard()? };

    let mut active: Option<u32> = None;
    for page in 0..params.pages_per_sector {
        match page::classify(page_status(flash, params, sector, page)) {
            PageState::Active => {
                active = Some(resolve_two_active(flash, params, sector, active, page)?);
            }
            PageState::Erased | PageState::Other => {
                // Left alone: a future swap's pre-erase step reclaims it.
            }
        }
    }

    match active {
        None => force_init(flash, params, sector),
        Some(page) => {
            let first_empty_offset = first_empty_address(flash, params, sector, page);
            #[cfg(feature = "log")]
            log::debug!("sector {} booted with page {} active", sector, page);
            Ok(RuntimeContext {
                active_page: page,
                first_empty_offset,
            })
        }
    }
}

/// Resolves two active pages found during boot scan: the older one
/// (`spec.md` §4.1's pairwise rule) is erased, the surviving index is
/// returned. Called once per newly discovered ACTIVE page, so it also
/// correctly folds three-or-more ACTIVE pages by repeated pairwise
/// resolution in scan order.
///
/// Relies on `Params::pages_per_sector >= 3` (enforced by
/// `Params::validate`): the `{0, P-1}` wrap pair must not coincide with a
/// non-wrapped adjacent pair, which only holds for `P >= 3`.
fn resolve_two_active<F: Flash>(
    flash: &F,
    params: &Params,
    sector: u32,
    current: Option<u32>,
    found: u32,
) -> FlashResult<u32> {
    let Some(prev) = current else {
        return Ok(found);
    };
    let wrapped = prev == 0 && found == params.pages_per_sector - 1;
    if wrapped {
        // The ring wrapped: the later page (found) predates the earlier
        // one (prev) in log order and must be erased.
        unsafe { erase_page(flash, params, sector, found)? };
        Ok(prev)
    } else {
        // The lower-index page in linear scan order is the old page.
        unsafe { erase_page(flash, params, sector, prev)? };
        Ok(found)
    }
}

/// Zero-ACTIVE branch of boot reconciliation, also used as the last-resort
/// recovery path when a fault is detected during a read or write
/// (`spec.md` §7): erase the whole sector and mark page 0 active.
pub(crate) fn force_init<F: Flash>(
    flash: &F,
    params: &Params,
    sector: u32,
) -> FlashResult<RuntimeContext> {
    let _unlocked = unsafe { flash.unlock_guard()? };
    for page in 0..params.pages_per_sector {
        unsafe { erase_page(flash, params, sector, page)? };
    }
    unsafe { set_page_status(flash, params, sector, 0, page::STATUS_ACTIVE)? };
    #[cfg(feature = "log")]
    log::warn!("sector {} re-initialized from scratch", sector);
    Ok(RuntimeContext {
        active_page: 0,
        first_empty_offset: page::entry_addr(params.page_base(sector, 0), 0),
    })
}
