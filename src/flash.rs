//! Flash driver contract consumed by the EEPROM engine.
//!
//! The engine never talks to a concrete MCU peripheral directly -- it only
//! ever goes through this trait, so the exact same engine code runs against
//! real MMIO flash or an in-memory mock used by the test suite.

/// Flash operation error, reported by the underlying driver.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlashError {
    /// Flash program and erase controller failed to unlock.
    UnlockFailed,
    /// Timeout while waiting for the completion of the operation.
    Timeout,
    /// Address to be programmed contains a value different from `0xFFFF`
    /// before programming (target cell was not erased).
    ProgrammingError,
    /// Programming a write-protected address of the flash memory.
    WriteProtectionError,
    /// Programming and erase controller is busy.
    Busy,
}

impl core::fmt::Display for FlashError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            FlashError::UnlockFailed => "flash unlock sequence failed",
            FlashError::Timeout => "flash operation timed out",
            FlashError::ProgrammingError => "target cell was not erased before programming",
            FlashError::WriteProtectionError => "flash address is write-protected",
            FlashError::Busy => "flash controller is busy",
        };
        f.write_str(msg)
    }
}

/// A type alias for the result of a flash operation.
pub type FlashResult<T = ()> = Result<T, FlashError>;

/// A type alias for the result of a flash unlock method.
pub type UnlockResult<'a, F> = Result<UnlockGuard<'a, F>, FlashError>;

/// High-level API for the flash memory backing the emulated EEPROM.
///
/// Addresses are absolute byte offsets into the flash address space (see
/// `spec.md` §6 for the on-flash layout); implementors are responsible for
/// mapping them onto whatever the real peripheral expects.
pub trait Flash {
    /// Check if the flash program and erase controller (FPEC) is locked.
    fn is_locked(&self) -> bool;

    /// Unlocks the flash program and erase controller.
    ///
    /// # Safety
    /// Must be paired with a call to `lock` once programming is done.
    unsafe fn unlock(&self);

    /// Locks the flash program and erase controller.
    ///
    /// # Safety
    /// Must only be called after a matching `unlock`.
    unsafe fn lock(&self);

    /// Unlocks the flash program and erase controller. An RAII guard is
    /// returned to allow scoped unlock of the flash -- when the guard goes
    /// out of scope, the flash is locked again.
    ///
    /// If the flash is unlocked already, the unlock sequence is skipped and
    /// the flash is left unlocked when the guard drops.
    ///
    /// # Safety
    /// Caller must ensure no other unlock guard is alive for this flash.
    unsafe fn unlock_guard(&self) -> UnlockResult<'_, Self>
    where
        Self: Sized,
    {
        let locked = self.is_locked();
        if locked {
            self.unlock();
        }
        Ok(UnlockGuard {
            flash: self,
            should_lock: locked,
        })
    }

    /// Reads a 16-bit half-word at `addr` (must be 2-byte aligned).
    fn read_u16(&self, addr: u32) -> u16;

    /// Reads a 32-bit word at `addr` (must be 4-byte aligned).
    fn read_u32(&self, addr: u32) -> u32;

    /// Erases `page_count` contiguous pages starting at `base_addr`. All
    /// bits in the erased range become `1`.
    ///
    /// # Safety
    /// `base_addr` must be the start of a page within the flash region
    /// owned by this driver.
    unsafe fn erase_pages(&self, base_addr: u32, page_count: u32) -> FlashResult;

    /// Programs a 16-bit half-word at `addr`. The target cell must already
    /// be erased -- programming may only clear bits, never set them.
    ///
    /// # Safety
    /// `addr` must be 2-byte aligned and point at an erased cell.
    unsafe fn program_u16(&self, addr: u32, data: u16) -> FlashResult;

    /// Programs a 32-bit word at `addr`. The target cells must already be
    /// erased.
    ///
    /// # Safety
    /// `addr` must be 4-byte aligned and point at erased cells.
    unsafe fn program_u32(&self, addr: u32, data: u32) -> FlashResult;
}

/// An RAII implementation of a "scoped unlock" of a [`Flash`]. When this
/// structure is dropped, the flash is locked again (unless it was already
/// unlocked when the guard was created).
pub struct UnlockGuard<'a, F: Flash> {
    flash: &'a F,
    should_lock: bool,
}

impl<'a, F: Flash> Drop for UnlockGuard<'a, F> {
    fn drop(&mut self) {
        if self.should_lock {
            unsafe {
                self.flash.lock();
            }
        }
    }
}

impl<'a, F: Flash> core::ops::Deref for UnlockGuard<'a, F> {
    type Target = F;

    fn deref(&self) -> &F {
        self.flash
    }
}
