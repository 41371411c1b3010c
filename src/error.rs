//! Crate-level error type, wrapping the flash driver's own error kind with
//! the fault the engine itself can detect (`spec.md` §7).

use crate::flash::FlashError;

/// Error returned by a mutating EEPROM operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The underlying flash driver reported a failure (program or erase).
    /// The on-flash state may be partial; the next `init()` or the next
    /// write's pre-erase step recovers it.
    Flash(FlashError),
    /// The sector's runtime state was found inconsistent (active page
    /// index out of range, or `first_empty_offset` before the page's
    /// first entry slot). The sector has already been re-initialized as a
    /// side effect of detecting this; client data not present in the
    /// surviving page is lost.
    InconsistentSectorState,
}

impl From<FlashError> for Error {
    fn from(e: FlashError) -> Error {
        Error::Flash(e)
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Flash(e) => write!(f, "flash driver error: {}", e),
            Error::InconsistentSectorState => {
                f.write_str("sector runtime state was inconsistent, sector was re-initialized")
            }
        }
    }
}

/// Outcome of a [`crate::Eeprom::read`] call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReadStatus {
    /// A live value was found for the queried logical address.
    Found(u16),
    /// No entry for the queried logical address exists in the active page.
    Empty,
    /// The sector's runtime state was inconsistent; it has been
    /// re-initialized (all data erased) as a side effect. The caller may
    /// retry.
    Fault,
}

impl ReadStatus {
    /// Returns the found value, or `None` for `Empty`/`Fault`.
    pub fn value(self) -> Option<u16> {
        match self {
            ReadStatus::Found(v) => Some(v),
            ReadStatus::Empty | ReadStatus::Fault => None,
        }
    }
}
