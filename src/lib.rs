//! Log-structured, wear-leveled emulated EEPROM on top of raw NOR flash.
//!
//! Flash is page-erasable and word-programmable-once; this crate layers a
//! byte-addressable (half-word granular) key/value store on top of it,
//! wear-leveling writes across a ring of physical pages per sector and
//! surviving power loss at any point via a commit protocol that a
//! boot-time scan can always reconcile.
//!
//! # Examples
//! ```rust,no_run
//! use eeprom::{Eeprom, Params, RuntimeContext};
//! # use eeprom::flash::{Flash, FlashResult};
//! # struct MyFlash;
//! # impl Flash for MyFlash {
//! #   fn is_locked(&self) -> bool { unimplemented!() }
//! #   unsafe fn unlock(&self) { unimplemented!() }
//! #   unsafe fn lock(&self) { unimplemented!() }
//! #   fn read_u16(&self, _addr: u32) -> u16 { unimplemented!() }
//! #   fn read_u32(&self, _addr: u32) -> u32 { unimplemented!() }
//! #   unsafe fn erase_pages(&self, _base: u32, _count: u32) -> FlashResult { unimplemented!() }
//! #   unsafe fn program_u16(&self, _addr: u32, _data: u16) -> FlashResult { unimplemented!() }
//! #   unsafe fn program_u32(&self, _addr: u32, _data: u32) -> FlashResult { unimplemented!() }
//! # }
//! # let flash = MyFlash;
//! let params = Params {
//!     first_sector_offset: 0x0800_0000,
//!     page_size: 1024,
//!     pages_per_sector: 6,
//!     sector_count: 1,
//! };
//! let mut contexts = [RuntimeContext::UNINIT; 1];
//! let mut eeprom = Eeprom::<_, 255>::new(params, &flash, &mut contexts);
//! eeprom.init().expect("failed to init EEPROM");
//! eeprom.write(1, 0xdead).expect("failed to write data to EEPROM");
//! eeprom.write(2, 0xbeef).expect("failed to write data to EEPROM");
//! assert_eq!(Some(0xdead), eeprom.read(1).value());
//! assert_eq!(Some(0xbeef), eeprom.read(2).value());
//! assert_eq!(None, eeprom.read(3).value());
//! ```
//!
//! # Panics
//! No operation in this crate panics in production builds; `debug_assert!`
//! checks on configuration (`Params`) and on internal invariants only fire
//! in debug builds. A detected runtime inconsistency (`spec.md` §7) is
//! reported through [`Error`]/[`ReadStatus`], not a panic.
#![no_std]
#![warn(missing_docs)]
#![deny(warnings)]

#[cfg(test)]
#[macro_use]
extern crate std;


pub mod error;
pub mod flash;
mod page;
mod params;
mod sector;

mod eeprom;

pub use crate::eeprom::Eeprom;
pub use crate::error::{Error, ReadStatus};
pub use crate::flash::Flash;
pub use crate::params::Params;
pub use crate::sector::RuntimeContext;
