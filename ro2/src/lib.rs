//! Reading and writing for two Ragnarok Online 2 file formats: VDK archive
//! containers (`VDISK1.0` and `VDISK1.1`) and CT data tables (`RO2SEC!` and
//! `RO2!`).
//!
//! Archives are opened with [`Vdk::open`] and built with [`VdkWriter`];
//! tables with [`Table::open`] and [`Table::write`]. Both codecs are
//! synchronous and single-shot: readers parse a file into an owned model,
//! writers consume a model and produce a file.
mod bin;
pub mod checksum;
pub mod compress;
pub mod error;
pub mod read;
pub mod str;
pub mod table;
pub mod types;
pub mod version;
pub mod write;

pub use crate::bin::{Positioned, Readable, Writable};
pub use crate::error::{Error, Result};
pub use crate::read::{Entry, Vdk};
pub use crate::table::{Magic, Table};
pub use crate::types::CtType;
pub use crate::version::Version;
pub use crate::write::VdkWriter;
