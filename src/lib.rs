#![deny(trivial_casts, trivial_numeric_casts, unused_import_braces)]
//! # mmdbq
//!
//! A read-only reader for MaxMind DB (MMDB) version 2 files: single-file,
//! memory-mappable, immutable databases mapping IPv4 and IPv6 addresses
//! to structured data records.
//!
//! The reader takes an address string, walks the binary search tree over
//! the address bits, and decodes the record attached to the longest
//! matching prefix into an owned [`Value`] tree. Record contents are not
//! interpreted; what a `country` or `autonomous_system_number` field
//! means is up to the caller.
//!
//! ## Quick start
//!
//! ```no_run
//! use mmdbq::Database;
//!
//! fn main() -> Result<(), mmdbq::MmdbError> {
//!     let db = Database::open("GeoLite2-Country.mmdb")?;
//!
//!     match db.lookup("89.160.20.128")? {
//!         Some(record) => println!("{:?}", record.get("country")),
//!         None => println!("no record"),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Thread safety
//!
//! A [`Database`] is immutable after construction; lookups never lock
//! and may run from any number of threads.

mod cursor;
mod database;
mod decoder;
mod error;
mod ip;
mod metadata;
mod tree;
mod value;

// Re-export public types
pub use database::Database;
pub use error::MmdbError;
pub use memmap2::Mmap;
pub use metadata::Metadata;
pub use value::Value;
