#![crate_type = "lib"]
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]

//! This is the core library of `dicombuf`,
//! holding the primitive types shared by the codec and buffer crates.
//!
//! The current structure of this crate is as follows:
//!
//! - [`header`] comprises the value representation identifiers,
//!   both the standard [`VR`] enumeration
//!   and the [`VrCode`] actually declared by an element buffer.
//! - [`memory`] contains [`ByteMemory`],
//!   the raw byte storage behind element values,
//!   with the byte order adjustment applied to freshly loaded words.
//!
//! [`header`]: ./header/index.html
//! [`memory`]: ./memory/index.html

pub mod header;
pub mod memory;

pub use header::{VrCode, VR};
pub use memory::ByteMemory;

// re-export crates that are part of the public API
pub use byteordered::Endianness;
