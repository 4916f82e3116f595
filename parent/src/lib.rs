//! # dicombuf
//!
//! This crate serves as a parent for the library crates of the project.
//!
//! These modules are also available as crates
//! which can be fetched independently,
//! in complement or as an alternative to using the `dicombuf` crate.
//! For instance, the module `object`
//! lives in the crate named `dicombuf-object`.
//!
//! - The [`core`] module contains the value representation codes
//!   ([`VR`](dicombuf_core::VR), [`VrCode`](dicombuf_core::VrCode))
//!   and the byte storage ([`ByteMemory`](dicombuf_core::ByteMemory))
//!   that the other crates rely on.
//! - The [`encoding`] module turns element bytes into typed values and back
//!   through [value codecs](dicombuf_encoding::ValueCodec),
//!   created by value representation from a
//!   [registry](dicombuf_encoding::CodecRegistry),
//!   and converts text according to the declared character sets.
//! - The [`object`] module holds the
//!   [element buffers](dicombuf_object::ElementBuffer),
//!   which hand out codecs and commit their changes,
//!   alone or grouped in a [transaction](dicombuf_object::Transaction).
//!
//! ```
//! use dicombuf::core::VR;
//! use dicombuf::object::{with_committing_transaction, ElementBuffer, Result};
//! use std::sync::Arc;
//!
//! let modality = Arc::new(ElementBuffer::with_bytes(VR::CS, &b"CT"[..]));
//! with_committing_transaction(|_| -> Result<()> {
//!     modality.writer()?.codec().set_as_unicode_text(0, "MR");
//!     Ok(())
//! })?;
//! assert_eq!(modality.to_bytes()?.as_slice(), b"MR");
//! # Result::<()>::Ok(())
//! ```

pub use dicombuf_core as core;
pub use dicombuf_encoding as encoding;
pub use dicombuf_object as object;
