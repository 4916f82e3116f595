#![crate_type = "lib"]
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]
//! Value codecs and character set support for DICOM element buffers.
//!
//! This crate turns the raw bytes of one element into typed values and back.
//! The [`codec`] module holds the [`ValueCodec`] trait,
//! its implementations for textual and binary value representations,
//! and the registry which creates them by value representation code.
//! The [`text`] module converts between text and bytes
//! according to the character sets declared for an element.
//!
//! # Example
//!
//! ```
//! # use dicombuf_encoding::codec::{registry, CodecOptions, ValueCodec};
//! # use dicombuf_core::{ByteMemory, VR};
//! let mut codec = registry().create(VR::DA.into(), &CodecOptions::new())?;
//! codec.decode(&ByteMemory::from(&b"2004-11-5"[..]))?;
//! assert_eq!(codec.get_as_unicode_text(0), "2004-11-05");
//! # Ok::<(), dicombuf_encoding::codec::Error>(())
//! ```
//!
//! [`ValueCodec`]: ./codec/trait.ValueCodec.html

pub mod codec;
pub mod text;

pub use codec::{registry, CodecOptions, CodecRegistry, ValueCodec};
pub use text::{CharsetList, SpecificCharacterSet, TextCodec};
