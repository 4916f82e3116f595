//! Value codecs: typed views over the bytes of one element.
//!
//! A [`ValueCodec`] decodes the canonical bytes of an element
//! into an ordered sequence of values of one value representation,
//! gives typed access to them,
//! and encodes them back into bytes.
//!
//! Codecs come in three families:
//!
//! - [`StringCodec`] for textual value representations,
//!   with the specialized behavior of age, decimal, integer,
//!   date, time and date-time strings selected by a [`StringKind`];
//! - [`NumericCodec`] for binary arrays of fixed width numbers;
//! - [`RawCodec`] for plain bytes,
//!   regardless of the declared value representation.
//!
//! Codecs are created by value representation code
//! through a [`CodecRegistry`].
//!
//! Accessors are permissive:
//! reading at an index out of range yields zero or empty text,
//! writing at an index out of range does nothing,
//! and text longer than the maximum length of the value representation
//! is truncated.

use crate::text::{DecodeTextError, EncodeTextError};
use dicombuf_core::{ByteMemory, VrCode};
use snafu::{Backtrace, Snafu};
use std::fmt;

pub mod age;
mod lexical;
pub mod numeric;
pub mod registry;
pub mod string;
pub mod temporal;

pub use age::{Age, AgeUnit};
pub use numeric::{NumericCodec, NumericElement, RawCodec};
pub use registry::{registry, CodecFactory, CodecRegistry};
pub use string::{StringCodec, StringKind, StringTraits};
pub use temporal::DateTimeParts;

use crate::text::CharsetList;

/// An error raised while creating, decoding or encoding a value codec.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// No codec is registered for the value representation.
    #[snafu(display("unknown value representation `{}`", code))]
    UnknownValueRepresentation {
        /// The code with no registered codec.
        code: VrCode,
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
    /// The character set of a textual value is not supported.
    #[snafu(display("could not resolve the character set"))]
    UnsupportedCharacterSet {
        /// The name resolution failure.
        source: crate::text::UnsupportedCharacterSet,
    },
    /// The value bytes could not be converted to text.
    #[snafu(display("could not decode text"))]
    DecodeText {
        /// The underlying text error.
        source: DecodeTextError,
    },
    /// The values could not be converted to bytes in their character set.
    #[snafu(display("could not encode text"))]
    EncodeText {
        /// The underlying text error.
        source: EncodeTextError,
    },
    /// A date or time value is malformed (strict mode only).
    #[snafu(display("malformed {} value `{}`", vr, value))]
    MalformedTemporal {
        /// The value representation of the codec.
        vr: VrCode,
        /// The offending value.
        value: String,
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
}

/// Type alias for a result from this module.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Options which affect how codecs interpret values.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct CodecOptions {
    /// Reject date and time values which are malformed after normalization
    /// when decoding, instead of keeping them as they are.
    pub strict_temporal: bool,
}

impl CodecOptions {
    /// Create the default options.
    pub fn new() -> Self {
        CodecOptions::default()
    }

    /// Set whether malformed date and time values are rejected on decoding.
    pub fn strict_temporal(mut self, strict: bool) -> Self {
        self.strict_temporal = strict;
        self
    }
}

/// A typed, detached working copy of the values of one element.
///
/// A codec owns its values:
/// changes made through it are invisible to the element
/// until it is encoded back and committed.
pub trait ValueCodec: fmt::Debug + Send {
    /// The value representation code the codec was created for.
    fn vr_code(&self) -> VrCode;

    /// The character sets used for textual conversions.
    fn charsets(&self) -> &CharsetList;

    /// Replace the character sets used for textual conversions.
    fn set_charsets(&mut self, charsets: CharsetList);

    /// Replace the values with those held in the given bytes.
    fn decode(&mut self, bytes: &ByteMemory) -> Result<()>;

    /// Serialize the values.
    ///
    /// The output is not padded to an even length.
    fn encode(&self) -> Result<ByteMemory>;

    /// The number of values.
    fn len(&self) -> usize;

    /// Whether there are no values.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a value exists at the given index.
    fn is_index_valid(&self, index: usize) -> bool {
        index < self.len()
    }

    /// Change the number of values.
    /// Value representations without multiplicity always keep one value.
    fn resize(&mut self, len: usize);

    /// Read a value as a signed integer.
    fn get_as_integer(&self, index: usize) -> i64;

    /// Read a value as an unsigned integer.
    fn get_as_unsigned_integer(&self, index: usize) -> u64;

    /// Read a value as a floating point number.
    fn get_as_float(&self, index: usize) -> f64;

    /// Read a value as text encoded in the codec's character set.
    fn get_as_text(&self, index: usize) -> Vec<u8>;

    /// Read a value as text.
    fn get_as_unicode_text(&self, index: usize) -> String;

    /// Write a signed integer.
    fn set_as_integer(&mut self, index: usize, value: i64);

    /// Write an unsigned integer.
    fn set_as_unsigned_integer(&mut self, index: usize, value: u64);

    /// Write a floating point number.
    fn set_as_float(&mut self, index: usize, value: f64);

    /// Write text encoded in the codec's character set.
    fn set_as_text(&mut self, index: usize, value: &[u8]);

    /// Write text.
    fn set_as_unicode_text(&mut self, index: usize, value: &str);

    /// Read a value as date and time components.
    fn get_date(&self, _index: usize) -> DateTimeParts {
        DateTimeParts::default()
    }

    /// Write date and time components.
    fn set_date(&mut self, _index: usize, _value: DateTimeParts) {}

    /// Read a value as an age.
    fn get_age(&self, _index: usize) -> Age {
        Age::default()
    }

    /// Write an age.
    fn set_age(&mut self, _index: usize, _value: Age) {}

    /// The byte used to pad encoded values to an even length.
    fn padding_byte(&self) -> u8;

    /// The encoded size of each value, or 0 if values vary in size.
    fn unit_size(&self) -> usize;

    /// The maximum length of each value in characters, or 0 if unbounded.
    fn max_value_length(&self) -> usize;

    /// The character separating values, if the value representation
    /// admits more than one value.
    fn separator(&self) -> Option<char>;
}

impl<T: ?Sized + ValueCodec> ValueCodec for Box<T> {
    fn vr_code(&self) -> VrCode {
        (**self).vr_code()
    }

    fn charsets(&self) -> &CharsetList {
        (**self).charsets()
    }

    fn set_charsets(&mut self, charsets: CharsetList) {
        (**self).set_charsets(charsets)
    }

    fn decode(&mut self, bytes: &ByteMemory) -> Result<()> {
        (**self).decode(bytes)
    }

    fn encode(&self) -> Result<ByteMemory> {
        (**self).encode()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn resize(&mut self, len: usize) {
        (**self).resize(len)
    }

    fn get_as_integer(&self, index: usize) -> i64 {
        (**self).get_as_integer(index)
    }

    fn get_as_unsigned_integer(&self, index: usize) -> u64 {
        (**self).get_as_unsigned_integer(index)
    }

    fn get_as_float(&self, index: usize) -> f64 {
        (**self).get_as_float(index)
    }

    fn get_as_text(&self, index: usize) -> Vec<u8> {
        (**self).get_as_text(index)
    }

    fn get_as_unicode_text(&self, index: usize) -> String {
        (**self).get_as_unicode_text(index)
    }

    fn set_as_integer(&mut self, index: usize, value: i64) {
        (**self).set_as_integer(index, value)
    }

    fn set_as_unsigned_integer(&mut self, index: usize, value: u64) {
        (**self).set_as_unsigned_integer(index, value)
    }

    fn set_as_float(&mut self, index: usize, value: f64) {
        (**self).set_as_float(index, value)
    }

    fn set_as_text(&mut self, index: usize, value: &[u8]) {
        (**self).set_as_text(index, value)
    }

    fn set_as_unicode_text(&mut self, index: usize, value: &str) {
        (**self).set_as_unicode_text(index, value)
    }

    fn get_date(&self, index: usize) -> DateTimeParts {
        (**self).get_date(index)
    }

    fn set_date(&mut self, index: usize, value: DateTimeParts) {
        (**self).set_date(index, value)
    }

    fn get_age(&self, index: usize) -> Age {
        (**self).get_age(index)
    }

    fn set_age(&mut self, index: usize, value: Age) {
        (**self).set_age(index, value)
    }

    fn padding_byte(&self) -> u8 {
        (**self).padding_byte()
    }

    fn unit_size(&self) -> usize {
        (**self).unit_size()
    }

    fn max_value_length(&self) -> usize {
        (**self).max_value_length()
    }

    fn separator(&self) -> Option<char> {
        (**self).separator()
    }
}
