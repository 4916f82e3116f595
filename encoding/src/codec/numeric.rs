//! Codecs for binary value representations:
//! arrays of fixed width numbers in native byte order.
//!
//! Element buffers hold binary values in native byte order,
//! so decoding and encoding here never swap bytes.

use super::lexical::{parse_float, parse_integer};
use super::{Result, ValueCodec};
use crate::text::CharsetList;
use dicombuf_core::{ByteMemory, VrCode};
use num_traits::{AsPrimitive, Zero};
use std::fmt;
use std::mem::size_of;

/// A number type which can be held in a binary element value.
pub trait NumericElement:
    Copy
    + Send
    + Sync
    + fmt::Debug
    + fmt::Display
    + Zero
    + AsPrimitive<f64>
    + AsPrimitive<i64>
    + AsPrimitive<u64>
    + 'static
{
    /// The encoded size of one value in bytes.
    const SIZE: usize;
    /// Whether the type is a floating point number.
    const IS_FLOAT: bool;

    /// Convert with the semantics of an `as` cast.
    fn from_i64(value: i64) -> Self;
    /// Convert with the semantics of an `as` cast.
    fn from_u64(value: u64) -> Self;
    /// Convert with the semantics of an `as` cast.
    fn from_f64(value: f64) -> Self;
    /// Read one value from exactly [`SIZE`](Self::SIZE) bytes.
    fn read_ne(bytes: &[u8]) -> Self;
    /// Append the bytes of this value.
    fn write_ne(self, out: &mut Vec<u8>);
}

macro_rules! impl_numeric_element {
    ($($t: ty => $float: expr),* $(,)?) => {
        $(
            impl NumericElement for $t {
                const SIZE: usize = size_of::<$t>();
                const IS_FLOAT: bool = $float;

                fn from_i64(value: i64) -> Self {
                    value.as_()
                }

                fn from_u64(value: u64) -> Self {
                    value.as_()
                }

                fn from_f64(value: f64) -> Self {
                    value.as_()
                }

                fn read_ne(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; size_of::<$t>()];
                    raw.copy_from_slice(bytes);
                    <$t>::from_ne_bytes(raw)
                }

                fn write_ne(self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_numeric_element! {
    u8 => false,
    i8 => false,
    u16 => false,
    i16 => false,
    u32 => false,
    i32 => false,
    u64 => false,
    i64 => false,
    f32 => true,
    f64 => true,
}

/// A codec for an array of binary numbers of type `T`.
#[derive(Debug, Clone)]
pub struct NumericCodec<T> {
    vr: VrCode,
    charsets: CharsetList,
    values: Vec<T>,
}

/// A codec exposing the bytes of an element as they are,
/// regardless of its value representation.
pub type RawCodec = NumericCodec<u8>;

impl<T> NumericCodec<T>
where
    T: NumericElement,
{
    /// Create an empty codec.
    pub fn new(vr: impl Into<VrCode>) -> Self {
        NumericCodec {
            vr: vr.into(),
            charsets: CharsetList::new(),
            values: Vec::new(),
        }
    }

    /// The decoded values.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    fn value(&self, index: usize) -> T {
        self.values.get(index).copied().unwrap_or_else(T::zero)
    }

    fn store(&mut self, index: usize, value: T) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }
}

impl RawCodec {
    /// Create a raw codec for an element of the given value representation.
    pub fn raw(vr: impl Into<VrCode>) -> Self {
        NumericCodec::new(vr)
    }
}

impl<T> ValueCodec for NumericCodec<T>
where
    T: NumericElement,
{
    fn vr_code(&self) -> VrCode {
        self.vr
    }

    fn charsets(&self) -> &CharsetList {
        &self.charsets
    }

    fn set_charsets(&mut self, charsets: CharsetList) {
        self.charsets = charsets;
    }

    fn decode(&mut self, bytes: &ByteMemory) -> Result<()> {
        // trailing bytes short of a whole value are ignored
        self.values = bytes.chunks_exact(T::SIZE).map(T::read_ne).collect();
        Ok(())
    }

    fn encode(&self) -> Result<ByteMemory> {
        let mut out = Vec::with_capacity(self.values.len() * T::SIZE);
        for value in &self.values {
            value.write_ne(&mut out);
        }
        Ok(ByteMemory::from(out))
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn resize(&mut self, len: usize) {
        self.values.resize(len, T::zero());
    }

    fn get_as_integer(&self, index: usize) -> i64 {
        AsPrimitive::<i64>::as_(self.value(index))
    }

    fn get_as_unsigned_integer(&self, index: usize) -> u64 {
        AsPrimitive::<u64>::as_(self.value(index))
    }

    fn get_as_float(&self, index: usize) -> f64 {
        AsPrimitive::<f64>::as_(self.value(index))
    }

    fn get_as_text(&self, index: usize) -> Vec<u8> {
        self.get_as_unicode_text(index).into_bytes()
    }

    fn get_as_unicode_text(&self, index: usize) -> String {
        if !self.is_index_valid(index) {
            return String::new();
        }
        self.value(index).to_string()
    }

    fn set_as_integer(&mut self, index: usize, value: i64) {
        self.store(index, T::from_i64(value));
    }

    fn set_as_unsigned_integer(&mut self, index: usize, value: u64) {
        self.store(index, T::from_u64(value));
    }

    fn set_as_float(&mut self, index: usize, value: f64) {
        self.store(index, T::from_f64(value));
    }

    fn set_as_text(&mut self, index: usize, value: &[u8]) {
        let text = String::from_utf8_lossy(value);
        self.set_as_unicode_text(index, &text);
    }

    fn set_as_unicode_text(&mut self, index: usize, value: &str) {
        if T::IS_FLOAT {
            self.set_as_float(index, parse_float(value));
        } else {
            let text = value.trim_start();
            if text.starts_with('-') {
                self.set_as_integer(index, parse_integer(text));
            } else {
                // keep the full unsigned range
                let digits: String = text
                    .trim_start_matches('+')
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .collect();
                match digits.parse::<u64>() {
                    Ok(v) => self.set_as_unsigned_integer(index, v),
                    Err(_) => self.set_as_integer(index, parse_integer(text)),
                }
            }
        }
    }

    fn padding_byte(&self) -> u8 {
        0
    }

    fn unit_size(&self) -> usize {
        T::SIZE
    }

    fn max_value_length(&self) -> usize {
        0
    }

    fn separator(&self) -> Option<char> {
        None
    }
}

impl<T> From<NumericCodec<T>> for Vec<T> {
    fn from(codec: NumericCodec<T>) -> Self {
        codec.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicombuf_core::VR;
    use pretty_assertions::assert_eq;

    fn bytes_of<T: NumericElement>(values: &[T]) -> ByteMemory {
        let mut out = Vec::new();
        for v in values {
            v.write_ne(&mut out);
        }
        ByteMemory::from(out)
    }

    #[test]
    fn decode_native_words() {
        let mut codec = NumericCodec::<u16>::new(VR::US);
        codec.decode(&bytes_of(&[1u16, 0x1234, 65535])).unwrap();
        assert_eq!(codec.values(), &[1u16, 0x1234, 65535]);
        assert_eq!(codec.unit_size(), 2);
        assert_eq!(codec.get_as_integer(2), 65535);
        assert_eq!(codec.get_as_unicode_text(1), "4660");
    }

    #[test]
    fn encode_and_resize() {
        let mut codec = NumericCodec::<i32>::new(VR::SL);
        codec.resize(3);
        codec.set_as_integer(0, -5);
        codec.set_as_float(1, 2.9);
        codec.set_as_unicode_text(2, " 123abc");
        assert_eq!(codec.values(), &[-5i32, 2, 123]);
        assert_eq!(codec.encode().unwrap(), bytes_of(&[-5i32, 2, 123]));

        codec.resize(1);
        assert_eq!(codec.values(), &[-5i32]);
        codec.resize(2);
        assert_eq!(codec.values(), &[-5i32, 0]);
    }

    #[test]
    fn floats() {
        let mut codec = NumericCodec::<f64>::new(VR::FD);
        codec.resize(2);
        codec.set_as_unicode_text(0, "2.5e1");
        codec.set_as_integer(1, 7);
        assert_eq!(codec.get_as_float(0), 25.);
        assert_eq!(codec.get_as_integer(0), 25);
        assert_eq!(codec.get_as_unicode_text(1), "7");

        let mut codec = NumericCodec::<f32>::new(VR::FL);
        codec.resize(1);
        codec.set_as_float(0, 0.5);
        assert_eq!(codec.get_as_unicode_text(0), "0.5");
    }

    #[test]
    fn unsigned_range_is_preserved() {
        let mut codec = NumericCodec::<u64>::new(VR::UV);
        codec.resize(1);
        codec.set_as_unicode_text(0, "18446744073709551615");
        assert_eq!(codec.get_as_unsigned_integer(0), u64::MAX);
        codec.set_as_unsigned_integer(0, 1 << 63);
        assert_eq!(codec.get_as_unsigned_integer(0), 1 << 63);
    }

    #[test]
    fn out_of_range_access_is_harmless() {
        let mut codec = NumericCodec::<f32>::new(VR::FL);
        assert_eq!(codec.get_as_float(0), 0.);
        assert_eq!(codec.get_as_integer(4), 0);
        assert_eq!(codec.get_as_unicode_text(4), "");
        codec.set_as_integer(4, 1);
        assert!(codec.is_empty());
    }

    #[test]
    fn raw_codec_keeps_odd_lengths_until_padded() {
        let mut codec = RawCodec::raw(VR::OB);
        codec.decode(&ByteMemory::from(&[1u8, 2, 3][..])).unwrap();
        assert_eq!(codec.len(), 3);
        let mut bytes = codec.encode().unwrap();
        assert_eq!(bytes.as_slice(), &[1u8, 2, 3]);
        assert!(bytes.pad_to_even(codec.padding_byte()));
        assert_eq!(bytes.as_slice(), &[1u8, 2, 3, 0]);

        // any value representation can be viewed raw
        let mut raw = RawCodec::raw(VR::PN);
        raw.decode(&ByteMemory::from(&b"Doe^John"[..])).unwrap();
        assert_eq!(raw.get_as_integer(0), i64::from(b'D'));
        assert_eq!(raw.vr_code(), VR::PN);
    }

    #[test]
    fn partial_words_are_ignored() {
        let mut codec = NumericCodec::<u32>::new(VR::UL);
        codec.decode(&ByteMemory::from(&[0u8; 6][..])).unwrap();
        assert_eq!(codec.len(), 1);
    }
}
