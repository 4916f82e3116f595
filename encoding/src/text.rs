//! Text encoding and decoding for textual element values,
//! including support for the character repertoires
//! named in a Specific Character Set element.
//!
//! Please see [`SpecificCharacterSet`] for a complete enumeration
//! of all supported text encodings,
//! and [`CharsetList`] for the ordered list of character set names
//! that element buffers and value codecs carry around.
//!
//! [`SpecificCharacterSet`]: ./enum.SpecificCharacterSet.html
//! [`CharsetList`]: ./struct.CharsetList.html

use encoding::all::{GB18030, ISO_8859_1, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, UTF_8};
use encoding::{DecoderTrap, EncoderTrap, EncodingRef, RawDecoder, StringWriter};
use smallvec::SmallVec;
use snafu::{Backtrace, Snafu};
use std::borrow::Cow;

/// An error type for text encoding issues.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum EncodeTextError {
    /// The text holds characters outside of the character set.
    #[snafu(display("cannot encode text in {}: {}", charset, message))]
    Unmappable {
        /// The name of the character set.
        charset: &'static str,
        /// The message reported by the encoder.
        message: Cow<'static, str>,
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
}

/// An error type for text decoding issues.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DecodeTextError {
    /// The bytes are not valid in the character set.
    #[snafu(display("cannot decode text in {}: {}", charset, message))]
    Undecodable {
        /// The name of the character set.
        charset: &'static str,
        /// The message reported by the decoder.
        message: Cow<'static, str>,
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
}

type EncodeResult<T> = Result<T, EncodeTextError>;
type DecodeResult<T> = Result<T, DecodeTextError>;

/// Conversion between text and the bytes of textual element values.
pub trait TextCodec {
    /// The defined term of the character set,
    /// as it would appear in a Specific Character Set element.
    fn name(&self) -> &'static str;

    /// Decode bytes into text.
    /// Multiple values stay joined by their separator.
    fn decode(&self, text: &[u8]) -> DecodeResult<String>;

    /// Encode text into bytes.
    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>>;
}

/// An enum type for all currently supported character sets.
///
/// Decoding never fails on bytes outside of the repertoire:
/// each of them becomes the private use character `U+F700 + byte`,
/// and encoding writes such characters back as the original byte.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, PartialOrd, Ord)]
#[non_exhaustive]
pub enum SpecificCharacterSet {
    /// **ISO-IR 6**: the default character set.
    #[default]
    Default,
    /// **ISO-IR 100** (ISO-8859-1): Latin alphabet no. 1, Western Europe.
    IsoIr100,
    /// **ISO-IR 101** (ISO-8859-2): Latin alphabet no. 2, Central/Eastern Europe.
    IsoIr101,
    /// **ISO-IR 109** (ISO-8859-3): Latin alphabet no. 3, South Europe.
    IsoIr109,
    /// **ISO-IR 110** (ISO-8859-4): Latin alphabet no. 4, North Europe.
    IsoIr110,
    /// **ISO-IR 144** (ISO-8859-5): Latin/Cyrillic.
    IsoIr144,
    /// **ISO-IR 192**: Unicode in UTF-8.
    IsoIr192,
    /// **GB18030**: Simplified Chinese.
    Gb18030,
}

impl SpecificCharacterSet {
    /// Obtain the character set named by a defined term.
    ///
    /// The single byte terms are accepted
    /// in their `ISO_IR n` and `ISO 2022 IR n` forms.
    /// Trailing spaces are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// # use dicombuf_encoding::text::SpecificCharacterSet;
    /// let character_set = SpecificCharacterSet::from_code("ISO 2022 IR 100");
    /// assert_eq!(character_set, Some(SpecificCharacterSet::IsoIr100));
    /// ```
    pub fn from_code(code: &str) -> Option<Self> {
        use self::SpecificCharacterSet::*;
        let code = code.trim_end();
        match code {
            "Default" => return Some(Default),
            "GB18030" => return Some(Gb18030),
            _ => {}
        }
        let number = code
            .strip_prefix("ISO_IR")
            .or_else(|| code.strip_prefix("ISO 2022 IR"))?
            .trim_start_matches(|c: char| c == ' ' || c == '_');
        match number {
            "6" => Some(Default),
            "100" => Some(IsoIr100),
            "101" => Some(IsoIr101),
            "109" => Some(IsoIr109),
            "110" => Some(IsoIr110),
            "144" => Some(IsoIr144),
            "192" => Some(IsoIr192),
            _ => None,
        }
    }

    fn repertoire(self) -> EncodingRef {
        match self {
            // ISO 8859-1 is a superset of the default repertoire
            SpecificCharacterSet::Default | SpecificCharacterSet::IsoIr100 => ISO_8859_1,
            SpecificCharacterSet::IsoIr101 => ISO_8859_2,
            SpecificCharacterSet::IsoIr109 => ISO_8859_3,
            SpecificCharacterSet::IsoIr110 => ISO_8859_4,
            SpecificCharacterSet::IsoIr144 => ISO_8859_5,
            SpecificCharacterSet::IsoIr192 => UTF_8,
            SpecificCharacterSet::Gb18030 => GB18030,
        }
    }
}

impl TextCodec for SpecificCharacterSet {
    fn name(&self) -> &'static str {
        match self {
            SpecificCharacterSet::Default => "ISO_IR 6",
            SpecificCharacterSet::IsoIr100 => "ISO_IR 100",
            SpecificCharacterSet::IsoIr101 => "ISO_IR 101",
            SpecificCharacterSet::IsoIr109 => "ISO_IR 109",
            SpecificCharacterSet::IsoIr110 => "ISO_IR 110",
            SpecificCharacterSet::IsoIr144 => "ISO_IR 144",
            SpecificCharacterSet::IsoIr192 => "ISO_IR 192",
            SpecificCharacterSet::Gb18030 => "GB18030",
        }
    }

    fn decode(&self, text: &[u8]) -> DecodeResult<String> {
        self.repertoire()
            .decode(text, DecoderTrap::Call(escape_undecodable))
            .map_err(|message| {
                UndecodableSnafu {
                    charset: self.name(),
                    message,
                }
                .build()
            })
    }

    fn encode(&self, text: &str) -> EncodeResult<Vec<u8>> {
        let mut bytes = Vec::with_capacity(text.len());
        let mut plain = 0;
        for (i, c) in text.char_indices() {
            if let Some(byte) = escaped_byte(c) {
                self.encode_into(&text[plain..i], &mut bytes)?;
                bytes.push(byte);
                plain = i + c.len_utf8();
            }
        }
        self.encode_into(&text[plain..], &mut bytes)?;
        Ok(bytes)
    }
}

impl SpecificCharacterSet {
    fn encode_into(self, text: &str, bytes: &mut Vec<u8>) -> EncodeResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.repertoire()
            .encode_to(text, EncoderTrap::Strict, bytes)
            .map_err(|message| {
                UnmappableSnafu {
                    charset: self.name(),
                    message,
                }
                .build()
            })
    }
}

/// First code point of the private use block standing for undecodable bytes.
const ESCAPE_BASE: u32 = 0xF700;

/// Replace each byte the decoder rejects with the private use character
/// `U+F700 + byte`, which encoding turns back into the same byte.
fn escape_undecodable(
    _decoder: &mut dyn RawDecoder,
    input: &[u8],
    output: &mut dyn StringWriter,
) -> bool {
    for &byte in input {
        if let Some(c) = std::char::from_u32(ESCAPE_BASE + u32::from(byte)) {
            output.write_char(c);
        }
    }
    true
}

fn escaped_byte(c: char) -> Option<u8> {
    let offset = u32::from(c).checked_sub(ESCAPE_BASE)?;
    if offset <= 0xFF {
        Some(offset as u8)
    } else {
        None
    }
}

/// The result of a text validation procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TextValidationOutcome {
    /// The text only has characters allowed by the value representation.
    Ok,
    /// The text has characters outside of the value representation's repertoire.
    NotOk,
}

fn digits_and(text: &[u8], extra: &[u8]) -> TextValidationOutcome {
    if text.iter().all(|c| c.is_ascii_digit() || extra.contains(c)) {
        TextValidationOutcome::Ok
    } else {
        TextValidationOutcome::NotOk
    }
}

/// Check whether the given bytes only hold characters of a DA value.
pub fn validate_da(text: &[u8]) -> TextValidationOutcome {
    digits_and(text, b"")
}

/// Check whether the given bytes only hold characters of a TM value.
pub fn validate_tm(text: &[u8]) -> TextValidationOutcome {
    digits_and(text, b"\\.- ")
}

/// Check whether the given bytes only hold characters of a DT value.
pub fn validate_dt(text: &[u8]) -> TextValidationOutcome {
    digits_and(text, b".-+ \\")
}

/// An error raised when a character set name is not supported.
#[derive(Debug, Snafu)]
#[snafu(display("unsupported character set `{}`", name))]
pub struct UnsupportedCharacterSet {
    name: String,
    backtrace: Backtrace,
}

impl UnsupportedCharacterSet {
    /// The offending character set name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An ordered list of character set names,
/// as declared by a Specific Character Set element.
///
/// Names are kept verbatim apart from surrounding spaces,
/// and each name appears at most once.
/// An empty list stands for the default repertoire (ISO_IR 6).
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct CharsetList {
    names: SmallVec<[String; 2]>,
}

impl CharsetList {
    /// Create an empty list.
    pub fn new() -> Self {
        CharsetList::default()
    }

    /// Create a list from the given names, in order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = CharsetList::new();
        for name in names {
            list.push(name.as_ref());
        }
        list
    }

    /// Append a name unless it is already in the list.
    pub fn push(&mut self, name: &str) {
        let name = name.trim();
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }

    /// Append every name of `other` missing from this list,
    /// preserving the order of both lists.
    pub fn merge(&mut self, other: &CharsetList) {
        for name in other.names() {
            self.push(name);
        }
    }

    /// Iterate over the names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// The number of names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve the character set used for conversions,
    /// which is the one named first.
    ///
    /// An empty list or an empty first name resolve to the default repertoire.
    pub fn primary(&self) -> Result<SpecificCharacterSet, UnsupportedCharacterSet> {
        match self.names.first().map(String::as_str) {
            None | Some("") => Ok(SpecificCharacterSet::Default),
            Some(name) => SpecificCharacterSet::from_code(name)
                .ok_or_else(|| UnsupportedCharacterSetSnafu { name }.build()),
        }
    }
}

impl<S: AsRef<str>> std::iter::FromIterator<S> for CharsetList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        CharsetList::from_names(iter)
    }
}
