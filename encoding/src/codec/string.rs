//! Codecs for textual value representations.
//!
//! Every textual value representation shares one [`StringCodec`].
//! What varies between them is captured by [`StringTraits`]:
//! the separator between values, the maximum length of each value,
//! a fixed unit size, the padding byte,
//! whether the declared character sets apply,
//! and a [`StringKind`] selecting specialized number and date handling.

use super::age::Age;
use super::lexical::{format_fixed, format_general, parse_float, parse_integer};
use super::temporal::{self, DateTimeParts};
use super::{
    CodecOptions, DecodeTextSnafu, EncodeTextSnafu, MalformedTemporalSnafu, Result,
    UnsupportedCharacterSetSnafu, ValueCodec,
};
use crate::text::{CharsetList, SpecificCharacterSet, TextCodec};
use dicombuf_core::{ByteMemory, VrCode, VR};
use smallvec::{smallvec, SmallVec};
use snafu::{ensure, ResultExt};
use std::convert::TryFrom;

/// The specialized behavior of a textual value representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringKind {
    /// Plain text; numbers are parsed from and formatted into the text.
    Plain,
    /// Age string (AS)
    Age,
    /// Decimal string (DS): integers go through floating point.
    Decimal,
    /// Integer string (IS): floating point goes through integers.
    Integer,
    /// Date (DA)
    Date,
    /// Time (TM)
    Time,
    /// Date time (DT)
    DateTime,
}

impl StringKind {
    fn is_temporal(self) -> bool {
        matches!(
            self,
            StringKind::Date | StringKind::Time | StringKind::DateTime
        )
    }
}

/// The textual properties of a value representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringTraits {
    /// Specialized behavior
    pub kind: StringKind,
    /// Separator between values, `None` for single valued representations
    pub separator: Option<char>,
    /// Maximum length of each value in characters, 0 if unbounded
    pub max_length: usize,
    /// Fixed length of each value, 0 if variable
    pub unit_size: usize,
    /// Byte used to pad the encoded value to an even length
    pub padding: u8,
    /// Whether text is converted with the declared character sets,
    /// as opposed to byte by byte
    pub charset_aware: bool,
}

impl StringTraits {
    /// Plain, multi-valued text separated by backslashes,
    /// padded with spaces and without length limits.
    pub fn new(kind: StringKind) -> Self {
        StringTraits {
            kind,
            separator: Some('\\'),
            max_length: 0,
            unit_size: 0,
            padding: b' ',
            charset_aware: false,
        }
    }

    /// Set the separator between values.
    pub fn separator(mut self, separator: Option<char>) -> Self {
        self.separator = separator;
        self
    }

    /// Set the maximum length of each value.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Set the fixed length of each value.
    pub fn unit_size(mut self, unit_size: usize) -> Self {
        self.unit_size = unit_size;
        self
    }

    /// Set the padding byte.
    pub fn padding(mut self, padding: u8) -> Self {
        self.padding = padding;
        self
    }

    /// Set whether the declared character sets apply.
    pub fn charset_aware(mut self, aware: bool) -> Self {
        self.charset_aware = aware;
        self
    }

    /// The properties of a standard textual value representation,
    /// or `None` if the value representation is not textual.
    pub fn of(vr: VR) -> Option<Self> {
        use StringKind::*;
        let traits = match vr {
            VR::AE => StringTraits::new(Plain).max_length(16),
            VR::AS => StringTraits::new(Age).max_length(4).unit_size(4),
            VR::CS => StringTraits::new(Plain).max_length(16),
            VR::DS => StringTraits::new(Decimal).max_length(16),
            VR::IS => StringTraits::new(Integer).max_length(12),
            VR::LO => StringTraits::new(Plain).max_length(64).charset_aware(true),
            VR::LT => StringTraits::new(Plain)
                .separator(None)
                .max_length(10240)
                .charset_aware(true),
            VR::PN => StringTraits::new(Plain)
                .separator(Some('='))
                .max_length(64)
                .charset_aware(true),
            VR::SH => StringTraits::new(Plain).max_length(16).charset_aware(true),
            VR::ST => StringTraits::new(Plain)
                .separator(None)
                .max_length(1024)
                .charset_aware(true),
            VR::UI => StringTraits::new(Plain).max_length(64).padding(0),
            VR::UT => StringTraits::new(Plain).separator(None).charset_aware(true),
            VR::UC => StringTraits::new(Plain).charset_aware(true),
            VR::UR => StringTraits::new(Plain).separator(None),
            VR::DA => StringTraits::new(Date)
                .separator(None)
                .max_length(10)
                .unit_size(8),
            VR::TM => StringTraits::new(Time)
                .separator(None)
                .max_length(16),
            VR::DT => StringTraits::new(DateTime)
                .separator(None)
                .max_length(26),
            _ => return None,
        };
        Some(traits)
    }
}

fn truncate_chars(text: &str, len: usize) -> &str {
    if len == 0 {
        return text;
    }
    match text.char_indices().nth(len) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// A codec for textual values.
#[derive(Debug, Clone)]
pub struct StringCodec {
    vr: VrCode,
    traits: StringTraits,
    options: CodecOptions,
    charsets: CharsetList,
    values: SmallVec<[String; 2]>,
}

impl StringCodec {
    /// Create an empty codec.
    pub fn new(vr: impl Into<VrCode>, traits: StringTraits, options: CodecOptions) -> Self {
        StringCodec {
            vr: vr.into(),
            traits,
            options,
            charsets: CharsetList::new(),
            values: SmallVec::new(),
        }
    }

    /// The textual properties followed by this codec.
    pub fn traits(&self) -> &StringTraits {
        &self.traits
    }

    /// The values as stored, without any display conversion.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    fn text_codec(&self) -> Result<SpecificCharacterSet> {
        if self.traits.charset_aware {
            self.charsets.primary().context(UnsupportedCharacterSetSnafu)
        } else {
            Ok(SpecificCharacterSet::Default)
        }
    }

    fn value(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Replace a value as is, truncated to the maximum length.
    fn store(&mut self, index: usize, text: &str) {
        let max_length = self.traits.max_length;
        if let Some(slot) = self.values.get_mut(index) {
            *slot = truncate_chars(text, max_length).to_string();
        }
    }

    fn split_values(&self, text: &str) -> SmallVec<[String; 2]> {
        match self.traits.separator {
            None => smallvec![text.to_string()],
            Some(_) if text.is_empty() => SmallVec::new(),
            Some(separator) => text
                .split(separator)
                .map(|value| truncate_chars(value, self.traits.unit_size).to_string())
                .collect(),
        }
    }

    fn normalize_temporal(&mut self) -> Result<()> {
        let kind = self.traits.kind;
        let first = match self.values.first() {
            Some(first) => first.trim(),
            None => return Ok(()),
        };
        let normalized = match kind {
            StringKind::Date => temporal::normalize_date(first),
            StringKind::Time => temporal::normalize_time(first),
            _ => temporal::normalize_date_time(first),
        };
        ensure!(
            !self.options.strict_temporal || temporal::is_well_formed(kind, &normalized),
            MalformedTemporalSnafu {
                vr: self.vr,
                value: normalized,
            }
        );
        self.store(0, &normalized);
        Ok(())
    }

    fn epoch(&self, index: usize) -> Option<(i64, u32)> {
        if !self.is_index_valid(index) {
            return None;
        }
        temporal::to_epoch(self.traits.kind, &self.get_date(index))
    }

    fn set_epoch(&mut self, index: usize, seconds: i64, micros: u32) {
        let parts = temporal::from_epoch(self.traits.kind, seconds, micros);
        self.set_date(index, parts);
    }
}

impl ValueCodec for StringCodec {
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
        let text = self.text_codec()?.decode(bytes).context(DecodeTextSnafu)?;
        let trimmed = text.trim_end_matches(|c: char| c == ' ' || c == '\0');
        self.values = self.split_values(trimmed);
        if self.traits.kind.is_temporal() {
            self.normalize_temporal()?;
        }
        Ok(())
    }

    fn encode(&self) -> Result<ByteMemory> {
        let separator = self
            .traits
            .separator
            .map(String::from)
            .unwrap_or_default();
        let joined = self.values.join(separator.as_str());
        let bytes = self.text_codec()?.encode(&joined).context(EncodeTextSnafu)?;
        Ok(ByteMemory::from(bytes))
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn resize(&mut self, len: usize) {
        let len = if self.traits.separator.is_some() {
            len
        } else {
            1
        };
        self.values.resize(len, String::new());
    }

    fn get_as_integer(&self, index: usize) -> i64 {
        match self.traits.kind {
            StringKind::Age | StringKind::Decimal => self.get_as_float(index) as i64,
            StringKind::Date | StringKind::Time | StringKind::DateTime => {
                self.epoch(index).map(|(seconds, _)| seconds).unwrap_or(0)
            }
            StringKind::Plain | StringKind::Integer => {
                self.value(index).map(parse_integer).unwrap_or(0)
            }
        }
    }

    fn get_as_unsigned_integer(&self, index: usize) -> u64 {
        u64::try_from(self.get_as_integer(index)).unwrap_or(0)
    }

    fn get_as_float(&self, index: usize) -> f64 {
        match self.traits.kind {
            StringKind::Age => {
                if self.is_index_valid(index) {
                    self.get_age(index).to_years()
                } else {
                    0.
                }
            }
            StringKind::Integer => self.get_as_integer(index) as f64,
            StringKind::Date | StringKind::Time | StringKind::DateTime => self
                .epoch(index)
                .map(|(seconds, micros)| seconds as f64 + f64::from(micros) / 1e6)
                .unwrap_or(0.),
            StringKind::Plain | StringKind::Decimal => {
                self.value(index).map(parse_float).unwrap_or(0.)
            }
        }
    }

    fn get_as_text(&self, index: usize) -> Vec<u8> {
        let text = self.get_as_unicode_text(index);
        match self.text_codec().and_then(|codec| {
            codec.encode(&text).context(EncodeTextSnafu)
        }) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Could not encode {} value {}: {}", self.vr, index, e);
                Vec::new()
            }
        }
    }

    fn get_as_unicode_text(&self, index: usize) -> String {
        let value = match self.value(index) {
            Some(value) => value,
            None => return String::new(),
        };
        match self.traits.kind {
            StringKind::Date => temporal::display_date(&temporal::parse_date(value)),
            StringKind::Time => temporal::display_time(&temporal::parse_time(value)),
            StringKind::DateTime => {
                temporal::display_date_time(&temporal::parse_date_time(value))
            }
            _ => value.to_string(),
        }
    }

    fn set_as_integer(&mut self, index: usize, value: i64) {
        match self.traits.kind {
            StringKind::Age | StringKind::Decimal => self.set_as_float(index, value as f64),
            StringKind::Date | StringKind::Time | StringKind::DateTime => {
                self.set_epoch(index, value, 0)
            }
            StringKind::Plain | StringKind::Integer => self.store(index, &value.to_string()),
        }
    }

    fn set_as_unsigned_integer(&mut self, index: usize, value: u64) {
        match self.traits.kind {
            StringKind::Plain | StringKind::Integer => self.store(index, &value.to_string()),
            _ => self.set_as_integer(index, i64::try_from(value).unwrap_or(i64::MAX)),
        }
    }

    fn set_as_float(&mut self, index: usize, value: f64) {
        match self.traits.kind {
            StringKind::Age => self.set_age(index, Age::from_years(value)),
            StringKind::Decimal => self.store(index, &format_general(value, 6)),
            StringKind::Integer => self.set_as_integer(index, value as i64),
            StringKind::Date | StringKind::Time | StringKind::DateTime => {
                let seconds = value.floor();
                let micros = ((value - seconds) * 1e6).round().min(999_999.) as u32;
                self.set_epoch(index, seconds as i64, micros)
            }
            StringKind::Plain => self.store(index, &format_fixed(value)),
        }
    }

    fn set_as_text(&mut self, index: usize, value: &[u8]) {
        match self.text_codec().and_then(|codec| codec.decode(value).context(DecodeTextSnafu)) {
            Ok(text) => self.set_as_unicode_text(index, &text),
            Err(e) => tracing::warn!("Could not decode {} value {}: {}", self.vr, index, e),
        }
    }

    fn set_as_unicode_text(&mut self, index: usize, value: &str) {
        match self.traits.kind {
            StringKind::Date => match temporal::date_from_input(value) {
                Some(parts) => self.set_date(index, parts),
                None => tracing::debug!("Ignoring malformed date `{}`", value),
            },
            StringKind::Time => self.set_date(index, temporal::time_from_input(value)),
            StringKind::DateTime => self.set_date(index, temporal::date_time_from_input(value)),
            _ => self.store(index, value),
        }
    }

    fn get_date(&self, index: usize) -> DateTimeParts {
        let value = match self.value(index) {
            Some(value) => value,
            None => return DateTimeParts::default(),
        };
        match self.traits.kind {
            StringKind::Date => temporal::parse_date(value),
            StringKind::Time => temporal::parse_time(value),
            StringKind::DateTime => temporal::parse_date_time(value),
            _ => DateTimeParts::default(),
        }
    }

    fn set_date(&mut self, index: usize, value: DateTimeParts) {
        let text = match self.traits.kind {
            StringKind::Date => temporal::build_date(&value),
            StringKind::Time => {
                // times carry no offset
                let mut time = temporal::build_time(&value);
                time.truncate(13);
                time
            }
            StringKind::DateTime => {
                let mut text = temporal::build_date(&value);
                text.push_str(&temporal::build_time(&value));
                text
            }
            _ => return,
        };
        self.store(index, &text);
    }

    fn get_age(&self, index: usize) -> Age {
        match (self.traits.kind, self.value(index)) {
            (StringKind::Age, Some(value)) => Age::parse(value),
            _ => Age::default(),
        }
    }

    fn set_age(&mut self, index: usize, value: Age) {
        if self.traits.kind == StringKind::Age {
            self.store(index, &value.to_string());
        }
    }

    fn padding_byte(&self) -> u8 {
        self.traits.padding
    }

    fn unit_size(&self) -> usize {
        self.traits.unit_size
    }

    fn max_value_length(&self) -> usize {
        self.traits.max_length
    }

    fn separator(&self) -> Option<char> {
        self.traits.separator
    }
}
