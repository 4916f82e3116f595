//! Element buffers: the canonical bytes of one data element.
//!
//! An [`ElementBuffer`] never hands out its bytes for writing.
//! Values are read and written through codecs obtained with
//! [`acquire_codec`](ElementBuffer::acquire_codec),
//! which work on private copies.
//! A writing codec reaches the buffer in two steps:
//! a copy back, which encodes its values into the staging area,
//! and a commit, which makes the staged content canonical
//! and bumps the buffer version.
//! Within a [`Transaction`](crate::Transaction) both steps happen
//! when the committing transaction closes;
//! outside of any transaction they happen
//! when the last handle to the codec is dropped.

use crate::handle::CodecHandle;
use crate::options::BufferOptions;
use crate::source::DeferredSource;
use crate::transaction::{TransactionCell, TransactionStack};
use crate::{
    CreateCodecSnafu, DecodeValueSnafu, EncodeValueSnafu, LoadDeferredSnafu, NothingToCommitSnafu,
    Result,
};
use dicombuf_core::{ByteMemory, VrCode};
use dicombuf_encoding::codec::{RawCodec, ValueCodec};
use dicombuf_encoding::CharsetList;
use parking_lot::Mutex;
use snafu::ResultExt;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// A process-wide unique identifier of an element buffer.
///
/// Buffers taking part in one commit are locked in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        BufferId(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Content written back by a codec, waiting for the commit.
#[derive(Debug)]
struct StagedContent {
    bytes: ByteMemory,
    vr: VrCode,
    charsets: CharsetList,
}

#[derive(Debug)]
enum Staging {
    Clean,
    ReadyToCommit(StagedContent),
}

/// The lock-protected state of an element buffer.
#[derive(Debug)]
pub(crate) struct BufferState {
    vr: VrCode,
    charsets: CharsetList,
    memory: ByteMemory,
    deferred: Option<DeferredSource>,
    staging: Staging,
    version: u64,
}

impl BufferState {
    fn new(vr: VrCode, memory: ByteMemory, deferred: Option<DeferredSource>) -> Self {
        BufferState {
            vr,
            charsets: CharsetList::new(),
            memory,
            deferred,
            staging: Staging::Clean,
            version: 0,
        }
    }

    /// Load the deferred region if there is one, then give the bytes.
    fn materialize(&mut self, id: BufferId) -> Result<&ByteMemory> {
        if let Some(source) = &self.deferred {
            let memory = source.load().context(LoadDeferredSnafu {
                offset: source.offset(),
                length: source.len(),
            })?;
            tracing::debug!(
                "Loaded {} bytes at offset {} for buffer {} (word width {})",
                source.len(),
                source.offset(),
                id,
                source.word_width()
            );
            self.memory = memory;
            self.deferred = None;
        }
        Ok(&self.memory)
    }

    fn current_size(&self) -> usize {
        match &self.deferred {
            Some(source) => source.len(),
            None => self.memory.size(),
        }
    }

    /// Encode the values of a codec into the staging area,
    /// padded to an even length.
    ///
    /// The staged character sets start with those of the codec,
    /// the first of which the bytes were encoded with.
    pub(crate) fn copy_back(&mut self, codec: &dyn ValueCodec) -> Result<()> {
        let mut bytes = codec.encode().context(EncodeValueSnafu)?;
        bytes.pad_to_even(codec.padding_byte());
        let mut charsets = codec.charsets().clone();
        charsets.merge(&self.charsets);
        self.staging = Staging::ReadyToCommit(StagedContent {
            bytes,
            vr: codec.vr_code(),
            charsets,
        });
        Ok(())
    }

    /// Make the staged content canonical.
    pub(crate) fn commit(&mut self, id: BufferId) -> Result<u64> {
        let staged = match std::mem::replace(&mut self.staging, Staging::Clean) {
            Staging::ReadyToCommit(staged) => staged,
            Staging::Clean => return NothingToCommitSnafu { buffer: id }.fail(),
        };
        self.memory = staged.bytes;
        self.vr = staged.vr;
        self.charsets = staged.charsets;
        // the stream now holds an old version
        self.deferred = None;
        self.version += 1;
        tracing::debug!("Committed buffer {} at version {}", id, self.version);
        Ok(self.version)
    }

    /// Drop whatever was written back and not committed.
    pub(crate) fn discard_staging(&mut self) {
        self.staging = Staging::Clean;
    }
}

/// The byte storage of one data element,
/// shared between the codecs reading and writing it.
///
/// # Example
///
/// ```
/// # use dicombuf_object::{ElementBuffer, Result};
/// # use dicombuf_core::VR;
/// # use std::sync::Arc;
/// let buffer = Arc::new(ElementBuffer::with_bytes(VR::CS, &b"ORIGINAL\\PRIMARY"[..]));
/// {
///     let writer = buffer.acquire_codec(true, false, 0)?;
///     writer.codec().set_as_unicode_text(1, "SECONDARY");
///     // committed when the last handle goes away
/// }
/// assert_eq!(buffer.to_bytes()?.as_slice(), b"ORIGINAL\\SECONDARY");
/// assert_eq!(buffer.version(), 1);
/// # Result::<()>::Ok(())
/// ```
#[derive(Debug)]
pub struct ElementBuffer {
    id: BufferId,
    options: BufferOptions,
    state: Mutex<BufferState>,
}

impl ElementBuffer {
    fn from_state(state: BufferState) -> Self {
        ElementBuffer {
            id: BufferId::next(),
            options: BufferOptions::default(),
            state: Mutex::new(state),
        }
    }

    /// Create an empty buffer.
    pub fn new(vr: impl Into<VrCode>) -> Self {
        ElementBuffer::from_state(BufferState::new(vr.into(), ByteMemory::new(), None))
    }

    /// Create an empty buffer out of a textual VR code,
    /// which falls back to `OB` if it is not made of two upper case letters.
    pub fn with_code(code: &str) -> Self {
        ElementBuffer::new(VrCode::new_or_default(code))
    }

    /// Create a buffer holding the given canonical bytes.
    pub fn with_bytes(vr: impl Into<VrCode>, bytes: impl Into<ByteMemory>) -> Self {
        ElementBuffer::from_state(BufferState::new(vr.into(), bytes.into(), None))
    }

    /// Create a buffer whose bytes are read from a stream
    /// the first time a codec is requested.
    pub fn deferred(vr: impl Into<VrCode>, source: DeferredSource) -> Self {
        ElementBuffer::from_state(BufferState::new(vr.into(), ByteMemory::new(), Some(source)))
    }

    /// Replace the options of the buffer.
    pub fn with_options(mut self, options: BufferOptions) -> Self {
        self.options = options;
        self
    }

    /// Declare the character sets of the buffer's textual content.
    ///
    /// Once the buffer is built, they change only by committing
    /// a codec declaring other character sets.
    pub fn with_charsets(mut self, charsets: CharsetList) -> Self {
        self.state.get_mut().charsets = charsets;
        self
    }

    /// The unique identifier of this buffer.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// The options of this buffer.
    pub fn options(&self) -> &BufferOptions {
        &self.options
    }

    /// The canonical value representation code.
    pub fn vr_code(&self) -> VrCode {
        self.state.lock().vr
    }

    /// The number of commits made so far.
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// The canonical character sets.
    pub fn charsets(&self) -> CharsetList {
        self.state.lock().charsets.clone()
    }

    /// Whether the bytes still live in the backing stream only.
    pub fn is_deferred(&self) -> bool {
        self.state.lock().deferred.is_some()
    }

    /// The size of the canonical bytes.
    /// A deferred buffer reports the length of its region without reading it.
    pub fn current_size_bytes(&self) -> usize {
        self.state.lock().current_size()
    }

    /// A copy of the canonical bytes, loading them if needed.
    pub fn to_bytes(&self) -> Result<ByteMemory> {
        let mut state = self.state.lock();
        state.materialize(self.id).map(ByteMemory::clone)
    }

    /// Obtain a codec for reading or writing the values of this buffer.
    ///
    /// With `raw`, the codec exposes the bytes as they are
    /// instead of interpreting them according to the value representation.
    /// A writing codec works on a copy of the bytes
    /// extended to at least `size_hint` values of its unit size,
    /// and is registered with the innermost transaction
    /// of the calling thread if there is one.
    pub fn acquire_codec(
        self: &Arc<Self>,
        for_writing: bool,
        raw: bool,
        size_hint: usize,
    ) -> Result<CodecHandle> {
        self.acquire(for_writing, raw, size_hint, None)
    }

    /// Obtain a codec for reading the interpreted values.
    pub fn reader(self: &Arc<Self>) -> Result<CodecHandle> {
        self.acquire_codec(false, false, 0)
    }

    /// Obtain a codec for writing the interpreted values.
    pub fn writer(self: &Arc<Self>) -> Result<CodecHandle> {
        self.acquire_codec(true, false, 0)
    }

    pub(crate) fn acquire(
        self: &Arc<Self>,
        for_writing: bool,
        raw: bool,
        size_hint: usize,
        transaction: Option<&Arc<TransactionCell>>,
    ) -> Result<CodecHandle> {
        let mut state = self.state.lock();
        let vr = state.vr;
        let charsets = state.charsets.clone();
        let current = state.materialize(self.id)?;

        let mut codec: Box<dyn ValueCodec> = if raw {
            Box::new(RawCodec::raw(vr))
        } else {
            self.options
                .codec_registry()
                .create(vr, &self.options.codec)
                .context(CreateCodecSnafu)?
        };
        codec.set_charsets(charsets);

        if !for_writing {
            codec.decode(current).context(DecodeValueSnafu)?;
            return Ok(CodecHandle::reader(codec));
        }

        let len = current
            .size()
            .max(size_hint.saturating_mul(codec.unit_size()));
        let mut staging = ByteMemory::with_len(len);
        staging[..current.size()].copy_from_slice(current);
        codec.decode(&staging).context(DecodeValueSnafu)?;

        let handle = CodecHandle::writer(codec, Arc::clone(self));
        let transaction = match transaction {
            Some(cell) => Some(Arc::clone(cell)),
            None => TransactionStack::global().innermost(),
        };
        if let Some(cell) = transaction {
            cell.register(self, handle.binding());
        }
        drop(state);
        Ok(handle)
    }

    /// Encode the values of a codec into the staging area of this buffer.
    /// The canonical content is left untouched until [`commit`](Self::commit).
    pub fn copy_back(&self, codec: &dyn ValueCodec) -> Result<()> {
        self.state.lock().copy_back(codec)
    }

    /// Make the content staged by [`copy_back`](Self::copy_back) canonical.
    /// Returns the new version.
    pub fn commit(&self) -> Result<u64> {
        self.state.lock().commit(self.id)
    }

    /// Copy back and commit in one step.
    pub fn write_back(&self, codec: &dyn ValueCodec) -> Result<u64> {
        let mut state = self.state.lock();
        state.copy_back(codec)?;
        state.commit(self.id)
    }

    pub(crate) fn state(&self) -> &Mutex<BufferState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use dicombuf_core::VR;
    use dicombuf_encoding::codec::{registry, CodecOptions};
    use pretty_assertions::assert_eq;

    #[test]
    fn ids_are_unique_and_ordered() {
        let a = ElementBuffer::new(VR::OB);
        let b = ElementBuffer::new(VR::OB);
        assert_ne!(a.id(), b.id());
        assert!(a.id() < b.id());
    }

    #[test]
    fn malformed_codes_fall_back_to_ob() {
        assert_eq!(ElementBuffer::with_code("ob").vr_code(), VR::OB);
        assert_eq!(ElementBuffer::with_code("SB").vr_code(), VrCode::SIGNED_BYTE);
    }

    #[test]
    fn commit_requires_copy_back() {
        let buffer = ElementBuffer::with_bytes(VR::US, vec![1u8, 0]);
        assert!(matches!(
            buffer.commit(),
            Err(Error::NothingToCommit { .. })
        ));

        let mut codec = registry()
            .create(VrCode::from(VR::LO), &CodecOptions::new())
            .unwrap();
        codec.resize(1);
        codec.set_as_unicode_text(0, "odd");
        buffer.copy_back(&*codec).unwrap();
        assert_eq!(buffer.version(), 0);
        assert_eq!(buffer.vr_code(), VR::US);

        assert_eq!(buffer.commit().unwrap(), 1);
        assert_eq!(buffer.vr_code(), VR::LO);
        assert_eq!(buffer.to_bytes().unwrap().as_slice(), b"odd ");
        assert!(matches!(
            buffer.commit(),
            Err(Error::NothingToCommit { .. })
        ));
    }

    #[test]
    fn readers_see_canonical_values() {
        let buffer = Arc::new(ElementBuffer::with_bytes(VR::DS, &b"1.5\\-2 "[..]));
        let reader = buffer.reader().unwrap();
        assert!(!reader.is_writing());
        let codec = reader.codec();
        assert_eq!(codec.len(), 2);
        assert_eq!(codec.get_as_float(0), 1.5);
        assert_eq!(codec.get_as_integer(1), -2);
    }

    #[test]
    fn size_hint_extends_binary_staging() {
        let buffer = Arc::new(ElementBuffer::with_bytes(VR::US, vec![7u8, 0]));
        let writer = buffer.acquire_codec(true, false, 3).unwrap();
        assert_eq!(writer.codec().len(), 3);
        assert_eq!(writer.codec().get_as_integer(0), i64::from(u16::from_ne_bytes([7, 0])));
        assert_eq!(buffer.current_size_bytes(), 2);
        drop(writer);
        assert_eq!(buffer.current_size_bytes(), 6);
    }

    #[test]
    fn raw_codecs_ignore_the_vr() {
        let buffer = Arc::new(ElementBuffer::with_bytes(VR::PN, &b"Doe^John"[..]));
        let raw = buffer.acquire_codec(false, true, 0).unwrap();
        assert_eq!(raw.codec().len(), 8);
        assert_eq!(raw.codec().vr_code(), VR::PN);

        let unknown = Arc::new(ElementBuffer::with_code("XX"));
        assert!(matches!(
            unknown.reader(),
            Err(Error::CreateCodec { .. })
        ));
        assert!(unknown.acquire_codec(false, true, 0).is_ok());
    }

    #[test]
    fn copy_back_merges_charsets() {
        let buffer = ElementBuffer::new(VR::LO)
            .with_charsets(CharsetList::from_names(vec!["ISO_IR 100"]));
        let mut codec = registry()
            .create(VrCode::from(VR::LO), &CodecOptions::new())
            .unwrap();
        codec.set_charsets(CharsetList::from_names(vec!["ISO_IR 100", "ISO_IR 192"]));
        buffer.write_back(&*codec).unwrap();
        assert_eq!(
            buffer.charsets(),
            CharsetList::from_names(vec!["ISO_IR 100", "ISO_IR 192"])
        );
    }

    #[test]
    fn committed_text_keeps_the_charset_it_was_encoded_with() {
        let buffer = Arc::new(
            ElementBuffer::with_bytes(VR::LO, &b"M\xFCller "[..])
                .with_charsets(CharsetList::from_names(vec!["ISO_IR 100"])),
        );
        {
            let writer = buffer.writer().unwrap();
            let mut codec = writer.codec();
            codec.set_charsets(CharsetList::from_names(vec!["ISO_IR 192"]));
            codec.set_as_unicode_text(0, "Günther");
        }
        assert_eq!(buffer.version(), 1);
        assert_eq!(
            buffer.charsets(),
            CharsetList::from_names(vec!["ISO_IR 192", "ISO_IR 100"])
        );
        // eight bytes in UTF-8, no padding needed
        assert_eq!(buffer.to_bytes().unwrap().as_slice(), "Günther".as_bytes());
        assert_eq!(
            buffer.reader().unwrap().codec().get_as_unicode_text(0),
            "Günther"
        );
    }

    #[test]
    fn undecodable_bytes_survive_an_untouched_writer() {
        let buffer = Arc::new(
            ElementBuffer::with_bytes(VR::LO, &b"a\xFFb "[..])
                .with_charsets(CharsetList::from_names(vec!["ISO_IR 192"])),
        );
        assert_eq!(buffer.reader().unwrap().codec().len(), 1);

        drop(buffer.writer().unwrap());
        assert_eq!(buffer.version(), 1);
        assert_eq!(buffer.to_bytes().unwrap().as_slice(), b"a\xFFb ");
        assert_eq!(buffer.reader().unwrap().codec().len(), 1);
    }

    #[test]
    fn charsets_only_change_through_commit() {
        let buffer = Arc::new(
            ElementBuffer::with_bytes(VR::LO, &b"G\xFCnther "[..])
                .with_charsets(CharsetList::from_names(vec!["ISO_IR 100"])),
        );
        let reader = buffer.reader().unwrap();
        {
            let writer = buffer.writer().unwrap();
            writer
                .codec()
                .set_charsets(CharsetList::from_names(vec!["ISO_IR 192"]));
            // not committed yet
            assert_eq!(
                buffer.charsets(),
                CharsetList::from_names(vec!["ISO_IR 100"])
            );
            assert_eq!(
                buffer.reader().unwrap().codec().get_as_unicode_text(0),
                "Günther"
            );
        }
        assert_eq!(buffer.version(), 1);
        assert_eq!(reader.codec().get_as_unicode_text(0), "Günther");
        assert_eq!(
            buffer.reader().unwrap().codec().get_as_unicode_text(0),
            "Günther"
        );
    }
}
