//! Handles to the codecs handed out by element buffers.

use crate::buffer::ElementBuffer;
use crate::Result;
use dicombuf_encoding::codec::ValueCodec;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A codec together with the buffer it writes back to.
#[derive(Debug)]
pub(crate) struct Binding {
    codec: Mutex<Box<dyn ValueCodec>>,
    /// `None` for readers, and for writers once committed or aborted
    target: Mutex<Option<Arc<ElementBuffer>>>,
    committed: AtomicBool,
    tracked: AtomicBool,
}

impl Binding {
    /// Whether the codec is still due to be written back.
    pub(crate) fn is_bound(&self) -> bool {
        self.target.lock().is_some()
    }

    /// Give up on writing the codec back.
    pub(crate) fn abort(&self) -> bool {
        self.target.lock().take().is_some()
    }

    pub(crate) fn try_codec(&self) -> Option<MutexGuard<'_, Box<dyn ValueCodec>>> {
        self.codec.try_lock()
    }

    /// Record a commit made on behalf of this binding by its transaction.
    pub(crate) fn mark_committed(&self) {
        self.committed.store(true, Ordering::Release);
        self.target.lock().take();
    }

    pub(crate) fn set_tracked(&self) {
        self.tracked.store(true, Ordering::Release);
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        if *self.committed.get_mut() {
            return;
        }
        if let Some(buffer) = self.target.get_mut().take() {
            if std::thread::panicking() {
                tracing::warn!(
                    "Discarding the codec of buffer {} while panicking",
                    buffer.id()
                );
                return;
            }
            let codec = self.codec.get_mut();
            if let Err(e) = buffer.write_back(&**codec) {
                tracing::warn!(
                    "Could not write back the codec of buffer {}: {}",
                    buffer.id(),
                    e
                );
            }
        }
    }
}

fn codec_of(codec: &mut Box<dyn ValueCodec>) -> &mut (dyn ValueCodec + 'static) {
    &mut **codec
}

/// A shared handle to a codec obtained from an [`ElementBuffer`].
///
/// A reading codec is a detached copy of the values
/// and is simply discarded with its last handle.
///
/// A writing codec is bound to its buffer.
/// If it was acquired within a transaction,
/// the transaction writes it back when it commits.
/// Otherwise it is written back and committed
/// when the last handle is dropped,
/// or earlier through [`commit`](CodecHandle::commit).
/// Failures of a commit on drop are logged, not reported.
/// A handle dropped while its thread is panicking
/// discards the codec instead.
#[derive(Debug, Clone)]
pub struct CodecHandle {
    binding: Arc<Binding>,
}

impl CodecHandle {
    fn with_target(codec: Box<dyn ValueCodec>, target: Option<Arc<ElementBuffer>>) -> Self {
        CodecHandle {
            binding: Arc::new(Binding {
                codec: Mutex::new(codec),
                target: Mutex::new(target),
                committed: AtomicBool::new(false),
                tracked: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn reader(codec: Box<dyn ValueCodec>) -> Self {
        CodecHandle::with_target(codec, None)
    }

    pub(crate) fn writer(codec: Box<dyn ValueCodec>, buffer: Arc<ElementBuffer>) -> Self {
        CodecHandle::with_target(codec, Some(buffer))
    }

    pub(crate) fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    /// Borrow the codec.
    ///
    /// The codec stays locked while the guard lives;
    /// a transaction committing it meanwhile fails
    /// with [`CodecBusy`](crate::Error::CodecBusy).
    pub fn codec(&self) -> MappedMutexGuard<'_, dyn ValueCodec> {
        MutexGuard::map(self.binding.codec.lock(), codec_of)
    }

    /// Whether the codec will still be written back to its buffer.
    pub fn is_writing(&self) -> bool {
        self.binding.is_bound()
    }

    /// Whether a transaction is in charge of writing the codec back.
    pub fn is_tracked(&self) -> bool {
        self.binding.tracked.load(Ordering::Acquire)
    }

    /// Write the codec back to its buffer and commit it now,
    /// returning the new buffer version.
    ///
    /// Does nothing and returns `None` for readers,
    /// for aborted or committed writers,
    /// and for writers tracked by a transaction,
    /// which commit with it.
    pub fn commit(self) -> Result<Option<u64>> {
        if self.is_tracked() {
            return Ok(None);
        }
        let buffer = match self.binding.target.lock().take() {
            Some(buffer) => buffer,
            None => return Ok(None),
        };
        let codec = self.binding.codec.lock();
        let version = buffer.write_back(&**codec)?;
        self.binding.committed.store(true, Ordering::Release);
        Ok(Some(version))
    }

    /// Discard the changes made through the codec.
    /// The buffer is left untouched.
    pub fn abort(&self) {
        self.binding.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicombuf_core::VR;
    use pretty_assertions::assert_eq;

    fn buffer(text: &[u8]) -> Arc<ElementBuffer> {
        Arc::new(ElementBuffer::with_bytes(VR::LO, text))
    }

    #[test]
    fn last_handle_commits() {
        let buffer = buffer(b"first");
        let writer = buffer.writer().unwrap();
        assert!(writer.is_writing());
        assert!(!writer.is_tracked());
        let clone = writer.clone();
        writer.codec().set_as_unicode_text(0, "second");
        drop(writer);
        assert_eq!(buffer.version(), 0);
        drop(clone);
        assert_eq!(buffer.version(), 1);
        assert_eq!(buffer.to_bytes().unwrap().as_slice(), b"second");
    }

    #[test]
    fn changes_stay_private_until_commit() {
        let buffer = buffer(b"first ");
        let writer = buffer.writer().unwrap();
        writer.codec().set_as_unicode_text(0, "second");
        let reader = buffer.reader().unwrap();
        assert_eq!(reader.codec().get_as_unicode_text(0), "first");

        assert_eq!(writer.commit().unwrap(), Some(1));
        assert_eq!(reader.codec().get_as_unicode_text(0), "first");
        let reader = buffer.reader().unwrap();
        assert_eq!(reader.codec().get_as_unicode_text(0), "second");
    }

    #[test]
    fn aborted_writers_leave_the_buffer_alone() {
        let buffer = buffer(b"first ");
        let writer = buffer.writer().unwrap();
        writer.codec().set_as_unicode_text(0, "second");
        writer.abort();
        assert!(!writer.is_writing());
        assert_eq!(writer.commit().unwrap(), None);
        assert_eq!(buffer.version(), 0);
        assert_eq!(buffer.to_bytes().unwrap().as_slice(), b"first ");
    }

    #[test]
    fn readers_never_write() {
        let buffer = buffer(b"first ");
        let reader = buffer.reader().unwrap();
        reader.codec().set_as_unicode_text(0, "second");
        drop(reader);
        assert_eq!(buffer.version(), 0);
    }
}
