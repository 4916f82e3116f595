//! Backing streams for element buffers whose bytes are loaded on demand.
//!
//! A [`DeferredSource`] describes where the value of an element lives
//! in some random access stream.
//! The buffer reads it the first time a codec is requested,
//! and never again afterwards.

use byteordered::Endianness;
use dicombuf_core::ByteMemory;
use parking_lot::Mutex;
use std::convert::TryFrom;
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;

/// A trait that combines `Read` and `Seek`.
pub trait ReadSeek: Read + Seek {}
impl<T: ?Sized> ReadSeek for T where T: Read + Seek {}

/// A byte source which can be read at arbitrary positions
/// from any thread.
pub trait RandomAccessSource: fmt::Debug + Send + Sync {
    /// Fill `buf` with the bytes starting at `offset`.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

impl RandomAccessSource for Vec<u8> {
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .ok()
            .filter(|start| *start <= self.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        let end = start
            .checked_add(buf.len())
            .filter(|end| *end <= self.len())
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))?;
        buf.copy_from_slice(&self[start..end]);
        Ok(())
    }
}

/// A seekable stream, such as a file,
/// shared between the buffers reading from it.
pub struct StreamSource<R> {
    inner: Mutex<R>,
}

impl<R> fmt::Debug for StreamSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("StreamSource").finish_non_exhaustive()
    }
}

impl<R> StreamSource<R>
where
    R: ReadSeek,
{
    /// Wrap a stream.
    pub fn new(inner: R) -> Self {
        StreamSource {
            inner: Mutex::new(inner),
        }
    }

    /// Recover the stream.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R> RandomAccessSource for StreamSource<R>
where
    R: ReadSeek + Send,
{
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut stream = self.inner.lock();
        stream.seek(SeekFrom::Start(offset))?;
        stream.read_exact(buf)
    }
}

/// The location of an element value in a backing stream.
#[derive(Debug, Clone)]
pub struct DeferredSource {
    stream: Arc<dyn RandomAccessSource>,
    offset: u64,
    length: usize,
    word_width: usize,
    endianness: Endianness,
}

impl DeferredSource {
    /// Describe `length` bytes at `offset` in `stream`,
    /// holding single bytes or values already in native byte order.
    pub fn new(stream: Arc<dyn RandomAccessSource>, offset: u64, length: usize) -> Self {
        DeferredSource {
            stream,
            offset,
            length,
            word_width: 0,
            endianness: Endianness::native(),
        }
    }

    /// Declare the width of each word in the region and the byte order
    /// they were written in.
    /// Words are swapped on load when the byte order is not the native one.
    pub fn with_word_layout(mut self, word_width: usize, endianness: Endianness) -> Self {
        self.word_width = word_width;
        self.endianness = endianness;
        self
    }

    /// The position of the region in the stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The length of the region in bytes.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The width of each word in bytes, 0 or 1 if no swap is ever needed.
    pub fn word_width(&self) -> usize {
        self.word_width
    }

    /// The byte order of the words in the stream.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Read the region into memory, in native byte order.
    pub fn load(&self) -> io::Result<ByteMemory> {
        let mut memory = ByteMemory::with_len(self.length);
        self.stream.read_exact_at(self.offset, memory.as_mut_slice())?;
        memory.adjust_endian(self.word_width, self.endianness);
        Ok(memory)
    }
}
