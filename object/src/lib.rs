#![crate_type = "lib"]
#![deny(trivial_numeric_casts, unsafe_code, unstable_features)]
#![warn(
    missing_debug_implementations,
    missing_docs,
    unused_qualifications,
    unused_import_braces
)]
//! Element buffers with transactional commit.
//!
//! An [`ElementBuffer`] keeps the canonical bytes of one DICOM data element,
//! possibly still sitting in a file until they are first needed.
//! Its values are read and written through codecs
//! (see [`dicombuf_encoding::codec`]),
//! which the buffer hands out wrapped in a [`CodecHandle`].
//! Writes never touch the canonical bytes directly:
//! they are encoded back into the buffer and committed
//! when the writing codec goes away,
//! or all together when the enclosing [`Transaction`] closes.
//!
//! # Examples
//!
//! Read and write the values of a buffer:
//!
//! ```
//! # use dicombuf_object::{ElementBuffer, Result};
//! # use dicombuf_core::VR;
//! # use std::sync::Arc;
//! let buffer = Arc::new(ElementBuffer::with_bytes(VR::DS, &b"1.5\\2.5 "[..]));
//!
//! let reader = buffer.reader()?;
//! assert_eq!(reader.codec().get_as_float(1), 2.5);
//!
//! let writer = buffer.writer()?;
//! writer.codec().set_as_float(1, 3.25);
//! writer.commit()?;
//!
//! assert_eq!(buffer.to_bytes()?.as_slice(), b"1.5\\3.25");
//! # Result::<()>::Ok(())
//! ```
//!
//! Group the writes to several buffers so that
//! either all of them or none of them take effect:
//!
//! ```
//! # use dicombuf_object::{ElementBuffer, Result, Transaction};
//! # use dicombuf_core::VR;
//! # use std::sync::Arc;
//! let rows = Arc::new(ElementBuffer::with_bytes(VR::US, vec![0u8; 2]));
//! let columns = Arc::new(ElementBuffer::with_bytes(VR::US, vec![0u8; 2]));
//!
//! let transaction = Transaction::new();
//! rows.writer()?.codec().set_as_unsigned_integer(0, 512);
//! columns.writer()?.codec().set_as_unsigned_integer(0, 256);
//! // nothing is committed yet
//! assert_eq!(rows.version(), 0);
//! transaction.finish()?;
//!
//! assert_eq!(rows.reader()?.codec().get_as_unsigned_integer(0), 512);
//! assert_eq!(columns.reader()?.codec().get_as_unsigned_integer(0), 256);
//! # Result::<()>::Ok(())
//! ```

pub mod buffer;
pub mod handle;
mod lock;
pub mod options;
pub mod source;
pub mod transaction;

pub use buffer::{BufferId, ElementBuffer};
pub use handle::CodecHandle;
pub use options::BufferOptions;
pub use source::{DeferredSource, RandomAccessSource, ReadSeek, StreamSource};
pub use transaction::{
    with_committing_transaction, with_transaction, Transaction, TransactionStack,
};

use dicombuf_encoding::codec;
use snafu::{Backtrace, Snafu};

/// An error which may occur when working with element buffers.
#[derive(Debug, Snafu)]
#[non_exhaustive]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// Could not create a codec for the buffer
    #[snafu(display("Could not create a codec"))]
    CreateCodec {
        /// The codec failure.
        source: codec::Error,
    },
    /// Could not read the deferred value from its stream
    #[snafu(display("Could not load {} bytes at offset {}", length, offset))]
    LoadDeferred {
        /// The position of the value in its stream.
        offset: u64,
        /// The length of the value.
        length: usize,
        /// The I/O failure.
        source: std::io::Error,
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
    /// Could not decode the bytes of the buffer
    #[snafu(display("Could not decode the buffer content"))]
    DecodeValue {
        /// The codec failure.
        source: codec::Error,
    },
    /// Could not encode the values of a codec
    #[snafu(display("Could not encode the codec values"))]
    EncodeValue {
        /// The codec failure.
        source: codec::Error,
    },
    /// Commit requested with nothing copied back
    #[snafu(display("Nothing to commit in buffer {}", buffer))]
    NothingToCommit {
        /// The buffer asked to commit.
        buffer: BufferId,
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
    /// A codec was still borrowed when its transaction committed
    #[snafu(display("The codec of buffer {} is borrowed", buffer))]
    CodecBusy {
        /// The buffer of the borrowed codec.
        buffer: BufferId,
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
    /// The transaction is not open on the calling thread
    #[snafu(display("No such transaction open on this thread"))]
    NoOpenTransaction {
        /// The generated backtrace, if available.
        backtrace: Backtrace,
    },
}

/// Type alias for a result from this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
