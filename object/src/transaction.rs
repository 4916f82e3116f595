//! Transactions grouping the commits of several writing codecs.
//!
//! A [`Transaction`] is opened on the current thread
//! and stays open until it is dropped or [finished](Transaction::finish).
//! While it is the innermost open transaction of the thread,
//! every writing codec acquired on that thread is registered with it
//! instead of committing on its own.
//!
//! A committing transaction writes all of its codecs back
//! when it closes, as a single all-or-nothing step:
//! the buffers involved are locked together,
//! every codec is copied back,
//! and only if all copies succeed are the buffers committed.
//! A non-committing transaction hands its codecs
//! over to the enclosing transaction instead.
//!
//! ```
//! # use dicombuf_object::{with_committing_transaction, ElementBuffer, Result};
//! # use dicombuf_core::VR;
//! # use std::sync::Arc;
//! let name = Arc::new(ElementBuffer::new(VR::PN));
//! let id = Arc::new(ElementBuffer::new(VR::LO));
//! with_committing_transaction(|_| -> Result<()> {
//!     let writer = name.writer()?;
//!     let mut codec = writer.codec();
//!     codec.resize(1);
//!     codec.set_as_unicode_text(0, "Doe^John");
//!     drop(codec);
//!     let writer = id.writer()?;
//!     let mut codec = writer.codec();
//!     codec.resize(1);
//!     codec.set_as_unicode_text(0, "12345");
//!     Ok(())
//! })?;
//! assert_eq!(name.version(), 1);
//! assert_eq!(id.version(), 1);
//! # Result::<()>::Ok(())
//! ```

use crate::buffer::{BufferId, ElementBuffer};
use crate::handle::{Binding, CodecHandle};
use crate::lock::lock_multiple;
use crate::{CodecBusySnafu, Error, NoOpenTransactionSnafu, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};

static STACK: Lazy<TransactionStack> = Lazy::new(TransactionStack::default);

/// The open transactions of every thread, innermost last.
#[derive(Debug, Default)]
pub struct TransactionStack {
    stacks: Mutex<HashMap<ThreadId, Vec<Arc<TransactionCell>>>>,
}

impl TransactionStack {
    /// The process-wide stack.
    pub fn global() -> &'static TransactionStack {
        &STACK
    }

    /// The number of transactions open on the calling thread.
    pub fn depth(&self) -> usize {
        self.stacks
            .lock()
            .get(&thread::current().id())
            .map_or(0, Vec::len)
    }

    /// Open a transaction on the calling thread.
    /// Returns whether it is the outermost one.
    pub(crate) fn push(&self, cell: Arc<TransactionCell>) -> bool {
        let mut stacks = self.stacks.lock();
        let stack = stacks.entry(thread::current().id()).or_default();
        stack.push(cell);
        stack.len() == 1
    }

    /// Close a transaction of the calling thread,
    /// returning the transaction which encloses it.
    pub(crate) fn pop(&self, cell: &Arc<TransactionCell>) -> Result<Option<Arc<TransactionCell>>> {
        let id = thread::current().id();
        let mut stacks = self.stacks.lock();
        let stack = match stacks.get_mut(&id) {
            Some(stack) => stack,
            None => return NoOpenTransactionSnafu.fail(),
        };
        let position = match stack.iter().rposition(|open| Arc::ptr_eq(open, cell)) {
            Some(position) => position,
            None => return NoOpenTransactionSnafu.fail(),
        };
        if position + 1 != stack.len() {
            tracing::warn!(
                "Closing transaction at depth {} while {} inner transaction(s) are still open",
                position + 1,
                stack.len() - position - 1
            );
        }
        stack.remove(position);
        let parent = position.checked_sub(1).map(|i| Arc::clone(&stack[i]));
        if stack.is_empty() {
            stacks.remove(&id);
        }
        Ok(parent)
    }

    /// The innermost transaction open on the calling thread.
    pub(crate) fn innermost(&self) -> Option<Arc<TransactionCell>> {
        self.stacks
            .lock()
            .get(&thread::current().id())
            .and_then(|stack| stack.last().cloned())
    }
}

#[derive(Debug)]
struct Entry {
    buffer: Arc<ElementBuffer>,
    binding: Arc<Binding>,
}

/// The codecs registered with one transaction, one per buffer.
#[derive(Debug, Default)]
pub(crate) struct TransactionCell {
    entries: Mutex<BTreeMap<BufferId, Entry>>,
}

impl TransactionCell {
    /// Track a writing codec.
    /// A codec previously registered for the same buffer is aborted.
    pub(crate) fn register(&self, buffer: &Arc<ElementBuffer>, binding: &Arc<Binding>) {
        binding.set_tracked();
        let previous = self.entries.lock().insert(
            buffer.id(),
            Entry {
                buffer: Arc::clone(buffer),
                binding: Arc::clone(binding),
            },
        );
        if let Some(previous) = previous {
            if !Arc::ptr_eq(&previous.binding, binding) {
                previous.binding.abort();
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Write back and commit every tracked codec, or none of them.
    pub(crate) fn commit_all(&self) -> Result<()> {
        let entries: Vec<Entry> = std::mem::take(&mut *self.entries.lock())
            .into_values()
            .filter(|entry| entry.binding.is_bound())
            .collect();
        if entries.is_empty() {
            return Ok(());
        }

        let states: Vec<_> = entries.iter().map(|entry| entry.buffer.state()).collect();
        let mut guards = lock_multiple(&states);

        let mut outcome = Ok(());
        for (entry, state) in entries.iter().zip(guards.iter_mut()) {
            let copied = match entry.binding.try_codec() {
                Some(codec) => state.copy_back(&**codec),
                None => CodecBusySnafu {
                    buffer: entry.buffer.id(),
                }
                .fail(),
            };
            if let Err(e) = copied {
                outcome = Err(e);
                break;
            }
        }

        if let Err(e) = outcome {
            for state in guards.iter_mut() {
                state.discard_staging();
            }
            for entry in &entries {
                entry.binding.abort();
            }
            drop(guards);
            tracing::debug!("Rolled back {} buffer(s): {}", entries.len(), e);
            return Err(e);
        }

        for (entry, state) in entries.iter().zip(guards.iter_mut()) {
            state.commit(entry.buffer.id())?;
        }
        for entry in &entries {
            entry.binding.mark_committed();
        }
        drop(guards);
        tracing::debug!("Committed {} buffer(s)", entries.len());
        Ok(())
    }

    /// Hand every tracked codec over to the enclosing transaction.
    /// The most recent codec wins for each buffer.
    pub(crate) fn transfer_to(&self, parent: &TransactionCell) {
        let entries = std::mem::take(&mut *self.entries.lock());
        let mut replaced = Vec::new();
        {
            let mut target = parent.entries.lock();
            for (id, entry) in entries {
                let binding = Arc::clone(&entry.binding);
                if let Some(previous) = target.insert(id, entry) {
                    if !Arc::ptr_eq(&previous.binding, &binding) {
                        previous.binding.abort();
                    }
                    replaced.push(previous);
                }
            }
        }
        drop(replaced);
    }

    /// Drop every tracked codec without writing it back.
    pub(crate) fn abort_all(&self) {
        let entries = std::mem::take(&mut *self.entries.lock());
        for entry in entries.values() {
            entry.binding.abort();
        }
    }
}

/// A scope grouping the writing codecs acquired by the current thread.
///
/// Dropping the transaction closes it
/// and logs any error of the final commit;
/// use [`finish`](Transaction::finish) to observe that error instead.
/// A transaction dropped while its thread is panicking
/// is aborted before it closes, so nothing of it is committed.
/// A transaction belongs to the thread which opened it.
#[derive(Debug)]
pub struct Transaction {
    cell: Arc<TransactionCell>,
    committing: bool,
    closed: bool,
    _not_send: PhantomData<*const ()>,
}

impl Transaction {
    fn open(committing: bool) -> Self {
        let cell = Arc::new(TransactionCell::default());
        let outermost = TransactionStack::global().push(Arc::clone(&cell));
        // the outermost transaction always commits
        let committing = committing || outermost;
        tracing::debug!(
            "Opened transaction at depth {} (committing: {})",
            TransactionStack::global().depth(),
            committing
        );
        Transaction {
            cell,
            committing,
            closed: false,
            _not_send: PhantomData,
        }
    }

    /// Open a transaction which defers its commit
    /// to the enclosing transaction, if there is one.
    pub fn new() -> Self {
        Transaction::open(false)
    }

    /// Open a transaction which commits its codecs when it closes,
    /// even within another transaction.
    pub fn committing() -> Self {
        Transaction::open(true)
    }

    /// Whether the codecs are committed when this transaction closes.
    pub fn is_committing(&self) -> bool {
        self.committing
    }

    /// The number of buffers with a codec registered here.
    pub fn len(&self) -> usize {
        self.cell.len()
    }

    /// Whether no codec is registered here.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Obtain a writing codec registered with this transaction,
    /// whatever the innermost transaction of the thread is.
    pub fn acquire_codec(
        &self,
        buffer: &Arc<ElementBuffer>,
        raw: bool,
        size_hint: usize,
    ) -> Result<CodecHandle> {
        buffer.acquire(true, raw, size_hint, Some(&self.cell))
    }

    /// Discard every codec registered so far.
    pub fn abort(&self) {
        self.cell.abort_all();
    }

    /// Close the transaction, committing if it is a committing one.
    pub fn finish(mut self) -> Result<()> {
        self.close()
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let outcome = if self.committing {
            self.cell.commit_all()
        } else {
            Ok(())
        };
        let stack = TransactionStack::global();
        let parent = stack.pop(&self.cell)?;
        tracing::debug!(
            "Closed transaction, depth now {} (committing: {})",
            stack.depth(),
            self.committing
        );
        if !self.committing {
            match parent {
                Some(parent) => self.cell.transfer_to(&parent),
                None => {
                    tracing::warn!(
                        "Transaction closed with no enclosing transaction, discarding {} codec(s)",
                        self.cell.len()
                    );
                    self.cell.abort_all();
                }
            }
        }
        outcome
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Transaction::new()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.closed && std::thread::panicking() {
            tracing::warn!(
                "Aborting transaction of {} buffer(s) while panicking",
                self.cell.len()
            );
            self.cell.abort_all();
        }
        if let Err(e) = self.close() {
            tracing::error!("Transaction failed to close: {}", e);
        }
    }
}

fn run<F, T, E>(transaction: Transaction, f: F) -> std::result::Result<T, E>
where
    F: FnOnce(&Transaction) -> std::result::Result<T, E>,
    E: From<Error>,
{
    match f(&transaction) {
        Ok(value) => {
            transaction.finish()?;
            Ok(value)
        }
        Err(e) => {
            transaction.abort();
            if let Err(close) = transaction.finish() {
                tracing::warn!("Could not close the aborted transaction: {}", close);
            }
            Err(e)
        }
    }
}

/// Run `f` within a new transaction.
///
/// The transaction is finished when `f` succeeds,
/// and aborted when it fails.
pub fn with_transaction<F, T, E>(f: F) -> std::result::Result<T, E>
where
    F: FnOnce(&Transaction) -> std::result::Result<T, E>,
    E: From<Error>,
{
    run(Transaction::new(), f)
}

/// Run `f` within a new committing transaction.
///
/// The codecs it acquires are committed when `f` succeeds,
/// and discarded when it fails.
pub fn with_committing_transaction<F, T, E>(f: F) -> std::result::Result<T, E>
where
    F: FnOnce(&Transaction) -> std::result::Result<T, E>,
    E: From<Error>,
{
    run(Transaction::committing(), f)
}
