use std::sync::Arc;
use std::thread;

use dicombuf_core::VR;
use dicombuf_object::{
    with_committing_transaction, with_transaction, ElementBuffer, Error, Transaction,
    TransactionStack,
};
use pretty_assertions::assert_eq;

fn text_buffer(vr: VR, text: &str) -> Arc<ElementBuffer> {
    Arc::new(ElementBuffer::with_bytes(vr, text.as_bytes()))
}

fn write_text(buffer: &Arc<ElementBuffer>, text: &str) {
    let writer = buffer.writer().unwrap();
    let mut codec = writer.codec();
    codec.resize(1);
    codec.set_as_unicode_text(0, text);
}

fn read_text(buffer: &Arc<ElementBuffer>) -> String {
    buffer.reader().unwrap().codec().get_as_unicode_text(0)
}

#[test]
fn failed_copy_back_leaves_every_buffer_untouched() {
    let id = text_buffer(VR::LO, "alpha ");
    let name = text_buffer(VR::PN, "Doe^John");

    let transaction = Transaction::committing();
    write_text(&id, "beta");
    // not representable in the default character set
    write_text(&name, "Иванов^Иван");
    let outcome = transaction.finish();

    assert!(matches!(outcome, Err(Error::EncodeValue { .. })));
    assert_eq!(id.version(), 0);
    assert_eq!(name.version(), 0);
    assert_eq!(id.to_bytes().unwrap().as_slice(), b"alpha ");
    assert_eq!(name.to_bytes().unwrap().as_slice(), b"Doe^John");
    assert_eq!(TransactionStack::global().depth(), 0);
}

#[test]
fn nested_transactions_defer_to_the_outermost() {
    let buffer = text_buffer(VR::LO, "start ");

    let outer = Transaction::new();
    assert!(outer.is_committing());
    write_text(&buffer, "outer");
    {
        let inner = Transaction::new();
        assert!(!inner.is_committing());
        write_text(&buffer, "inner");
        assert_eq!(inner.len(), 1);
        inner.finish().unwrap();
    }
    assert_eq!(buffer.version(), 0);
    assert_eq!(read_text(&buffer), "start");
    // the codec handed over by the inner transaction replaced the outer one
    assert_eq!(outer.len(), 1);

    outer.finish().unwrap();
    assert_eq!(buffer.version(), 1);
    assert_eq!(read_text(&buffer), "inner");
}

#[test]
fn latest_writer_wins_after_nesting() {
    let buffer = text_buffer(VR::LO, "start ");

    let outer = Transaction::new();
    {
        let _inner = Transaction::new();
        write_text(&buffer, "inner");
    }
    write_text(&buffer, "outer");
    outer.finish().unwrap();

    assert_eq!(buffer.version(), 1);
    assert_eq!(read_text(&buffer), "outer");
}

#[test]
fn committing_child_commits_on_its_own() {
    let buffer = text_buffer(VR::SH, "start ");

    let outer = Transaction::new();
    {
        let child = Transaction::committing();
        write_text(&buffer, "child");
        child.finish().unwrap();
    }
    assert_eq!(buffer.version(), 1);
    assert_eq!(read_text(&buffer), "child");
    assert!(outer.is_empty());
    outer.finish().unwrap();
    assert_eq!(buffer.version(), 1);
}

#[test]
fn aborted_transaction_discards_its_codecs() {
    let buffer = text_buffer(VR::LO, "start ");

    let transaction = Transaction::new();
    let writer = buffer.writer().unwrap();
    writer.codec().set_as_unicode_text(0, "changed");
    transaction.abort();
    assert!(!writer.is_writing());
    transaction.finish().unwrap();

    drop(writer);
    assert_eq!(buffer.version(), 0);
    assert_eq!(read_text(&buffer), "start");
}

#[derive(Debug)]
enum StepError {
    Buffer(Error),
    Rejected,
}

impl From<Error> for StepError {
    fn from(e: Error) -> Self {
        StepError::Buffer(e)
    }
}

#[test]
fn failing_closure_rolls_back() {
    let buffer = text_buffer(VR::LO, "start ");

    let outcome: Result<(), StepError> = with_committing_transaction(|_| {
        write_text(&buffer, "changed");
        Err(StepError::Rejected)
    });
    assert!(matches!(outcome, Err(StepError::Rejected)));
    assert_eq!(buffer.version(), 0);

    let value = with_transaction(|transaction| -> Result<usize, StepError> {
        write_text(&buffer, "changed");
        Ok(transaction.len())
    })
    .unwrap();
    assert_eq!(value, 1);
    assert_eq!(buffer.version(), 1);
    assert_eq!(read_text(&buffer), "changed");
}

#[test]
fn failed_commit_reaches_the_closure_caller() {
    let name = text_buffer(VR::PN, "Doe^John");
    let outcome: Result<(), StepError> = with_transaction(|_| {
        write_text(&name, "Иванов");
        Ok(())
    });
    assert!(matches!(
        outcome,
        Err(StepError::Buffer(Error::EncodeValue { .. }))
    ));
    assert_eq!(name.version(), 0);
}

#[test]
fn explicit_transaction_context() {
    let buffer = text_buffer(VR::LO, "start ");

    let outer = Transaction::new();
    let inner = Transaction::new();
    let writer = outer.acquire_codec(&buffer, false, 0).unwrap();
    writer.codec().set_as_unicode_text(0, "explicit");
    drop(writer);
    assert_eq!(inner.len(), 0);
    assert_eq!(outer.len(), 1);

    inner.finish().unwrap();
    assert_eq!(buffer.version(), 0);
    outer.finish().unwrap();
    assert_eq!(read_text(&buffer), "explicit");
}

#[test]
fn closing_out_of_order() {
    let buffer = text_buffer(VR::LO, "start ");
    let stack = TransactionStack::global();

    let outer = Transaction::new();
    let inner = Transaction::new();
    assert_eq!(stack.depth(), 2);
    outer.finish().unwrap();
    assert_eq!(stack.depth(), 1);

    // the inner transaction is left with nobody to hand its codecs to
    write_text(&buffer, "lost");
    assert_eq!(inner.len(), 1);
    inner.finish().unwrap();
    assert_eq!(stack.depth(), 0);
    assert_eq!(buffer.version(), 0);
}

#[test]
fn untracked_writers_commit_after_transactions_close() {
    let buffer = text_buffer(VR::LO, "start ");
    {
        let _transaction = Transaction::new();
        write_text(&buffer, "tracked");
    }
    assert_eq!(buffer.version(), 1);

    write_text(&buffer, "untracked");
    assert_eq!(buffer.version(), 2);
    assert_eq!(read_text(&buffer), "untracked");
}

#[test]
fn readers_never_see_partial_commits() {
    let buffer = text_buffer(VR::LO, "AAAA");

    let writer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            for i in 0..200 {
                let text = if i % 2 == 0 { "BBBBBBBB" } else { "AAAA" };
                let transaction = Transaction::new();
                write_text(&buffer, text);
                transaction.finish().unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for _ in 0..200 {
                    let text = read_text(&buffer);
                    assert!(text == "AAAA" || text == "BBBBBBBB", "torn value {:?}", text);
                    let bytes = buffer.to_bytes().unwrap();
                    assert!(bytes.as_slice() == b"AAAA" || bytes.as_slice() == b"BBBBBBBB");
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(buffer.version(), 200);
    assert_eq!(read_text(&buffer), "AAAA");
}

#[test]
fn transactions_on_other_threads_are_independent() {
    let buffer = text_buffer(VR::LO, "start ");
    let _transaction = Transaction::new();

    let other = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            assert_eq!(TransactionStack::global().depth(), 0);
            write_text(&buffer, "other");
        })
    };
    other.join().unwrap();

    assert_eq!(TransactionStack::global().depth(), 1);
    assert_eq!(buffer.version(), 1);
    assert_eq!(read_text(&buffer), "other");
}

#[test]
fn panicking_thread_publishes_nothing() {
    let first = text_buffer(VR::LO, "first ");
    let second = text_buffer(VR::LO, "second");

    let worker = {
        let first = Arc::clone(&first);
        let second = Arc::clone(&second);
        thread::spawn(move || {
            let _transaction = Transaction::new();
            write_text(&first, "changed");
            write_text(&second, "changed");
            panic!("interrupted halfway");
        })
    };
    assert!(worker.join().is_err());

    assert_eq!(first.version(), 0);
    assert_eq!(second.version(), 0);
    assert_eq!(read_text(&first), "first");
    assert_eq!(read_text(&second), "second");
}

#[test]
fn untracked_writer_is_discarded_when_panicking() {
    let buffer = text_buffer(VR::LO, "start ");

    let worker = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            let writer = buffer.writer().unwrap();
            writer.codec().set_as_unicode_text(0, "changed");
            panic!("interrupted before commit");
        })
    };
    assert!(worker.join().is_err());

    assert_eq!(buffer.version(), 0);
    assert_eq!(read_text(&buffer), "start");
}
