//! Locking several mutexes together without risking a deadlock.

use parking_lot::{Mutex, MutexGuard};

/// Lock every mutex in the given order.
///
/// Each attempt tries to lock them all without blocking.
/// When one of them is taken,
/// every lock acquired so far is released
/// and the thread yields before starting over.
/// Callers should still pass the mutexes in a consistent order.
pub(crate) fn lock_multiple<'a, T>(mutexes: &[&'a Mutex<T>]) -> Vec<MutexGuard<'a, T>> {
    let mut attempt = 0u64;
    loop {
        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            match mutex.try_lock() {
                Some(guard) => guards.push(guard),
                None => break,
            }
        }
        if guards.len() == mutexes.len() {
            return guards;
        }
        drop(guards);
        attempt += 1;
        tracing::trace!("Lock set of {} busy, retry #{}", mutexes.len(), attempt);
        std::thread::yield_now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn empty_set() {
        let none: [&Mutex<u8>; 0] = [];
        assert!(lock_multiple(&none).is_empty());
    }

    #[test]
    fn waits_for_busy_members() {
        let a = Arc::new(Mutex::new(0));
        let b = Arc::new(Mutex::new(0));
        let held = b.lock();

        let worker = {
            let (a, b) = (Arc::clone(&a), Arc::clone(&b));
            thread::spawn(move || {
                let mut guards = lock_multiple(&[&*a, &*b]);
                for guard in &mut guards {
                    **guard += 1;
                }
            })
        };

        thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(*a.lock(), 0);
        drop(held);
        worker.join().unwrap();
        assert_eq!(*a.lock(), 1);
        assert_eq!(*b.lock(), 1);
    }

    #[test]
    fn opposite_orders_do_not_deadlock() {
        let a = Arc::new(Mutex::new(0u32));
        let b = Arc::new(Mutex::new(0u32));
        let workers: Vec<_> = (0..4)
            .map(|i| {
                let (a, b) = (Arc::clone(&a), Arc::clone(&b));
                thread::spawn(move || {
                    for _ in 0..200 {
                        let set = if i % 2 == 0 { [&*a, &*b] } else { [&*b, &*a] };
                        let mut guards = lock_multiple(&set);
                        for guard in &mut guards {
                            **guard += 1;
                        }
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(*a.lock(), 800);
        assert_eq!(*b.lock(), 800);
    }
}
