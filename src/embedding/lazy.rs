//! Load-once cell for expensive models.
//!
//! States: `Uninitialized -> Initializing -> Ready`. A failed (or panicking)
//! load goes straight back to `Uninitialized`, so the next caller retries
//! instead of seeing a poisoned cell. Callers that arrive while a load is in
//! flight block on a condvar until it settles.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

enum LoadState<T> {
    Uninitialized,
    Initializing,
    Ready(Arc<T>),
}

pub struct LazyModel<T> {
    state: Mutex<LoadState<T>>,
    settled: Condvar,
}

/// Resets the cell if the loader fails or unwinds.
struct LoadGuard<'a, T> {
    cell: &'a LazyModel<T>,
    armed: bool,
}

impl<T> Drop for LoadGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            *self.cell.state.lock() = LoadState::Uninitialized;
            self.cell.settled.notify_all();
        }
    }
}

impl<T> Default for LazyModel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyModel<T> {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(LoadState::Uninitialized),
            settled: Condvar::new(),
        }
    }

    /// The loaded value, if a load has succeeded.
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.state.lock() {
            LoadState::Ready(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }

    /// Return the loaded value, running `load` if nobody has succeeded yet.
    ///
    /// At most one `load` runs at a time. Concurrent callers wait for it and
    /// share its value; if it fails, one of them runs its own `load`.
    pub fn get_or_try_init<E>(&self, load: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        {
            let mut state = self.state.lock();
            loop {
                if let LoadState::Ready(value) = &*state {
                    return Ok(Arc::clone(value));
                }
                if matches!(*state, LoadState::Initializing) {
                    self.settled.wait(&mut state);
                    continue;
                }
                *state = LoadState::Initializing;
                break;
            }
        }

        let mut guard = LoadGuard {
            cell: self,
            armed: true,
        };
        let value = Arc::new(load()?);
        guard.armed = false;

        *self.state.lock() = LoadState::Ready(Arc::clone(&value));
        self.settled.notify_all();
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_loads_once() {
        let cell = LazyModel::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = cell
                .get_or_try_init(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cell.is_ready());
    }

    #[test]
    fn test_concurrent_callers_share_one_load() {
        let cell = Arc::new(LazyModel::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cell.get_or_try_init(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Ok::<_, String>("model")
                    })
                    .map(|v| *v)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), "model");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_allows_retry() {
        let cell = LazyModel::new();
        let first = cell.get_or_try_init(|| Err::<u8, _>("download failed"));
        assert_eq!(first.unwrap_err(), "download failed");
        assert!(!cell.is_ready());

        let second = cell.get_or_try_init(|| Ok::<_, &str>(7)).unwrap();
        assert_eq!(*second, 7);
    }

    #[test]
    fn test_panicking_loader_resets_state() {
        let cell = Arc::new(LazyModel::<u8>::new());
        let panicking = Arc::clone(&cell);
        let result = thread::spawn(move || {
            let _ = panicking.get_or_try_init(|| -> Result<u8, String> { panic!("boom") });
        })
        .join();
        assert!(result.is_err());

        let value = cell.get_or_try_init(|| Ok::<_, String>(1)).unwrap();
        assert_eq!(*value, 1);
    }

    #[test]
    fn test_waiters_retry_after_failed_load() {
        let cell = Arc::new(LazyModel::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    cell.get_or_try_init(|| {
                        let n = calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        if n == 0 {
                            Err("first attempt fails".to_string())
                        } else {
                            Ok(n)
                        }
                    })
                    .ok()
                    .map(|v| *v)
                })
            })
            .collect();

        let results: Vec<Option<usize>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        // exactly one caller saw the failure; the rest share the retried load
        assert_eq!(results.iter().filter(|r| r.is_none()).count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let loaded: Vec<usize> = results.into_iter().flatten().collect();
        assert!(loaded.windows(2).all(|w| w[0] == w[1]));
    }
}
