use parking_lot::Mutex;

/// An object that can be scrubbed back to its freshly-constructed state.
pub trait Reusable {
    fn reset(&mut self);
}

/// Explicit free-list of transient processor objects.
///
/// Purely an allocation-reuse mechanism: objects are scrubbed on release, so
/// no semantic state survives between uses. Acquire and release are safe for
/// concurrent use.
pub struct Pool<T> {
    free: Mutex<Vec<T>>,
    make: fn() -> T,
}

impl<T: Default> Default for Pool<T> {
    fn default() -> Self {
        Pool {
            free: Mutex::new(Vec::new()),
            make: T::default,
        }
    }
}

impl<T: Reusable> Pool<T> {
    pub fn new(make: fn() -> T) -> Self {
        Pool {
            free: Mutex::new(Vec::new()),
            make,
        }
    }

    /// Take an object from the free list, or construct one if empty.
    ///
    /// The returned guard scrubs and returns the object when dropped, on
    /// every exit path including errors.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let value = self.free.lock().pop().unwrap_or_else(|| (self.make)());
        Pooled {
            value: Some(value),
            home: self,
        }
    }

    /// Number of idle objects currently in the free list.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// RAII guard over a pooled object.
pub struct Pooled<'a, T: Reusable> {
    value: Option<T>,
    home: &'a Pool<T>,
}

impl<T: Reusable> std::ops::Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().expect("pooled value present until drop")
    }
}

impl<T: Reusable> std::ops::DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("pooled value present until drop")
    }
}

impl<T: Reusable> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(mut value) = self.value.take() {
            value.reset();
            self.home.free.lock().push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        uses: u32,
        scratch: Vec<u8>,
    }

    impl Reusable for Counter {
        fn reset(&mut self) {
            self.scratch.clear();
        }
    }

    #[test]
    fn reuses_released_objects() {
        let pool: Pool<Counter> = Pool::default();
        {
            let mut guard = pool.acquire();
            guard.uses += 1;
            guard.scratch.push(1);
        }
        assert_eq!(pool.idle(), 1);
        let guard = pool.acquire();
        // same allocation came back, scrubbed
        assert_eq!(guard.uses, 1);
        assert!(guard.scratch.is_empty());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn release_runs_on_early_return() {
        fn failing(pool: &Pool<Counter>) -> Result<(), ()> {
            let mut guard = pool.acquire();
            guard.scratch.push(9);
            Err(())
        }
        let pool: Pool<Counter> = Pool::default();
        failing(&pool).unwrap_err();
        assert_eq!(pool.idle(), 1);
        assert!(pool.acquire().scratch.is_empty());
    }

    #[test]
    fn concurrent_acquire_release() {
        let pool: Pool<Counter> = Pool::default();
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let mut guard = pool.acquire();
                        guard.scratch.push(1);
                    }
                });
            }
        });
        // every guard made it back
        assert!(pool.idle() >= 1);
        assert!(pool.idle() <= 8);
    }
}
