//! String Pool: interns character strings, returning shared handles with reference
//! counting. All lexemes and identifiers flow through it.
//!
//! A pool is closed-chained: each bucket is a `Vec` of already-interned strings sharing
//! the same FNV-1a hash bucket index. `intern` walks the chain, returns the existing
//! handle (incrementing its count) on a byte-for-byte match, otherwise allocates a fresh
//! entry and appends it to the chain.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Errors produced by pool lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// `init` was called a second time on the same global pool.
    DoubleInit,
    /// The requested bucket count is unusable (e.g. zero).
    InvalidBucketCount,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::DoubleInit => f.write_str("string pool already initialized"),
            PoolError::InvalidBucketCount => f.write_str("bucket count must be nonzero"),
        }
    }
}

impl std::error::Error for PoolError {}

/// FNV-1a rolling hash over raw bytes.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET_BASIS;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

struct Entry {
    bytes: Box<[u8]>,
    hash: u64,
}

struct PoolInner {
    // Buckets hold `Weak` references only: the chain itself must not keep an entry alive,
    // or the last external `Symbol` dropping would never bring its strong count to zero.
    buckets: RefCell<Vec<Vec<Weak<Entry>>>>,
}

impl PoolInner {
    fn bucket_index(&self, hash: u64, bucket_count: usize) -> usize {
        (hash as usize) % bucket_count
    }

    fn release_entry(&self, entry: &Rc<Entry>) {
        let bucket_count = self.buckets.borrow().len();
        let idx = self.bucket_index(entry.hash, bucket_count);
        let mut buckets = self.buckets.borrow_mut();
        let target = Rc::as_ptr(entry);
        if let Some(pos) = buckets[idx].iter().position(|w| w.as_ptr() == target) {
            buckets[idx].remove(pos);
        }
    }
}

/// A handle to an isolated string pool; construct one per test, or use [`global`]/[`init`]
/// for the process-wide singleton.
#[derive(Clone)]
pub struct Pool {
    inner: Rc<PoolInner>,
}

impl Pool {
    pub fn new(bucket_count: usize) -> Result<Self, PoolError> {
        if bucket_count == 0 {
            return Err(PoolError::InvalidBucketCount);
        }
        Ok(Pool {
            inner: Rc::new(PoolInner {
                buckets: RefCell::new(vec![Vec::new(); bucket_count]),
            }),
        })
    }

    fn intern_bytes(&self, bytes: &[u8]) -> Symbol {
        let hash = fnv1a(bytes);
        let bucket_count = self.inner.buckets.borrow().len();
        let idx = self.inner.bucket_index(hash, bucket_count);

        {
            let buckets = self.inner.buckets.borrow();
            let existing = buckets[idx].iter().find_map(|w| {
                w.upgrade().filter(|e| e.hash == hash && &*e.bytes == bytes)
            });
            if let Some(existing) = existing {
                return Symbol {
                    entry: existing,
                    pool: Rc::downgrade(&self.inner),
                };
            }
        }

        let entry = Rc::new(Entry {
            bytes: bytes.to_vec().into_boxed_slice(),
            hash,
        });
        self.inner.buckets.borrow_mut()[idx].push(Rc::downgrade(&entry));
        Symbol {
            entry,
            pool: Rc::downgrade(&self.inner),
        }
    }

    /// Intern a whole string.
    pub fn intern(&self, s: &str) -> Symbol {
        self.intern_bytes(s.as_bytes())
    }

    /// Intern a raw byte slice (for lexemes that are not guaranteed valid UTF-8, e.g.
    /// disabled-code-section text).
    pub fn intern_slice(&self, bytes: &[u8]) -> Symbol {
        self.intern_bytes(bytes)
    }

    /// Intern the concatenation of two strings without materialising an intermediate
    /// owned `String` at the call site.
    pub fn intern_concat(&self, a: &str, b: &str) -> Symbol {
        let mut buf = Vec::with_capacity(a.len() + b.len());
        buf.extend_from_slice(a.as_bytes());
        buf.extend_from_slice(b.as_bytes());
        self.intern_bytes(&buf)
    }

    /// Re-acquire a handle to an already-interned string, incrementing its count.
    pub fn retain(&self, sym: &Symbol) -> Symbol {
        sym.clone()
    }

    /// Number of live (refcount > 0) strings across all buckets. Exposed for tests.
    pub fn live_count(&self) -> usize {
        self.inner.buckets.borrow().iter().map(Vec::len).sum()
    }
}

/// A reference-counted handle into a [`Pool`]. Two symbols compare equal iff they were
/// interned from byte-identical input, because interning always returns the existing
/// allocation for equal content.
#[derive(Clone)]
pub struct Symbol {
    entry: Rc<Entry>,
    pool: Weak<PoolInner>,
}

impl Symbol {
    pub fn as_bytes(&self) -> &[u8] {
        &self.entry.bytes
    }

    /// Panics if the interned bytes are not valid UTF-8; lexemes and identifiers always
    /// are in this crate's usage (only disabled-code-section scanning deals in raw bytes,
    /// and those are never turned into `Symbol`s that callers read as `str`).
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(self.as_bytes()).expect("interned lexeme is not valid UTF-8")
    }

    pub fn len(&self) -> usize {
        self.entry.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.bytes.is_empty()
    }

    /// Explicit release. Equivalent to dropping the handle; provided so call sites can name
    /// the release point explicitly instead of relying on scope exit.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Symbol {
    fn drop(&mut self) {
        // Rc::strong_count includes this handle; if it's the last one, the pool's chain
        // entry must be unlinked before this drop finishes freeing the backing bytes.
        if Rc::strong_count(&self.entry) == 1 {
            if let Some(pool) = self.pool.upgrade() {
                pool.release_entry(&self.entry);
            }
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entry, &other.entry)
    }
}

impl Eq for Symbol {}

impl std::hash::Hash for Symbol {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Rc::as_ptr(&self.entry) as usize).hash(state)
    }
}

const DEFAULT_BUCKET_COUNT: usize = 2048;

thread_local! {
    static GLOBAL: RefCell<Option<Pool>> = const { RefCell::new(None) };
}

/// Initialize the process-wide pool. May be called at most once; a second call returns
/// [`PoolError::DoubleInit`].
pub fn init(bucket_count: usize) -> Result<(), PoolError> {
    GLOBAL.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_some() {
            return Err(PoolError::DoubleInit);
        }
        *slot = Some(Pool::new(bucket_count)?);
        Ok(())
    })
}

/// Fetch the process-wide pool, initializing it with the default bucket count on first
/// use if [`init`] was never called.
pub fn global() -> Pool {
    GLOBAL.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(Pool::new(DEFAULT_BUCKET_COUNT).expect("default bucket count is nonzero"));
        }
        slot.as_ref().unwrap().clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_equal_bytes_returns_equal_handles() {
        let pool = Pool::new(16).unwrap();
        let a = pool.intern("MODULE");
        let b = pool.intern("MODULE");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "MODULE");
    }

    #[test]
    fn interning_distinct_bytes_returns_distinct_handles() {
        let pool = Pool::new(16).unwrap();
        let a = pool.intern("MODULE");
        let b = pool.intern("Module");
        assert_ne!(a, b);
    }

    #[test]
    fn release_to_zero_frees_the_chain_slot() {
        let pool = Pool::new(4).unwrap();
        {
            let _a = pool.intern("transient");
            assert_eq!(pool.live_count(), 1);
        }
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn retain_keeps_entry_alive_until_both_handles_drop() {
        let pool = Pool::new(4).unwrap();
        let a = pool.intern("shared");
        let b = pool.retain(&a);
        drop(a);
        assert_eq!(pool.live_count(), 1);
        drop(b);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn intern_concat_matches_manual_concatenation() {
        let pool = Pool::new(4).unwrap();
        let concat = pool.intern_concat("foo", "bar");
        let manual = pool.intern("foobar");
        assert_eq!(concat, manual);
    }

    #[test]
    fn zero_bucket_count_is_rejected() {
        assert_eq!(Pool::new(0).unwrap_err(), PoolError::InvalidBucketCount);
    }

    #[test]
    fn double_init_reports_error() {
        // GLOBAL is thread_local, so this test's own OS thread sees a private singleton.
        assert_eq!(init(64), Ok(()));
        assert_eq!(init(64), Err(PoolError::DoubleInit));
    }
}
