//! Memoization Module
//!
//! Wraps a function so its results are cached through a [`CacheManager`],
//! keyed by a caller-chosen name plus a canonical form of the arguments.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::cache::{CacheManager, Tier};
use crate::error::{CacheError, Result};

/// Prefix of every memoized result key.
pub const MEMO_KEY_PREFIX: &str = "func:";

/// Derives the cache key for calling `function` with `args`.
///
/// Arguments go through `serde_json::Value` first, whose object keys are
/// sorted, so map arguments hash the same regardless of insertion order.
/// Arguments that cannot be represented (e.g. maps with non-string keys)
/// fail with [`CacheError::KeyDerivation`].
pub fn memo_key<A: Serialize + ?Sized>(function: &str, args: &A) -> Result<String> {
    let args = serde_json::to_value(args).map_err(CacheError::KeyDerivation)?;
    let canonical = serde_json::to_vec(&json!({ "function": function, "args": args }))
        .map_err(CacheError::KeyDerivation)?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(format!("{}{}", MEMO_KEY_PREFIX, hex::encode(hasher.finalize())))
}

// == Memoized ==
/// A function whose results are cached.
///
/// Built with [`CacheManager::memoize`]. Multiple arguments are passed as a
/// tuple or struct.
pub struct Memoized<A: ?Sized, R, F> {
    manager: Arc<CacheManager>,
    name: String,
    ttl: u64,
    tier: Tier,
    func: F,
    _marker: PhantomData<fn(&A) -> R>,
}

impl<A, R, F> Memoized<A, R, F>
where
    A: Serialize + ?Sized,
    R: Serialize + DeserializeOwned,
    F: Fn(&A) -> R,
{
    /// Returns the cached result for `args`, computing and storing it on miss.
    ///
    /// Errors only when the cache key cannot be derived; the function is not
    /// called in that case.
    pub fn call(&self, args: &A) -> Result<R> {
        let key = memo_key(&self.name, args)?;

        if let Some(value) = self.manager.get_value(&key, self.tier) {
            match serde_json::from_value::<R>(value) {
                Ok(result) => {
                    debug!(function = %self.name, "memoized hit");
                    return Ok(result);
                }
                Err(err) => {
                    warn!(function = %self.name, error = %err, "cached result has unexpected shape, recomputing");
                }
            }
        }

        let result = (self.func)(args);
        match self.manager.set(&key, &result, Some(self.ttl), self.tier) {
            Ok(_) => debug!(function = %self.name, "memoized miss, result stored"),
            Err(err) => warn!(function = %self.name, error = %err, "memoized result not cacheable"),
        }
        Ok(result)
    }

    /// Drops the cached result for `args` from this wrapper's tiers.
    pub fn invalidate(&self, args: &A) -> Result<bool> {
        let key = memo_key(&self.name, args)?;
        Ok(self.manager.delete(&key, self.tier))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<A: ?Sized, R, F> fmt::Debug for Memoized<A, R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("tier", &self.tier)
            .finish()
    }
}

impl CacheManager {
    /// Wraps `func` so its results are cached under `name` for `ttl` seconds
    /// in `tier`.
    ///
    /// `name` identifies the function; two wrappers sharing a name share
    /// cached results.
    pub fn memoize<A, R, F>(
        self: &Arc<Self>,
        name: impl Into<String>,
        ttl: u64,
        tier: Tier,
        func: F,
    ) -> Memoized<A, R, F>
    where
        A: Serialize + ?Sized,
        R: Serialize + DeserializeOwned,
        F: Fn(&A) -> R,
    {
        Memoized {
            manager: Arc::clone(self),
            name: name.into(),
            ttl,
            tier,
            func,
            _marker: PhantomData,
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn create_test_manager() -> (Arc<CacheManager>, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let config = Config {
            cache_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        (Arc::new(CacheManager::from_config(&config).unwrap()), temp_dir)
    }

    #[test]
    fn test_memo_key_is_deterministic() {
        let a = memo_key("add", &(1, 2)).unwrap();
        let b = memo_key("add", &(1, 2)).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with(MEMO_KEY_PREFIX));
        assert_ne!(a, memo_key("add", &(2, 1)).unwrap());
        assert_ne!(a, memo_key("sub", &(1, 2)).unwrap());
    }

    #[test]
    fn test_memo_key_ignores_map_order() {
        let mut first = HashMap::new();
        first.insert("serial", "R58M");
        first.insert("model", "SM-G981B");
        let mut second = BTreeMap::new();
        second.insert("model", "SM-G981B");
        second.insert("serial", "R58M");

        assert_eq!(memo_key("f", &first).unwrap(), memo_key("f", &second).unwrap());
    }

    #[test]
    fn test_memo_key_rejects_non_string_map_keys() {
        let mut args = HashMap::new();
        args.insert((1, 2), "pair");

        let result = memo_key("f", &args);
        assert!(matches!(result, Err(CacheError::KeyDerivation(_))));
    }

    #[test]
    fn test_memoized_calls_once_per_args() {
        let (manager, _dir) = create_test_manager();
        let calls = AtomicUsize::new(0);
        let add = manager.memoize("add", 60, Tier::Memory, |&(x, y): &(i32, i32)| {
            calls.fetch_add(1, Ordering::SeqCst);
            x + y
        });

        assert_eq!(add.call(&(1, 2)).unwrap(), 3);
        assert_eq!(add.call(&(1, 2)).unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(add.call(&(2, 2)).unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_key_derivation_failure_surfaces() {
        let (manager, _dir) = create_test_manager();
        let calls = AtomicUsize::new(0);
        let count = manager.memoize(
            "count",
            60,
            Tier::Memory,
            |args: &HashMap<(u8, u8), u8>| {
                calls.fetch_add(1, Ordering::SeqCst);
                args.len()
            },
        );

        let mut args = HashMap::new();
        args.insert((0, 1), 2);
        assert!(matches!(count.call(&args), Err(CacheError::KeyDerivation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let (manager, _dir) = create_test_manager();
        let calls = AtomicUsize::new(0);
        let lookup = manager.memoize("lookup", 60, Tier::Both, |id: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            format!("device-{id}")
        });

        lookup.call("a").unwrap();
        assert!(lookup.invalidate("a").unwrap());
        lookup.call("a").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
