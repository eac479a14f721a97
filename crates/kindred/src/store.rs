//! Key-value persistence used by the layout cache.
//!
//! The engine is single-threaded, so store futures are `!Send` local futures. Any executor will
//! do; tests drive them with `futures::executor::block_on`.

use futures::FutureExt;
use futures::future::LocalBoxFuture;
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Async string blob store keyed by string.
pub trait LayoutStore {
    fn get<'a>(&'a self, key: &'a str) -> LocalBoxFuture<'a, StoreResult<Option<String>>>;
    fn set<'a>(&'a self, key: &'a str, value: String) -> LocalBoxFuture<'a, StoreResult<()>>;
    fn delete<'a>(&'a self, key: &'a str) -> LocalBoxFuture<'a, StoreResult<()>>;
}

impl<S: LayoutStore + ?Sized> LayoutStore for &S {
    fn get<'a>(&'a self, key: &'a str) -> LocalBoxFuture<'a, StoreResult<Option<String>>> {
        (**self).get(key)
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> LocalBoxFuture<'a, StoreResult<()>> {
        (**self).set(key, value)
    }

    fn delete<'a>(&'a self, key: &'a str) -> LocalBoxFuture<'a, StoreResult<()>> {
        (**self).delete(key)
    }
}

/// In-process store. `set_offline(true)` makes every call fail, for exercising fallbacks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<FxHashMap<String, String>>,
    offline: Cell<bool>,
    writes: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.set(offline);
    }

    /// Reads a blob synchronously, bypassing the offline switch.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Writes a blob synchronously, bypassing the offline switch.
    pub fn insert_raw(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.borrow_mut().insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Number of successful `set` calls.
    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    fn check(&self) -> StoreResult<()> {
        if self.offline.get() {
            return Err(StoreError::Unavailable {
                message: "memory store is offline".to_string(),
            });
        }
        Ok(())
    }
}

impl LayoutStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> LocalBoxFuture<'a, StoreResult<Option<String>>> {
        async move {
            self.check()?;
            Ok(self.entries.borrow().get(key).cloned())
        }
        .boxed_local()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> LocalBoxFuture<'a, StoreResult<()>> {
        async move {
            self.check()?;
            self.entries.borrow_mut().insert(key.to_string(), value);
            self.writes.set(self.writes.get() + 1);
            Ok(())
        }
        .boxed_local()
    }

    fn delete<'a>(&'a self, key: &'a str) -> LocalBoxFuture<'a, StoreResult<()>> {
        async move {
            self.check()?;
            self.entries.borrow_mut().remove(key);
            Ok(())
        }
        .boxed_local()
    }
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Keys are percent-escaped, so distinct keys never share a file.
    fn path(&self, key: &str) -> PathBuf {
        let mut file = String::with_capacity(key.len());
        for b in key.bytes() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
                file.push(char::from(b));
            } else {
                file.push_str(&format!("%{b:02X}"));
            }
        }
        self.root.join(format!("{file}.json"))
    }
}

impl LayoutStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> LocalBoxFuture<'a, StoreResult<Option<String>>> {
        async move {
            match std::fs::read_to_string(self.path(key)) {
                Ok(text) => Ok(Some(text)),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(err) => Err(err.into()),
            }
        }
        .boxed_local()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> LocalBoxFuture<'a, StoreResult<()>> {
        async move {
            std::fs::create_dir_all(&self.root)?;
            std::fs::write(self.path(key), value)?;
            Ok(())
        }
        .boxed_local()
    }

    fn delete<'a>(&'a self, key: &'a str) -> LocalBoxFuture<'a, StoreResult<()>> {
        async move {
            match std::fs::remove_file(self.path(key)) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        }
        .boxed_local()
    }
}
