//! Persisted Counter Store
//!
//! Counters kept in the durable key/value store (NVS on ESP32, a flash
//! page pair on STM32). Durability of a single write is the backing
//! store's job: `put_u32` is one committed key update, so a power cut
//! leaves either the old or the new value.

use core::fmt;

use crate::config::STORE_NAMESPACE;
use crate::logger::{info, warn};

pub mod flash;

pub use flash::FlashStore;

/// Durable store failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// The store layout is full or from another version and must be erased
    NeedsErase,
    /// The store or namespace could not be opened
    Unavailable,
    /// Low-level I/O failure with a platform code
    Io(i32),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedsErase => write!(f, "store must be erased"),
            Self::Unavailable => write!(f, "store unavailable"),
            Self::Io(code) => write!(f, "store I/O error (code {code})"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for StoreError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::NeedsErase => defmt::write!(f, "store must be erased"),
            Self::Unavailable => defmt::write!(f, "store unavailable"),
            Self::Io(code) => defmt::write!(f, "store I/O error (code {})", code),
        }
    }
}

/// Power-loss safe key/value store collaborator
pub trait DurableStore {
    /// Open namespace handle
    type Handle;

    /// Initialize the store partition
    ///
    /// # Errors
    ///
    /// `StoreError::NeedsErase` when the partition must be erased before use,
    /// any other error when the store cannot be used at all.
    fn init(&mut self) -> Result<(), StoreError>;

    /// Open a namespace for reading and writing
    ///
    /// # Errors
    ///
    /// Returns an error when the namespace cannot be opened.
    fn open(&mut self, namespace: &str) -> Result<Self::Handle, StoreError>;

    /// Read an unsigned value, `default` when the key is absent
    fn get_u32(&mut self, handle: &Self::Handle, key: &str, default: u32) -> u32;

    /// Write and commit an unsigned value
    ///
    /// # Errors
    ///
    /// Returns an error when the value could not be committed.
    fn put_u32(&mut self, handle: &Self::Handle, key: &str, value: u32) -> Result<(), StoreError>;

    /// Close a namespace handle
    fn close(&mut self, handle: Self::Handle);

    /// Erase every namespace in the store
    ///
    /// # Errors
    ///
    /// Returns an error when the partition could not be erased.
    fn erase_all(&mut self) -> Result<(), StoreError>;
}

/// Monotonic counters in one durable store namespace
#[derive(Debug)]
pub struct CounterStore<S> {
    store: S,
    namespace: &'static str,
}

impl<S: DurableStore> CounterStore<S> {
    /// Create a counter store over the lifecycle namespace
    #[must_use]
    pub const fn new(store: S) -> Self {
        Self::with_namespace(store, STORE_NAMESPACE)
    }

    /// Create a counter store over a custom namespace
    #[must_use]
    pub const fn with_namespace(store: S, namespace: &'static str) -> Self {
        Self { store, namespace }
    }

    /// Namespace the counters live in
    #[must_use]
    pub const fn namespace(&self) -> &'static str {
        self.namespace
    }

    /// Access the backing store
    #[must_use]
    pub const fn backing(&self) -> &S {
        &self.store
    }

    /// Initialize the backing store, erasing it once if its layout is stale
    ///
    /// # Errors
    ///
    /// Returns the store error when the store stays unusable.
    pub fn init_store(&mut self) -> Result<(), StoreError> {
        match self.store.init() {
            Err(StoreError::NeedsErase) => {
                warn!("Durable store needs erase, erasing...");
                self.store.erase_all()?;
                self.store.init()
            }
            other => other,
        }
    }

    /// Increment a counter and return its new value
    ///
    /// Returns 0 when the namespace cannot be opened.
    pub fn increment_and_get(&mut self, key: &str) -> u32 {
        let handle = match self.store.open(self.namespace) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Unable to open store namespace {}: {}", self.namespace, e);
                return 0;
            }
        };

        let value = self.store.get_u32(&handle, key, 0).saturating_add(1);
        if let Err(e) = self.store.put_u32(&handle, key, value) {
            warn!("Unable to persist counter {}: {}", key, e);
        }
        self.store.close(handle);
        value
    }

    /// Read a counter, 0 when absent or unreadable
    pub fn get(&mut self, key: &str) -> u32 {
        match self.store.open(self.namespace) {
            Ok(handle) => {
                let value = self.store.get_u32(&handle, key, 0);
                self.store.close(handle);
                value
            }
            Err(e) => {
                warn!("Unable to open store namespace {}: {}", self.namespace, e);
                0
            }
        }
    }

    /// Erase the whole store and initialize it again
    ///
    /// Clears every namespace, not only the counters of this one.
    ///
    /// # Errors
    ///
    /// Returns the store error when erasing or re-initializing fails.
    pub fn wipe(&mut self) -> Result<(), StoreError> {
        info!("Erasing durable store");
        self.store.erase_all()?;
        self.store.init()
    }
}
