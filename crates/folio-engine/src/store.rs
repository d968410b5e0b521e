//! Portfolio snapshot store.
//!
//! The store holds the authoritative in-memory portfolio together with a
//! version counter. Writers clone a [`Snapshot`], mutate the clone, and
//! hand it back to [`PortfolioStore::commit`], which replaces the live
//! state only if the version is still the one the clone was taken from.

use parking_lot::RwLock;
use tracing::info;

use folio_core::Portfolio;

use crate::errors::{EngineError, Result};

/// A versioned copy of the portfolio.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    /// Store version this copy was taken at.
    pub version: u64,
    /// Deep copy of the portfolio.
    pub portfolio: Portfolio,
}

/// Owner of the live portfolio.
pub trait PortfolioStore: Send + Sync {
    /// Deep copy of the current state.
    fn snapshot(&self) -> Snapshot;

    /// Replace the live state with `snapshot.portfolio`.
    ///
    /// Fails with [`EngineError::StaleSnapshot`] if another commit landed
    /// after `snapshot` was taken. Returns the new version.
    fn commit(&self, snapshot: Snapshot) -> Result<u64>;

    /// Current version without copying the portfolio.
    fn version(&self) -> u64;
}

/// [`PortfolioStore`] backed by a lock-protected value.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Snapshot>,
}

impl InMemoryStore {
    /// Store starting at version 0 with `portfolio`.
    pub fn new(portfolio: Portfolio) -> Self {
        Self {
            inner: RwLock::new(Snapshot {
                version: 0,
                portfolio,
            }),
        }
    }
}

impl PortfolioStore for InMemoryStore {
    fn snapshot(&self) -> Snapshot {
        self.inner.read().clone()
    }

    fn commit(&self, snapshot: Snapshot) -> Result<u64> {
        let mut current = self.inner.write();
        if current.version != snapshot.version {
            return Err(EngineError::StaleSnapshot {
                expected: snapshot.version,
                actual: current.version,
            });
        }
        let version = current.version + 1;
        *current = Snapshot {
            version,
            portfolio: snapshot.portfolio,
        };
        info!(version, "portfolio committed");
        Ok(version)
    }

    fn version(&self) -> u64 {
        self.inner.read().version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
