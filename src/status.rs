//! Shared transfer progress, readable from any task
//!
//! The transport updates this as fragments go out or come in; a UI or
//! status task can poll [`TransferStatus::snapshot`] without touching the
//! transport itself.

use core::cell::RefCell;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Progress of the transfer currently in flight, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferProgress {
    /// A send or receive transaction is running
    pub active: bool,
    /// Fragment count of the running transaction
    pub total_fragments: u8,
    /// Zero-based index of the fragment being worked on
    pub current_fragment: u8,
}

/// Interior-mutable progress cell shared between the transport and
/// observers. Designed to live in a `static`.
pub struct TransferStatus {
    inner: Mutex<CriticalSectionRawMutex, RefCell<TransferProgress>>,
}

impl TransferStatus {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(TransferProgress {
                active: false,
                total_fragments: 0,
                current_fragment: 0,
            })),
        }
    }

    /// Mark a transaction as started.
    pub fn set_active(&self, total_fragments: u8) {
        self.inner.lock(|p| {
            *p.borrow_mut() = TransferProgress {
                active: true,
                total_fragments,
                current_fragment: 0,
            };
        });
    }

    /// Record the fragment currently in flight.
    pub fn set_progress(&self, current_fragment: u8) {
        self.inner.lock(|p| {
            p.borrow_mut().current_fragment = current_fragment;
        });
    }

    /// Mark the transport idle again.
    pub fn set_idle(&self) {
        self.inner.lock(|p| {
            p.borrow_mut().active = false;
        });
    }

    /// Copy of the current progress.
    pub fn snapshot(&self) -> TransferProgress {
        self.inner.lock(|p| *p.borrow())
    }
}

impl Default for TransferStatus {
    fn default() -> Self {
        Self::new()
    }
}
