//! The single in-flight operation a picker allows.

use std::sync::{Arc, Mutex, MutexGuard};
use ulid::Ulid;

use crate::error::MediaError;
use crate::options::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveOperation {
    id: Ulid,
    kind: MediaKind,
}

/// Holds at most one active operation
#[derive(Debug, Clone, Default)]
pub(crate) struct OperationSlot {
    active: Arc<Mutex<Option<ActiveOperation>>>,
}

impl OperationSlot {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveOperation>> {
        // The slot is a plain Option, so a poisoned lock still holds a
        // consistent value
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Claims the slot for a new `kind` operation, or reports the one that
    /// already holds it.
    pub(crate) fn try_claim(&self, kind: MediaKind) -> Result<SlotGuard, MediaError> {
        let mut active = self.lock();
        if let Some(current) = *active {
            log::debug!(
                "Rejecting {} request, {} operation {} still active",
                kind,
                current.kind,
                current.id
            );
            return Err(MediaError::ConcurrentOperation(current.kind));
        }

        let id = Ulid::new();
        *active = Some(ActiveOperation { id, kind });
        Ok(SlotGuard {
            slot: self.clone(),
            id,
            kind,
        })
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.lock().is_some()
    }
}

/// Releases the slot when dropped
#[derive(Debug)]
pub(crate) struct SlotGuard {
    slot: OperationSlot,
    id: Ulid,
    kind: MediaKind,
}

impl SlotGuard {
    pub(crate) fn id(&self) -> Ulid {
        self.id
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut active = self.slot.lock();
        if active.map(|op| op.id) == Some(self.id) {
            *active = None;
            log::trace!("Released slot held by {} operation {}", self.kind, self.id);
        }
    }
}
