//! The packed per-handle status bitfield (§9 "Packed status bitfield").
//!
//! A single `AtomicU32` encodes the open flag plus, per derivative, a
//! `lock` bit (a producer is in flight) and a `has` bit (a value has been
//! published). The two IR derivatives additionally carry an `outdated` bit,
//! unused by this store (no incremental re-derivation is implemented) but
//! kept so the bit layout matches the spec and is available to a future
//! incremental pass.
//!
//! Bit-set/bit-reset operations return the previous value, which doubles as
//! a compare-and-swap for claiming production: if the previous value of the
//! lock bit was already `1`, some other thread holds the claim.

use std::sync::atomic::{AtomicU32, Ordering};

/// Which derived artifact a bit-pair refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Derivative {
    Scope,
    IrSource,
    IrData,
}

const OPEN: u32 = 1 << 0;

const SCOPE_LOCK: u32 = 1 << 1;
const SCOPE_HAS: u32 = 1 << 2;

const IR_SOURCE_LOCK: u32 = 1 << 3;
const IR_SOURCE_HAS: u32 = 1 << 4;
const IR_SOURCE_OUTDATED: u32 = 1 << 5;

const IR_DATA_LOCK: u32 = 1 << 6;
const IR_DATA_HAS: u32 = 1 << 7;
const IR_DATA_OUTDATED: u32 = 1 << 8;

fn lock_bit(d: Derivative) -> u32 {
    match d {
        Derivative::Scope => SCOPE_LOCK,
        Derivative::IrSource => IR_SOURCE_LOCK,
        Derivative::IrData => IR_DATA_LOCK,
    }
}

fn has_bit(d: Derivative) -> u32 {
    match d {
        Derivative::Scope => SCOPE_HAS,
        Derivative::IrSource => IR_SOURCE_HAS,
        Derivative::IrData => IR_DATA_HAS,
    }
}

fn outdated_bit(d: Derivative) -> Option<u32> {
    match d {
        Derivative::Scope => None,
        Derivative::IrSource => Some(IR_SOURCE_OUTDATED),
        Derivative::IrData => Some(IR_DATA_OUTDATED),
    }
}

/// Reported status of one derivative, per §6's `{none, outdated, done}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DerivativeStatus {
    None,
    Outdated,
    Done,
}

pub struct Status(AtomicU32);

impl Status {
    pub fn new(open: bool) -> Self {
        Self(AtomicU32::new(if open { OPEN } else { 0 }))
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire) & OPEN != 0
    }

    /// Sets the open flag, returning the prior value.
    pub fn set_open(&self, open: bool) -> bool {
        let prev = if open {
            self.0.fetch_or(OPEN, Ordering::AcqRel)
        } else {
            self.0.fetch_and(!OPEN, Ordering::AcqRel)
        };
        prev & OPEN != 0
    }

    pub fn has(&self, d: Derivative) -> bool {
        self.0.load(Ordering::Acquire) & has_bit(d) != 0
    }

    pub fn status(&self, d: Derivative) -> DerivativeStatus {
        let bits = self.0.load(Ordering::Acquire);
        if bits & has_bit(d) != 0 {
            if let Some(outdated) = outdated_bit(d) {
                if bits & outdated != 0 {
                    return DerivativeStatus::Outdated;
                }
            }
            DerivativeStatus::Done
        } else {
            DerivativeStatus::None
        }
    }

    /// Attempts to claim the production lock for `d`. Returns `true` if the
    /// calling thread now owns the claim (no other thread was producing).
    pub fn try_claim(&self, d: Derivative) -> bool {
        let prev = self.0.fetch_or(lock_bit(d), Ordering::AcqRel);
        prev & lock_bit(d) == 0
    }

    /// Publishes a freshly produced value for `d`: sets `has`, clears
    /// `lock` and `outdated`, with release ordering so a subsequent acquire
    /// load of `has` observes the fully initialized slot.
    pub fn publish(&self, d: Derivative) {
        let mut clear = lock_bit(d);
        if let Some(outdated) = outdated_bit(d) {
            clear |= outdated;
        }
        self.0.fetch_and(!clear, Ordering::AcqRel);
        self.0.fetch_or(has_bit(d), Ordering::Release);
    }

    /// Clears every derivative bit while preserving `open`, used by the
    /// edit path (`setSource`) to invalidate all derivatives atomically.
    pub fn reset_derivatives_preserving_open(&self) {
        let prior = self.0.load(Ordering::Acquire);
        let open = prior & OPEN;
        self.0.store(open, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_is_exclusive() {
        let status = Status::new(true);
        assert!(status.try_claim(Derivative::Scope));
        assert!(!status.try_claim(Derivative::Scope));
    }

    #[test]
    fn publish_sets_has_and_clears_lock() {
        let status = Status::new(false);
        assert!(status.try_claim(Derivative::IrSource));
        status.publish(Derivative::IrSource);
        assert!(status.has(Derivative::IrSource));
        assert_eq!(status.status(Derivative::IrSource), DerivativeStatus::Done);
        // lock is free again, a later setSource could reclaim it
        assert!(status.try_claim(Derivative::IrSource));
    }

    #[test]
    fn reset_preserves_open_clears_has() {
        let status = Status::new(true);
        status.try_claim(Derivative::Scope);
        status.publish(Derivative::Scope);
        status.reset_derivatives_preserving_open();
        assert!(status.is_open());
        assert!(!status.has(Derivative::Scope));
    }
}
