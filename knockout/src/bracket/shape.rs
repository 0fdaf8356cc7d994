//! Bracket shape: power-of-two sizing and bye placement.

use std::collections::BTreeSet;

use super::errors::{BracketError, BracketResult};

/// Size of a round-1 bracket for `participants` entrants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BracketShape {
    /// Number of entrants
    pub participants: usize,
    /// Smallest power of two >= `participants`
    pub size: usize,
    /// Number of first-round slots (`size / 2`)
    pub slots: usize,
    /// Number of bye slots (`size - participants`)
    pub byes: usize,
}

impl BracketShape {
    /// Compute the shape for a field of `participants`.
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidInput` - fewer than two participants
    pub fn for_participants(participants: usize) -> BracketResult<Self> {
        if participants < 2 {
            return Err(BracketError::InvalidInput(format!(
                "at least 2 participants are required, got {participants}"
            )));
        }

        let size = participants.next_power_of_two();
        Ok(Self {
            participants,
            size,
            slots: size / 2,
            byes: size - participants,
        })
    }

    /// Number of rounds needed to produce a champion
    pub fn rounds(&self) -> u32 {
        self.size.trailing_zeros()
    }

    /// Whether the field fills the bracket exactly
    pub fn is_full(&self) -> bool {
        self.byes == 0
    }
}

/// Bye slot indices spread evenly over `[0, slots)`.
///
/// Index `i` is `round(i * slots / byes)`, computed in integers with halves
/// rounded up.
pub fn distributed_bye_slots(slots: usize, byes: usize) -> BTreeSet<usize> {
    let byes = byes.min(slots);
    // Steps are at least one slot wide and the last index stays below `slots`
    let selected: BTreeSet<usize> = (0..byes)
        .map(|i| (2 * i * slots + byes) / (2 * byes))
        .collect();
    debug_assert_eq!(selected.len(), byes);
    debug_assert!(selected.last().is_none_or(|&idx| idx < slots));

    selected
}

/// The last `byes` slot indices
pub fn concentrated_bye_slots(slots: usize, byes: usize) -> BTreeSet<usize> {
    (slots.saturating_sub(byes)..slots).collect()
}
