//! First-round seeding.
//!
//! Turns a participant ordering into candidate round-1 layouts. The seeder
//! enumerates options only; choosing one is up to the caller.

use std::collections::{BTreeSet, HashSet};

use super::{
    errors::{BracketError, BracketResult},
    models::{BracketSlot, FirstRoundPattern, Participant, PatternKind},
    shape::{BracketShape, concentrated_bye_slots, distributed_bye_slots},
};

/// Generate the candidate first-round patterns for `order`.
///
/// The ordering is consumed strictly left to right by every candidate, so
/// each participant lands in exactly one slot whichever candidate is chosen.
///
/// # Returns
///
/// * One `NoSeedBaseline` candidate when the field is a power of two
/// * `DistributedBye` and `ConcentratedBye` candidates otherwise
///
/// # Errors
///
/// * `BracketError::InvalidInput` - fewer than two participants, or a
///   participant listed twice
pub fn first_round_patterns(order: &[Participant]) -> BracketResult<Vec<FirstRoundPattern>> {
    let shape = BracketShape::for_participants(order.len())?;

    let mut seen = HashSet::with_capacity(order.len());
    if let Some(dup) = order.iter().find(|p| !seen.insert(p.id)) {
        return Err(BracketError::InvalidInput(format!(
            "participant {} is listed more than once",
            dup.id
        )));
    }

    if shape.is_full() {
        let slots = order
            .chunks_exact(2)
            .map(|pair| BracketSlot {
                player1: pair[0].clone(),
                player2: Some(pair[1].clone()),
            })
            .collect();

        return Ok(vec![FirstRoundPattern {
            kind: PatternKind::NoSeedBaseline,
            slots,
        }]);
    }

    let distributed = fill_slots(
        order,
        shape.slots,
        &distributed_bye_slots(shape.slots, shape.byes),
    )?;
    let concentrated = fill_slots(
        order,
        shape.slots,
        &concentrated_bye_slots(shape.slots, shape.byes),
    )?;

    log::debug!(
        "seeded {} participants into {} slots with {} byes",
        shape.participants,
        shape.slots,
        shape.byes
    );

    Ok(vec![
        FirstRoundPattern {
            kind: PatternKind::DistributedBye,
            slots: distributed,
        },
        FirstRoundPattern {
            kind: PatternKind::ConcentratedBye,
            slots: concentrated,
        },
    ])
}

/// Lay `order` into `slot_count` slots, one occupant for each bye slot and two
/// for every other.
fn fill_slots(
    order: &[Participant],
    slot_count: usize,
    bye_slots: &BTreeSet<usize>,
) -> BracketResult<Vec<BracketSlot>> {
    let mut remaining = order.iter().cloned();
    let mut next = |slot: usize| {
        remaining.next().ok_or_else(|| {
            BracketError::InconsistentBracket(format!("ran out of participants at slot {slot}"))
        })
    };

    let mut slots = Vec::with_capacity(slot_count);
    for idx in 0..slot_count {
        let player1 = next(idx)?;
        let player2 = if bye_slots.contains(&idx) {
            None
        } else {
            Some(next(idx)?)
        };
        slots.push(BracketSlot { player1, player2 });
    }

    let leftover = remaining.count();
    if leftover > 0 {
        return Err(BracketError::InconsistentBracket(format!(
            "{leftover} participant(s) left without a slot"
        )));
    }

    Ok(slots)
}
