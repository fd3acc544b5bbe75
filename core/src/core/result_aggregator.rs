use log::warn;

use crate::core::ProbeOutcome;

/// Index-addressed result storage for one engine run.
///
/// Workers finish in any order; outcomes are placed in the slot matching
/// their input position and released strictly in input order once every
/// earlier slot is filled.
pub struct ResultAggregator {
    slots: Vec<Option<ProbeOutcome>>,
    released: usize,
}

impl ResultAggregator {
    pub fn new(total: usize) -> Self {
        Self {
            slots: vec![None; total],
            released: 0,
        }
    }

    /// Stores `outcome` at `index`. Out-of-range or repeated indices are
    /// dropped with a warning; the first value for a slot wins.
    pub fn insert(&mut self, index: usize, outcome: ProbeOutcome) {
        match self.slots.get_mut(index) {
            Some(slot @ None) => *slot = Some(outcome),
            Some(Some(_)) => warn!("duplicate result for input #{} ignored", index),
            None => warn!("result index {} out of range ({} targets)", index, self.slots.len()),
        }
    }

    /// Returns the next outcome in input order if its slot is filled.
    pub fn next_ready(&mut self) -> Option<&ProbeOutcome> {
        let outcome = self.slots.get(self.released)?.as_ref()?;
        self.released += 1;
        Some(outcome)
    }

    /// Fills every empty slot with `fallback(index)`.
    pub fn fill_missing(&mut self, mut fallback: impl FnMut(usize) -> ProbeOutcome) -> usize {
        let mut filled = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(fallback(index));
                filled += 1;
            }
        }
        filled
    }

    /// Number of outcomes handed out by `next_ready` so far.
    pub fn released(&self) -> usize {
        self.released
    }

    /// Consumes the aggregator. Slots still empty are skipped, so call
    /// `fill_missing` first to keep one outcome per target.
    pub fn into_outcomes(self) -> Vec<ProbeOutcome> {
        self.slots.into_iter().flatten().collect()
    }
}
