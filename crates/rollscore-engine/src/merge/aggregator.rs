use std::collections::HashMap;

use rollscore_core::errors::MergeConflict;
use rollscore_core::scorecard::{Scorecard, ScorecardKey};
use rollscore_core::types::ConflictPolicy;
use serde::Serialize;

/// Ordered scorecards with unique (repository, rollout date) keys.
///
/// Order is the insertion order of first-seen keys; superseding an entry
/// keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    entries: Vec<Scorecard>,
    index: HashMap<ScorecardKey, usize>,
}

/// How the caller settles one conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Overwrite,
    Skip,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from scorecards that must not collide with each other.
    pub fn from_scorecards(
        cards: impl IntoIterator<Item = Scorecard>,
    ) -> Result<Self, MergeConflict> {
        let mut dataset = Self::new();
        for card in cards {
            dataset.try_insert(card)?;
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Scorecard] {
        &self.entries
    }

    /// Append `card`, or hand back a conflict and leave the dataset untouched.
    pub fn try_insert(&mut self, card: Scorecard) -> Result<(), MergeConflict> {
        let key = card.key();
        if let Some(&i) = self.index.get(&key) {
            return Err(MergeConflict {
                key,
                existing: self.entries[i].clone(),
                incoming: card,
            });
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(card);
        Ok(())
    }

    /// Apply the caller's choice for a conflict raised by [`Dataset::try_insert`].
    pub fn resolve(&mut self, conflict: &MergeConflict, resolution: Resolution) {
        if resolution == Resolution::Skip {
            return;
        }
        match self.index.get(&conflict.key) {
            Some(&i) => self.entries[i] = conflict.incoming.clone(),
            None => {
                self.index.insert(conflict.key.clone(), self.entries.len());
                self.entries.push(conflict.incoming.clone());
            }
        }
    }
}

/// Result of a merge that did not abort. Every conflict is listed with how
/// it was settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutcome {
    #[serde(skip)]
    pub dataset: Dataset,
    pub added: usize,
    pub overwritten: Vec<MergeConflict>,
    pub skipped: Vec<MergeConflict>,
}

impl MergeOutcome {
    pub fn conflicts(&self) -> usize {
        self.overwritten.len() + self.skipped.len()
    }
}

/// Merge `incoming` into a copy of `base`, strictly in the order given.
///
/// With [`ConflictPolicy::Abort`] the first conflict is returned and nothing
/// is merged; use [`detect_conflicts`] to list them all.
pub fn merge(
    base: &Dataset,
    incoming: impl IntoIterator<Item = Scorecard>,
    policy: ConflictPolicy,
) -> Result<MergeOutcome, MergeConflict> {
    let mut outcome = MergeOutcome {
        dataset: base.clone(),
        added: 0,
        overwritten: Vec::new(),
        skipped: Vec::new(),
    };
    for card in incoming {
        let Err(conflict) = outcome.dataset.try_insert(card) else {
            outcome.added += 1;
            continue;
        };
        match policy {
            ConflictPolicy::Abort => return Err(conflict),
            ConflictPolicy::Skip => {
                outcome.dataset.resolve(&conflict, Resolution::Skip);
                outcome.skipped.push(conflict);
            }
            ConflictPolicy::Overwrite => {
                outcome.dataset.resolve(&conflict, Resolution::Overwrite);
                outcome.overwritten.push(conflict);
            }
        }
    }
    Ok(outcome)
}

/// Every conflict `incoming` would raise against `base`, in input order.
///
/// Collisions inside `incoming` count too; the first card seen for a key is
/// the one later cards are compared against.
pub fn detect_conflicts(
    base: &Dataset,
    incoming: impl IntoIterator<Item = Scorecard>,
) -> Vec<MergeConflict> {
    let mut scratch = base.clone();
    incoming
        .into_iter()
        .filter_map(|card| scratch.try_insert(card).err())
        .collect()
}
