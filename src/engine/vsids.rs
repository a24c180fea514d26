use std::{cmp::Ordering, collections::BTreeSet};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::formula::{Literal, Variable};

#[derive(Debug, Clone, Copy)]
struct VecEntry {
    score: f64,
    nonce: f64,
}

impl VecEntry {
    /// Update the score by delta, change the nonce, and return the updated score.
    pub fn update(&mut self, delta: f64, nonce: f64) -> f64 {
        self.score += delta;
        self.nonce = nonce;
        self.score
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
struct SetEntry {
    variable: Variable,
    score: f64,
    nonce: f64,
}

impl SetEntry {
    pub fn from_vec_entry(variable: Variable, vec_entry: VecEntry) -> Self {
        SetEntry {
            variable,
            score: vec_entry.score,
            nonce: vec_entry.nonce,
        }
    }
}

impl Eq for SetEntry {}

impl PartialOrd for SetEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SetEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        let ordering = self
            .score
            .partial_cmp(&other.score)
            .expect("NaN in heap entry");
        if ordering != Ordering::Equal {
            return ordering;
        }

        let ordering = self
            .nonce
            .partial_cmp(&other.nonce)
            .expect("NaN in heap entry");
        if ordering != Ordering::Equal {
            return ordering;
        }

        self.variable.cmp(&other.variable)
    }
}

/// Variable State Independent Decaying Sum (VSIDS) heuristic.
/// Based on MiniSAT implementation.
///
/// The set only holds decision candidates. Assigned variables are removed
/// lazily by the caller when they show up at the top.
#[derive(Debug, Clone)]
pub struct VsidsScoring {
    rng: StdRng,
    current_rate: f64,
    scores: Vec<VecEntry>,
    btree: BTreeSet<SetEntry>,
}

impl VsidsScoring {
    const DECAY_RATE: f64 = 0.95;
    const REBALANCE_THRESHOLD: f64 = 1e100;

    pub fn new(seed: u64) -> Self {
        VsidsScoring {
            rng: StdRng::seed_from_u64(seed),
            current_rate: 1.0,
            scores: Vec::new(),
            btree: BTreeSet::new(),
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Registers new variables as decision candidates.
    pub fn grow(&mut self, num_variables: usize) {
        for index in self.scores.len()..num_variables {
            let entry = VecEntry {
                score: 0.0,
                nonce: self.rng.gen(),
            };
            self.scores.push(entry);
            if let Some(variable) = Variable::from_index(index) {
                self.btree.insert(SetEntry::from_vec_entry(variable, entry));
            }
        }
    }

    fn bump_score(&mut self, variable: Variable) {
        let present = self.btree.remove(&self.set_entry(variable));

        let nonce = self.rng.gen();
        let new_score = self.scores[variable.as_index()].update(self.current_rate, nonce);

        if present {
            self.btree.insert(self.set_entry(variable));
        }

        if new_score >= Self::REBALANCE_THRESHOLD {
            self.rebalance();
        }
    }

    fn rebalance(&mut self) {
        self.current_rate /= Self::REBALANCE_THRESHOLD;
        let entries = std::mem::take(&mut self.btree);
        for entry in self.scores.iter_mut() {
            entry.score /= Self::REBALANCE_THRESHOLD;
        }
        for entry in entries {
            self.btree.insert(self.set_entry(entry.variable));
        }
    }

    fn set_entry(&self, variable: Variable) -> SetEntry {
        SetEntry::from_vec_entry(variable, self.scores[variable.as_index()])
    }

    pub fn insert(&mut self, variable: Variable) {
        self.btree.insert(self.set_entry(variable));
    }

    pub fn remove(&mut self, variable: Variable) {
        self.btree.remove(&self.set_entry(variable));
    }

    /// The candidate with the highest score.
    pub fn top(&self) -> Option<Variable> {
        self.btree.iter().next_back().map(|entry| entry.variable)
    }

    pub fn decay(&mut self) {
        self.current_rate /= Self::DECAY_RATE;
    }

    pub fn learn_clause(&mut self, clause: &[Literal]) {
        for literal in clause {
            self.bump_score(literal.variable());
        }
    }
}
