use std::ops::{Index, IndexMut};

use typed_index_collections::TiVec;

use crate::formula::Literal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClauseIdx(usize);

impl From<usize> for ClauseIdx {
    fn from(index: usize) -> Self {
        ClauseIdx(index)
    }
}

impl From<ClauseIdx> for usize {
    fn from(index: ClauseIdx) -> Self {
        index.0
    }
}

#[derive(Debug, Clone)]
pub struct StoredClause {
    literals: Vec<Literal>,
    redundant: bool,
    garbage: bool,
}

impl StoredClause {
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn literals_mut(&mut self) -> &mut Vec<Literal> {
        &mut self.literals
    }

    pub fn is_redundant(&self) -> bool {
        self.redundant
    }

    pub fn is_garbage(&self) -> bool {
        self.garbage
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }
}

/// Clause arena. Deleted clauses release their literals right away and keep
/// an empty slot until the next `compact`.
#[derive(Debug, Clone, Default)]
pub struct ClauseDb {
    clauses: TiVec<ClauseIdx, StoredClause>,
    irredundant: usize,
    redundant: usize,
    garbage: usize,
}

impl ClauseDb {
    pub fn push(&mut self, literals: Vec<Literal>, redundant: bool) -> ClauseIdx {
        if redundant {
            self.redundant += 1;
        } else {
            self.irredundant += 1;
        }
        self.clauses.push_and_get_key(StoredClause {
            literals,
            redundant,
            garbage: false,
        })
    }

    pub fn mark_garbage(&mut self, index: ClauseIdx) {
        let clause = &mut self.clauses[index];
        if clause.garbage {
            return;
        }
        clause.garbage = true;
        clause.literals = Vec::new();
        self.garbage += 1;
        if clause.redundant {
            self.redundant -= 1;
        } else {
            self.irredundant -= 1;
        }
    }

    /// Live clauses with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (ClauseIdx, &StoredClause)> + '_ {
        self.clauses
            .iter_enumerated()
            .filter(|(_, clause)| !clause.garbage)
    }

    pub fn indices(&self) -> Vec<ClauseIdx> {
        self.iter().map(|(index, _)| index).collect()
    }

    /// Drops the slots of deleted clauses. The result maps every old index
    /// to its new one, or to `None` if the clause was deleted.
    pub fn compact(&mut self) -> TiVec<ClauseIdx, Option<ClauseIdx>> {
        let mut remap = TiVec::with_capacity(self.clauses.len());
        let mut live = TiVec::with_capacity(self.clauses.len() - self.garbage);
        for clause in std::mem::take(&mut self.clauses) {
            if clause.garbage {
                remap.push(None);
            } else {
                remap.push(Some(live.push_and_get_key(clause)));
            }
        }
        self.clauses = live;
        self.garbage = 0;
        remap
    }

    pub fn garbage(&self) -> usize {
        self.garbage
    }

    /// Allocated slots, deleted ones included.
    pub fn slots(&self) -> usize {
        self.clauses.len()
    }

    pub fn irredundant(&self) -> usize {
        self.irredundant
    }

    pub fn redundant(&self) -> usize {
        self.redundant
    }
}

impl Index<ClauseIdx> for ClauseDb {
    type Output = StoredClause;

    fn index(&self, index: ClauseIdx) -> &Self::Output {
        &self.clauses[index]
    }
}

impl IndexMut<ClauseIdx> for ClauseDb {
    fn index_mut(&mut self, index: ClauseIdx) -> &mut Self::Output {
        &mut self.clauses[index]
    }
}

/// Two-watched-literal lists, indexed by the watched literal.
#[derive(Debug, Clone, Default)]
pub struct Watch {
    positive: Vec<Vec<ClauseIdx>>,
    negative: Vec<Vec<ClauseIdx>>,
}

impl Watch {
    pub fn grow(&mut self, num_variables: usize) {
        if num_variables > self.positive.len() {
            self.positive.resize_with(num_variables, Vec::new);
            self.negative.resize_with(num_variables, Vec::new);
        }
    }

    pub fn clear(&mut self) {
        for list in self.positive.iter_mut().chain(self.negative.iter_mut()) {
            list.clear();
        }
    }

    /// Rewrites every watched index after `ClauseDb::compact`, dropping deleted clauses.
    pub fn remap(&mut self, remap: &TiVec<ClauseIdx, Option<ClauseIdx>>) {
        for list in self.positive.iter_mut().chain(self.negative.iter_mut()) {
            *list = list.iter().filter_map(|&index| remap[index]).collect();
        }
    }

    pub fn attach(&mut self, index: ClauseIdx, clause: &[Literal]) {
        debug_assert!(clause.len() >= 2);
        self[clause[0]].push(index);
        self[clause[1]].push(index);
    }
}

impl Index<Literal> for Watch {
    type Output = Vec<ClauseIdx>;

    fn index(&self, literal: Literal) -> &Self::Output {
        let index = literal.variable().as_index();
        if literal.positive() {
            &self.positive[index]
        } else {
            &self.negative[index]
        }
    }
}

impl IndexMut<Literal> for Watch {
    fn index_mut(&mut self, literal: Literal) -> &mut Self::Output {
        let index = literal.variable().as_index();
        if literal.positive() {
            &mut self.positive[index]
        } else {
            &mut self.negative[index]
        }
    }
}
