use crate::formula::{Literal, Variable};

use typed_index_collections::TiVec;

use super::clause_db::ClauseIdx;

/// Assignment stack with decision levels and reasons.
///
/// Level 0 holds the root-level (fixed) assignments. Every public engine call
/// returns with the trail backtracked to level 0.
#[derive(Debug, Clone, Default)]
pub struct Trail {
    values: Vec<Option<bool>>,
    levels: Vec<usize>,
    reasons: Vec<Option<ClauseIdx>>,
    literals: Vec<Literal>,
    /// Trail length at the start of each decision level.
    control: Vec<usize>,
    /// Next literal to propagate.
    head: usize,
}

impl Trail {
    pub fn grow(&mut self, num_variables: usize) {
        if num_variables > self.values.len() {
            self.values.resize(num_variables, None);
            self.levels.resize(num_variables, 0);
            self.reasons.resize(num_variables, None);
        }
    }

    pub fn num_variables(&self) -> usize {
        self.values.len()
    }

    pub fn value(&self, literal: Literal) -> Option<bool> {
        literal.partial_value(&self.values)
    }

    pub fn var_value(&self, variable: Variable) -> Option<bool> {
        self.values[variable.as_index()]
    }

    pub fn assignments(&self) -> &[Option<bool>] {
        &self.values
    }

    pub fn level(&self, variable: Variable) -> usize {
        self.levels[variable.as_index()]
    }

    pub fn reason(&self, variable: Variable) -> Option<ClauseIdx> {
        self.reasons[variable.as_index()]
    }

    /// Follows a clause arena compaction. Reasons of deleted clauses become `None`.
    pub fn remap_reasons(&mut self, remap: &TiVec<ClauseIdx, Option<ClauseIdx>>) {
        for reason in self.reasons.iter_mut() {
            *reason = reason.and_then(|index| remap[index]);
        }
    }

    /// Whether the variable is assigned at the root level.
    pub fn is_fixed(&self, variable: Variable) -> bool {
        self.var_value(variable).is_some() && self.level(variable) == 0
    }

    pub fn decision_level(&self) -> usize {
        self.control.len()
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn new_level(&mut self) {
        self.control.push(self.literals.len());
    }

    pub fn assign(&mut self, literal: Literal, reason: Option<ClauseIdx>) {
        let index = literal.variable().as_index();
        debug_assert!(self.values[index].is_none());
        self.values[index] = Some(literal.positive());
        self.levels[index] = self.decision_level();
        self.reasons[index] = reason;
        self.literals.push(literal);
    }

    /// Returns the next assigned literal whose consequences are not propagated yet.
    pub fn next_pending(&mut self) -> Option<Literal> {
        let literal = self.literals.get(self.head).copied()?;
        self.head += 1;
        Some(literal)
    }

    /// Marks every assigned literal as propagated, used after a conflict.
    pub fn skip_pending(&mut self) {
        self.head = self.literals.len();
    }

    /// Unassigns everything above `level`, reporting each unassigned literal.
    pub fn backtrack(&mut self, level: usize, mut on_unassign: impl FnMut(Literal)) {
        if level >= self.decision_level() {
            return;
        }
        let start = self.control[level];
        for literal in self.literals.drain(start..).rev() {
            let index = literal.variable().as_index();
            self.values[index] = None;
            self.reasons[index] = None;
            on_unassign(literal);
        }
        self.control.truncate(level);
        self.head = self.head.min(start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(value: i32) -> Literal {
        Literal::from_dimacs(value).unwrap()
    }

    #[test]
    fn backtrack_unassigns_levels() {
        let mut trail = Trail::default();
        trail.grow(3);
        trail.assign(literal(1), None);
        trail.new_level();
        trail.assign(literal(-2), None);
        trail.new_level();
        trail.assign(literal(3), None);
        assert_eq!(trail.decision_level(), 2);
        assert_eq!(trail.level(literal(3).variable()), 2);

        let mut unassigned = Vec::new();
        trail.backtrack(0, |literal| unassigned.push(literal.to_dimacs()));
        assert_eq!(unassigned, vec![3, -2]);
        assert_eq!(trail.decision_level(), 0);
        assert_eq!(trail.value(literal(1)), Some(true));
        assert_eq!(trail.value(literal(2)), None);
        assert!(trail.is_fixed(literal(1).variable()));
    }

    #[test]
    fn pending_literals_are_consumed_once() {
        let mut trail = Trail::default();
        trail.grow(2);
        trail.assign(literal(1), None);
        trail.assign(literal(2), None);
        assert_eq!(trail.next_pending(), Some(literal(1)));
        trail.skip_pending();
        assert_eq!(trail.next_pending(), None);
    }
}
