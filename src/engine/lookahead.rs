use crate::formula::{Literal, Variable};

use super::{hooks::Hooks, state::Status, Cubes, Engine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Outcome {
    /// The literal to branch on next.
    Split(Literal),
    /// Every active variable is assigned without conflict.
    Satisfied,
    Refuted,
    Interrupted,
}

impl Engine {
    /// Assigns `literal` on a fresh level, propagates and undoes it.
    /// Returns the number of implied literals, or `None` on conflict.
    fn probe(&mut self, literal: Literal) -> Option<usize> {
        self.stats.probes += 1;
        let level = self.trail.decision_level();
        let before = self.trail.literals().len();
        self.trail.new_level();
        self.trail.assign(literal, None);
        let conflict = self.propagate();
        let implied = self.trail.literals().len() - before;
        self.backtrack(level);
        match conflict {
            Some(_) => None,
            None => Some(implied),
        }
    }

    /// Fixes the negation of a literal whose probe failed. Returns `true` on conflict.
    fn fix_failed_literal(&mut self, failed: Literal, hooks: &mut Hooks<'_>) -> bool {
        let implied = !failed;
        trace!("failed literal {}, fixing {}", failed, implied);
        if self.trail.decision_level() == 0 {
            if let Some(proof) = self.proof.as_mut() {
                proof.add(&[implied]);
            }
        }
        self.trail.assign(implied, None);
        if self.propagate().is_some() {
            if self.trail.decision_level() == 0 {
                self.derive_empty_clause(hooks);
            }
            return true;
        }
        false
    }

    /// Scores every active variable under `cube` by the product of the
    /// propagations of both polarities. Failed literals are fixed on the way.
    pub(super) fn look_ahead(
        &mut self,
        cube: &[Literal],
        hooks: &mut Hooks<'_>,
        poll: bool,
    ) -> Outcome {
        self.backtrack(0);
        if self.inconsistent {
            return Outcome::Refuted;
        }
        if self.propagate().is_some() {
            self.derive_empty_clause(hooks);
            return Outcome::Refuted;
        }
        let outcome = self.look_ahead_under(cube, hooks, poll);
        self.backtrack(0);
        outcome
    }

    fn look_ahead_under(&mut self, cube: &[Literal], hooks: &mut Hooks<'_>, poll: bool) -> Outcome {
        for &literal in cube {
            match self.trail.value(literal) {
                Some(true) => {}
                Some(false) => return Outcome::Refuted,
                None => {
                    self.trail.new_level();
                    self.trail.assign(literal, None);
                    if self.propagate().is_some() {
                        return Outcome::Refuted;
                    }
                }
            }
        }

        loop {
            let mut best: Option<(u64, Literal)> = None;
            let mut forced = false;

            for index in 0..self.vars() {
                let variable = match Variable::from_index(index) {
                    Some(variable) => variable,
                    None => break,
                };
                if self.eliminated[index] || self.trail.var_value(variable).is_some() {
                    continue;
                }
                if poll && self.poll(hooks) {
                    return Outcome::Interrupted;
                }

                let positive = Literal::new(variable, true);
                match (self.probe(positive), self.probe(!positive)) {
                    (None, None) => {
                        if self.trail.decision_level() == 0 {
                            self.derive_empty_clause(hooks);
                        }
                        return Outcome::Refuted;
                    }
                    (None, Some(_)) => {
                        if self.fix_failed_literal(positive, hooks) {
                            return Outcome::Refuted;
                        }
                        forced = true;
                    }
                    (Some(_), None) => {
                        if self.fix_failed_literal(!positive, hooks) {
                            return Outcome::Refuted;
                        }
                        forced = true;
                    }
                    (Some(positives), Some(negatives)) => {
                        let score = (positives as u64 + 1) * (negatives as u64 + 1);
                        let literal = if positives >= negatives {
                            positive
                        } else {
                            !positive
                        };
                        if best.map_or(true, |(top, _)| score > top) {
                            best = Some((score, literal));
                        }
                    }
                }
            }

            if forced {
                continue;
            }
            return match best {
                Some((_, literal)) => Outcome::Split(literal),
                None => Outcome::Satisfied,
            };
        }
    }

    /// Breadth-first splitting on lookahead literals. Termination is only
    /// checked between depth levels.
    pub(super) fn split_cubes(&mut self, depth: usize, hooks: &mut Hooks<'_>) -> Cubes {
        let base = self.assumptions.clone();
        let mut frontier: Vec<Vec<Literal>> = vec![Vec::new()];
        let mut satisfiable = false;

        for level in 0..depth {
            if self.poll(hooks) {
                debug!("cube generation stopped at depth {}", level);
                break;
            }
            let mut next = Vec::new();
            for cube in frontier {
                let full = base.iter().chain(&cube).copied().collect::<Vec<_>>();
                match self.look_ahead(&full, hooks, false) {
                    Outcome::Split(literal) => {
                        for &branch in &[literal, !literal] {
                            let mut extended = cube.clone();
                            extended.push(branch);
                            next.push(extended);
                        }
                    }
                    Outcome::Refuted => trace!("cube {:?} refuted", super::to_dimacs(&cube)),
                    Outcome::Satisfied => {
                        satisfiable = true;
                        next.push(cube);
                    }
                    Outcome::Interrupted => next.push(cube),
                }
            }
            frontier = next;
            if frontier.is_empty() || satisfiable {
                break;
            }
        }

        let status = if frontier.is_empty() {
            Status::Unsatisfiable
        } else if satisfiable {
            Status::Satisfiable
        } else {
            Status::Unsolved
        };
        Cubes {
            status,
            cubes: frontier.iter().map(|cube| super::to_dimacs(cube)).collect(),
        }
    }
}
