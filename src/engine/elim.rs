/*!
Root-level simplification and bounded variable elimination.

Eliminating a variable replaces its irredundant clauses by their
non-tautological resolvents. The removed clauses go on the extension stack
with the literal of the eliminated variable they contain as witness, which
is enough to repair any model of the remaining formula.
*/

use std::collections::HashSet;

use crate::formula::{Literal, Variable};

use super::{clause_db::ClauseIdx, hooks::Hooks, state::Status, Engine, Witnessed};

/// Resolves two clauses on `pivot`. `None` if the resolvent is a tautology.
fn resolve(first: &[Literal], second: &[Literal], pivot: Variable) -> Option<Vec<Literal>> {
    let mut resolvent = first
        .iter()
        .copied()
        .filter(|literal| literal.variable() != pivot)
        .collect::<Vec<_>>();
    for &literal in second {
        if literal.variable() == pivot || resolvent.contains(&literal) {
            continue;
        }
        if resolvent.contains(&!literal) {
            return None;
        }
        resolvent.push(literal);
    }
    Some(resolvent)
}

impl Engine {
    pub(super) fn simplify_rounds(&mut self, rounds: usize, hooks: &mut Hooks<'_>) -> Status {
        for round in 0..rounds {
            if self.inconsistent {
                break;
            }
            if self.propagate().is_some() {
                self.derive_empty_clause(hooks);
                break;
            }
            if self.poll(hooks) {
                break;
            }
            self.collect_root_garbage();
            if self.inconsistent || !self.options.elim() {
                break;
            }
            let eliminated = self.eliminate(hooks);
            debug!(
                "simplification round {} eliminated {} variables",
                round + 1,
                eliminated
            );
            if eliminated == 0 {
                break;
            }
        }

        if !self.inconsistent && self.propagate().is_some() {
            self.derive_empty_clause(hooks);
        }
        if self.inconsistent {
            Status::Unsatisfiable
        } else {
            Status::Unsolved
        }
    }

    /// Removes satisfied clauses and falsified literals. Expects full propagation at level 0.
    fn collect_root_garbage(&mut self) {
        for index in self.clauses.indices() {
            let trail = &self.trail;
            let literals = self.clauses[index].literals();
            if literals.iter().any(|&literal| trail.value(literal) == Some(true)) {
                self.delete_clause(index);
                continue;
            }
            if !literals.iter().any(|&literal| trail.value(literal) == Some(false)) {
                continue;
            }

            let strengthened = literals
                .iter()
                .copied()
                .filter(|&literal| trail.value(literal).is_none())
                .collect::<Vec<_>>();
            let redundant = self.clauses[index].is_redundant();
            if let Some(proof) = self.proof.as_mut() {
                proof.add(&strengthened);
            }
            self.delete_clause(index);
            match strengthened.len() {
                0 => self.inconsistent = true,
                1 => match self.trail.value(strengthened[0]) {
                    Some(true) => {}
                    Some(false) => self.inconsistent = true,
                    None => self.trail.assign(strengthened[0], None),
                },
                _ => {
                    self.clauses.push(strengthened, redundant);
                }
            }
        }
        self.rebuild_watches();
    }

    fn rebuild_watches(&mut self) {
        self.compact_clauses();
        self.watch.clear();
        for index in self.clauses.indices() {
            let Engine {
                clauses,
                trail,
                watch,
                ..
            } = self;
            let literals = clauses[index].literals_mut();
            if literals.len() < 2 {
                continue;
            }
            literals.sort_by_key(|&literal| trail.value(literal) == Some(false));
            watch.attach(index, literals);
        }
    }

    /// Clauses of `list` that are live and of the requested kind.
    fn live_occurrences(&self, list: &[ClauseIdx], redundant: bool) -> Vec<ClauseIdx> {
        let mut live = list
            .iter()
            .copied()
            .filter(|&index| {
                let clause = &self.clauses[index];
                !clause.is_garbage() && clause.is_redundant() == redundant
            })
            .collect::<Vec<_>>();
        live.dedup();
        live
    }

    /// One elimination pass over the cheapest candidates. Returns how many were eliminated.
    fn eliminate(&mut self, hooks: &mut Hooks<'_>) -> usize {
        let num_variables = self.vars();
        let mut occurrences = vec![Vec::new(); 2 * num_variables];
        for (index, clause) in self.clauses.iter() {
            for literal in clause.literals() {
                occurrences[literal.index()].push(index);
            }
        }

        let assumed = self
            .assumptions
            .iter()
            .map(|literal| literal.variable())
            .collect::<HashSet<_>>();
        let limit = self.options.elim_occurrence_limit();
        let mut candidates = (0..num_variables)
            .filter_map(Variable::from_index)
            .filter(|&variable| {
                let index = variable.as_index();
                !self.eliminated[index]
                    && self.frozen[index] == 0
                    && self.trail.var_value(variable).is_none()
                    && !assumed.contains(&variable)
            })
            .map(|variable| {
                let positive = Literal::new(variable, true);
                let count =
                    occurrences[positive.index()].len() + occurrences[(!positive).index()].len();
                (count, variable)
            })
            .filter(|&(count, _)| count <= limit)
            .collect::<Vec<_>>();
        candidates.sort_unstable();

        let mut eliminated = 0;
        for (_, variable) in candidates {
            if self.inconsistent || self.poll(hooks) {
                break;
            }
            if self.trail.var_value(variable).is_some() {
                continue;
            }
            if self.try_eliminate(variable, &mut occurrences, hooks) {
                eliminated += 1;
            }
        }
        self.rebuild_watches();
        eliminated
    }

    fn try_eliminate(
        &mut self,
        variable: Variable,
        occurrences: &mut Vec<Vec<ClauseIdx>>,
        hooks: &mut Hooks<'_>,
    ) -> bool {
        let positive = Literal::new(variable, true);
        let negative = !positive;
        let positives = self.live_occurrences(&occurrences[positive.index()], false);
        let negatives = self.live_occurrences(&occurrences[negative.index()], false);
        let mut learned = self.live_occurrences(&occurrences[positive.index()], true);
        learned.extend(self.live_occurrences(&occurrences[negative.index()], true));

        let bound = positives.len() + negatives.len() + self.options.elim_bound();
        let clause_limit = self.options.elim_clause_limit();
        let mut resolvents = Vec::new();
        for &first in &positives {
            for &second in &negatives {
                let resolvent = resolve(
                    self.clauses[first].literals(),
                    self.clauses[second].literals(),
                    variable,
                );
                let mut resolvent = match resolvent {
                    Some(resolvent) => resolvent,
                    None => continue,
                };
                if resolvent
                    .iter()
                    .any(|&literal| self.trail.value(literal) == Some(true))
                {
                    continue;
                }
                let trail = &self.trail;
                resolvent.retain(|&literal| trail.value(literal) != Some(false));
                if resolvent.len() > clause_limit {
                    return false;
                }
                resolvents.push(resolvent);
                if resolvents.len() > bound {
                    return false;
                }
            }
        }

        trace!(
            "eliminating {} ({} resolvents replace {} clauses)",
            variable,
            resolvents.len(),
            positives.len() + negatives.len()
        );
        for resolvent in resolvents {
            match resolvent.len() {
                0 => self.derive_empty_clause(hooks),
                1 => {
                    if let Some(proof) = self.proof.as_mut() {
                        proof.add(&resolvent);
                    }
                    let unit = resolvent[0];
                    match self.trail.value(unit) {
                        Some(true) => {}
                        Some(false) => self.derive_empty_clause(hooks),
                        None => self.trail.assign(unit, None),
                    }
                }
                _ => {
                    if let Some(proof) = self.proof.as_mut() {
                        proof.add(&resolvent);
                    }
                    let index = self.clauses.push(resolvent, false);
                    for literal in self.clauses[index].literals() {
                        occurrences[literal.index()].push(index);
                    }
                }
            }
        }

        for (witness, list) in [(positive, &positives), (negative, &negatives)].iter() {
            for &index in list.iter() {
                self.extension.push(Witnessed {
                    witness: *witness,
                    clause: self.clauses[index].literals().to_vec(),
                });
            }
        }
        for index in positives.into_iter().chain(negatives).chain(learned) {
            self.delete_clause(index);
        }
        self.eliminated[variable.as_index()] = true;
        self.vsids.remove(variable);
        self.stats.eliminated += 1;
        true
    }

    /// Extends the current full assignment to the eliminated variables.
    pub(super) fn extend_model(&self) -> Vec<bool> {
        let mut model = self
            .trail
            .assignments()
            .iter()
            .map(|value| value.unwrap_or(false))
            .collect::<Vec<_>>();
        for entry in self.extension.iter().rev() {
            let satisfied = entry
                .clause
                .iter()
                .any(|literal| model[literal.variable().as_index()] == literal.positive());
            if !satisfied {
                model[entry.witness.variable().as_index()] = entry.witness.positive();
            }
        }
        model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lits(values: &[i32]) -> Vec<Literal> {
        values
            .iter()
            .map(|&value| Literal::from_dimacs(value).unwrap())
            .collect()
    }

    #[test]
    fn resolution() {
        let pivot = lits(&[1])[0].variable();
        assert_eq!(
            resolve(&lits(&[1, 2]), &lits(&[-1, 3, 2]), pivot),
            Some(lits(&[2, 3]))
        );
        assert_eq!(resolve(&lits(&[1, 2]), &lits(&[-1, -2]), pivot), None);
    }
}
