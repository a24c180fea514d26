use crate::formula::{Literal, Variable};

use super::{
    clause_db::{ClauseDb, ClauseIdx},
    conflict::ConflictDataProvider,
    hooks::Hooks,
    state::Status,
    trail::Trail,
    Engine,
};

/// Reluctant doubling sequence 1, 1, 2, 1, 1, 2, 4, ...
#[derive(Debug, Clone)]
pub(super) struct Luby {
    u: u64,
    v: u64,
}

impl Default for Luby {
    fn default() -> Self {
        Luby { u: 1, v: 1 }
    }
}

impl Luby {
    pub fn next(&mut self) -> u64 {
        let value = self.v;
        if self.u & self.u.wrapping_neg() == self.v {
            self.u += 1;
            self.v = 1;
        } else {
            self.v *= 2;
        }
        value
    }
}

/// When the next restart and reduction happen.
#[derive(Debug, Clone, Default)]
pub(super) struct Schedule {
    luby: Luby,
    restart_limit: u64,
    since_restart: u64,
    next_reduce: u64,
}

struct Reasons<'a> {
    trail: &'a Trail,
    clauses: &'a ClauseDb,
}

impl ConflictDataProvider for Reasons<'_> {
    fn value(&self, variable: Variable) -> bool {
        self.trail.var_value(variable).unwrap_or(false)
    }

    fn level(&self, variable: Variable) -> usize {
        self.trail.level(variable)
    }

    fn antecedents(&self, variable: Variable) -> Option<&[Literal]> {
        self.trail
            .reason(variable)
            .map(|index| self.clauses[index].literals())
    }
}

fn reached(limit: Option<u64>, spent: u64) -> bool {
    limit.map_or(false, |limit| spent >= limit)
}

impl Engine {
    /// Propagates every pending assignment. Returns a falsified clause, if any.
    pub(super) fn propagate(&mut self) -> Option<ClauseIdx> {
        while let Some(literal) = self.trail.next_pending() {
            self.stats.propagations += 1;
            let falsified = !literal;
            let mut watchers = std::mem::take(&mut self.watch[falsified]);
            let mut kept = 0;
            let mut index = 0;
            let mut conflict = None;

            while index < watchers.len() {
                let clause_idx = watchers[index];
                index += 1;

                let clause = &mut self.clauses[clause_idx];
                if clause.is_garbage() {
                    continue;
                }
                let literals = clause.literals_mut();
                if literals[0] == falsified {
                    literals.swap(0, 1);
                }
                let first = literals[0];
                if self.trail.value(first) == Some(true) {
                    watchers[kept] = clause_idx;
                    kept += 1;
                    continue;
                }

                let mut replacement = None;
                for position in 2..literals.len() {
                    if self.trail.value(literals[position]) != Some(false) {
                        replacement = Some(position);
                        break;
                    }
                }
                if let Some(position) = replacement {
                    literals.swap(1, position);
                    let watched = literals[1];
                    self.watch[watched].push(clause_idx);
                    continue;
                }

                watchers[kept] = clause_idx;
                kept += 1;
                if self.trail.value(first) == Some(false) {
                    conflict = Some(clause_idx);
                    while index < watchers.len() {
                        watchers[kept] = watchers[index];
                        kept += 1;
                        index += 1;
                    }
                } else {
                    self.trail.assign(first, Some(clause_idx));
                }
            }

            watchers.truncate(kept);
            let added = std::mem::replace(&mut self.watch[falsified], watchers);
            self.watch[falsified].extend(added);

            if conflict.is_some() {
                self.trail.skip_pending();
                return conflict;
            }
        }
        None
    }

    pub(super) fn derive_empty_clause(&mut self, hooks: &mut Hooks<'_>) {
        if self.inconsistent {
            return;
        }
        debug!("derived the empty clause");
        self.inconsistent = true;
        if let Some(proof) = self.proof.as_mut() {
            proof.add(&[]);
        }
        hooks.export(&[]);
    }

    /// CDCL search under the pending assumptions, honoring limits and termination.
    pub(super) fn search(&mut self, hooks: &mut Hooks<'_>) -> Status {
        if self.inconsistent {
            return Status::Unsatisfiable;
        }
        if self.poll(hooks) {
            return Status::Unsolved;
        }

        let conflicts = self.stats.conflicts;
        let decisions = self.stats.decisions;
        if self.schedule.restart_limit == 0 {
            self.schedule.restart_limit = self.schedule.luby.next() * self.options.restart_interval();
        }
        if self.schedule.next_reduce == 0 {
            self.schedule.next_reduce = self.stats.conflicts + self.options.reduce_interval();
        }

        loop {
            if let Some(conflict) = self.propagate() {
                self.stats.conflicts += 1;
                if self.trail.decision_level() == 0 {
                    self.derive_empty_clause(hooks);
                    return Status::Unsatisfiable;
                }
                self.learn(conflict, hooks);
                if self.poll(hooks) {
                    return Status::Unsolved;
                }
                if reached(self.limits.conflicts, self.stats.conflicts - conflicts) {
                    debug!("conflict limit reached");
                    return Status::Unsolved;
                }
                continue;
            }

            if self.restart_due() {
                self.restart();
                continue;
            }
            if self.options.reduce() && self.stats.conflicts >= self.schedule.next_reduce {
                self.reduce();
            }

            let level = self.trail.decision_level();
            if level < self.assumptions.len() {
                let assumption = self.assumptions[level];
                match self.trail.value(assumption) {
                    Some(true) => self.trail.new_level(),
                    Some(false) => {
                        self.analyze_assumptions(assumption);
                        return Status::Unsatisfiable;
                    }
                    None => {
                        self.trail.new_level();
                        self.trail.assign(assumption, None);
                    }
                }
                continue;
            }

            if self.poll(hooks) {
                return Status::Unsolved;
            }
            if reached(self.limits.decisions, self.stats.decisions - decisions) {
                debug!("decision limit reached");
                return Status::Unsolved;
            }
            match self.pick_branch() {
                Some(literal) => {
                    self.stats.decisions += 1;
                    self.trail.new_level();
                    self.trail.assign(literal, None);
                }
                None => return Status::Satisfiable,
            }
        }
    }

    fn learn(&mut self, conflict: ClauseIdx, hooks: &mut Hooks<'_>) {
        let level = self.trail.decision_level();
        let learned = {
            let provider = Reasons {
                trail: &self.trail,
                clauses: &self.clauses,
            };
            self.analyzer.analyze(
                &provider,
                level,
                self.clauses[conflict].literals(),
                self.trail.literals(),
            )
        };
        trace!("learned {:?}", super::to_dimacs(&learned.literals));

        self.vsids.learn_clause(&learned.literals);
        self.vsids.decay();
        if let Some(proof) = self.proof.as_mut() {
            proof.add(&learned.literals);
        }
        hooks.export(&learned.literals);
        self.stats.learned += 1;
        self.schedule.since_restart += 1;

        self.backtrack(learned.backjump);
        let asserting = learned.literals[0];
        if learned.literals.len() == 1 {
            self.trail.assign(asserting, None);
        } else {
            let index = self.clauses.push(learned.literals, true);
            self.watch.attach(index, self.clauses[index].literals());
            self.trail.assign(asserting, Some(index));
        }
    }

    fn analyze_assumptions(&mut self, falsified: Literal) {
        let provider = Reasons {
            trail: &self.trail,
            clauses: &self.clauses,
        };
        let failed = self
            .analyzer
            .failed_assumptions(&provider, falsified, self.trail.literals());
        debug!("{} assumptions failed", failed.len());
        self.failed = failed.into_iter().collect();
    }

    fn pick_branch(&mut self) -> Option<Literal> {
        while let Some(variable) = self.vsids.top() {
            let index = variable.as_index();
            if self.trail.var_value(variable).is_none() && !self.eliminated[index] {
                let positive = self.user_phases[index]
                    .or(self.saved_phases[index])
                    .unwrap_or_else(|| self.options.phase());
                return Some(Literal::new(variable, positive));
            }
            self.vsids.remove(variable);
        }
        None
    }

    fn restart_due(&self) -> bool {
        self.options.restart()
            && self.trail.decision_level() > self.assumptions.len()
            && self.schedule.since_restart >= self.schedule.restart_limit
    }

    fn restart(&mut self) {
        self.stats.restarts += 1;
        self.schedule.since_restart = 0;
        self.schedule.restart_limit = self.schedule.luby.next() * self.options.restart_interval();
        trace!("restart #{}", self.stats.restarts);
        self.backtrack(self.assumptions.len());
    }

    /// Deletes the longer half of the learned clauses that are not reasons.
    fn reduce(&mut self) {
        self.stats.reductions += 1;
        self.schedule.next_reduce =
            self.stats.conflicts + self.options.reduce_interval() * (self.stats.reductions + 1);

        let trail = &self.trail;
        let mut candidates = self
            .clauses
            .iter()
            .filter(|(_, clause)| clause.is_redundant() && clause.len() > 2)
            .filter(|(index, clause)| {
                let first = clause.literals()[0];
                !(trail.value(first) == Some(true) && trail.reason(first.variable()) == Some(*index))
            })
            .map(|(index, clause)| (clause.len(), index))
            .collect::<Vec<_>>();
        candidates.sort_unstable_by(|a, b| b.cmp(a));

        let count = candidates.len() / 2;
        for &(_, index) in &candidates[..count] {
            self.delete_clause(index);
        }
        self.compact_clauses();
        debug!(
            "reduced {} learned clauses, {} remain",
            count,
            self.clauses.redundant()
        );
    }
}
