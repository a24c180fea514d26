use crate::formula::{Literal, Variable};

pub trait ConflictDataProvider {
    /// Returns the current value assigned to a variable.
    fn value(&self, variable: Variable) -> bool;

    /// Returns the decision level of a variable.
    fn level(&self, variable: Variable) -> usize;

    /// Returns antecedents of a variable.
    /// `None` if the variable is a decision variable.
    fn antecedents(&self, variable: Variable) -> Option<&[Literal]>;
}

/// A clause derived by conflict analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Learned {
    /// The asserting literal comes first, the literal with the highest remaining level second.
    pub literals: Vec<Literal>,
    /// Level to backtrack to before asserting the first literal.
    pub backjump: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ConflictAnalyzer {
    /// Bitmap to check if each variable is previously seen.
    seen: Vec<bool>,
    /// A queue that records seen variables.
    seen_queue: Vec<Variable>,
    /// A clause to learn
    recorded: Vec<Literal>,
    /// Unresolved variables on the current level
    unresolved_on_current_level: usize,
}

impl ConflictAnalyzer {
    pub fn grow(&mut self, num_variables: usize) {
        if num_variables > self.seen.len() {
            self.seen.resize(num_variables, false);
        }
    }

    fn clear_seen(&mut self) {
        for &var in &self.seen_queue {
            self.seen[var.as_index()] = false;
        }
        self.seen_queue.clear();
    }

    fn finalize<P>(&mut self, data_provider: &P, uip: Literal) -> Learned
    where
        P: ConflictDataProvider,
    {
        self.clear_seen();
        self.unresolved_on_current_level = 0;

        let mut literals = Vec::with_capacity(self.recorded.len() + 1);
        literals.push(uip);
        literals.append(&mut self.recorded);

        let mut backjump = 0;
        for position in 1..literals.len() {
            let level = data_provider.level(literals[position].variable());
            if level > backjump {
                backjump = level;
                literals.swap(1, position);
            }
        }

        Learned { literals, backjump }
    }

    /// Mark the variable, return true if the variable is previously unseen.
    fn mark_if_unseen(&mut self, variable: Variable) -> bool {
        if self.seen[variable.as_index()] {
            false
        } else {
            self.seen[variable.as_index()] = true;
            self.seen_queue.push(variable);
            true
        }
    }

    fn add_clause<P>(&mut self, current_level: usize, data_provider: &P, clause: &[Literal])
    where
        P: ConflictDataProvider,
    {
        for &literal in clause {
            if self.mark_if_unseen(literal.variable()) {
                let literal_level = data_provider.level(literal.variable());
                if literal_level == current_level {
                    self.unresolved_on_current_level += 1;
                } else if literal_level != 0 {
                    self.recorded.push(literal);
                }
            }
        }
    }

    /// First-UIP analysis of a clause falsified at `current_level`.
    pub fn analyze<P>(
        &mut self,
        data_provider: &P,
        current_level: usize,
        conflicting_clause: &[Literal],
        literals: &[Literal],
    ) -> Learned
    where
        P: ConflictDataProvider,
    {
        self.add_clause(current_level, data_provider, conflicting_clause);

        for literal in literals.iter().rev().copied() {
            let variable = literal.variable();
            if self.seen[variable.as_index()] {
                self.unresolved_on_current_level -= 1;
                if self.unresolved_on_current_level == 0 {
                    // First UIP reached
                    let uip = Literal::new(variable, !data_provider.value(variable));
                    return self.finalize(data_provider, uip);
                }

                // If this was not UIP, mark its antecedents
                let antecedents = data_provider.antecedents(variable).unwrap();
                self.add_clause(current_level, data_provider, antecedents);
            }
        }

        // Decision variable is guaranteed to be UIP
        unreachable!()
    }

    /// Collects the assumptions responsible for falsifying `falsified`.
    ///
    /// Decisions below the current level are exactly the assumptions, so the
    /// result is the falsified assumption plus every decision it depends on.
    pub fn failed_assumptions<P>(
        &mut self,
        data_provider: &P,
        falsified: Literal,
        literals: &[Literal],
    ) -> Vec<Literal>
    where
        P: ConflictDataProvider,
    {
        let mut failed = vec![falsified];
        if data_provider.level(falsified.variable()) == 0 {
            return failed;
        }

        self.mark_if_unseen(falsified.variable());
        for &literal in literals.iter().rev() {
            let variable = literal.variable();
            if !self.seen[variable.as_index()] {
                continue;
            }
            match data_provider.antecedents(variable) {
                Some(reason) => {
                    for other in reason {
                        if data_provider.level(other.variable()) > 0 {
                            self.mark_if_unseen(other.variable());
                        }
                    }
                }
                None => {
                    if data_provider.level(variable) > 0 && literal != falsified {
                        failed.push(literal);
                    }
                }
            }
        }
        self.clear_seen();

        failed.sort_unstable();
        failed.dedup();
        failed
    }
}
