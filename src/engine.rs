/*!
The bundled incremental CDCL engine.

The engine owns its state machine. Host code never observes it mid-call:
the terminator and learner are lent through [`Hooks`] for one call at a
time, and every call returns with the trail backtracked to the root level.
*/

mod clause_db;
mod conflict;
mod elim;
pub mod hooks;
mod lookahead;
pub mod options;
mod proof;
mod search;
pub mod state;
pub mod stats;
mod trail;
mod vsids;

use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufRead, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};

use crate::formula::{Literal, Variable};
use crate::parser::{self, Dimacs, Strictness};
use crate::prelude::*;

use self::clause_db::{ClauseDb, ClauseIdx, Watch};
use self::conflict::ConflictAnalyzer;
pub use self::hooks::{
    ClauseIterator, Hooks, Learner, TerminationHandle, Terminator, WitnessIterator,
};
pub use self::options::{Limits, Options};
use self::proof::ProofTracer;
use self::search::Schedule;
pub use self::state::{State, Status};
pub use self::stats::Statistics;
use self::trail::Trail;
use self::vsids::VsidsScoring;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("'{}' is not allowed in state {}", operation, state))]
    InvalidState {
        operation: &'static str,
        state: State,
    },
    #[snafu(display("invalid literal {}", literal))]
    InvalidLiteral { literal: i32 },
    #[snafu(display("literal {} is not an assumption of the last solve", literal))]
    NotAssumed { literal: i32 },
    #[snafu(display("literal {} is not frozen", literal))]
    NotFrozen { literal: i32 },
    #[snafu(display("{}", source))]
    Parse { source: parser::Error },
    #[snafu(display("I/O error on '{}': {}", path.display(), source))]
    Io { path: PathBuf, source: io::Error },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Root-level value of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixed {
    /// The literal is implied by the formula.
    Implied,
    /// The negation of the literal is implied by the formula.
    Negation,
    Unclear,
}

impl Fixed {
    pub fn code(self) -> i32 {
        match self {
            Fixed::Implied => 1,
            Fixed::Negation => -1,
            Fixed::Unclear => 0,
        }
    }
}

/// Result of cube generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cubes {
    pub status: Status,
    pub cubes: Vec<Vec<i32>>,
}

/// Summary of an incremental DIMACS file loaded into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inccnf {
    pub variables: usize,
    pub incremental: bool,
    pub cubes: Vec<Vec<i32>>,
}

/// A clause removed by variable elimination, with the literal that repairs it.
#[derive(Debug, Clone)]
struct Witnessed {
    witness: Literal,
    clause: Vec<Literal>,
}

fn to_dimacs(literals: &[Literal]) -> Vec<i32> {
    literals.iter().map(|literal| literal.to_dimacs()).collect()
}

pub struct Engine {
    state: State,
    options: Options,
    limits: Limits,
    prefix: String,

    trail: Trail,
    clauses: ClauseDb,
    watch: Watch,
    vsids: VsidsScoring,
    analyzer: ConflictAnalyzer,
    schedule: Schedule,

    /// Literals of the clause being added.
    clause: Vec<Literal>,
    /// Assumptions for the next solve.
    assumptions: Vec<Literal>,
    /// Assumptions consumed by the last solve, queryable through `failed`.
    last_assumptions: Vec<Literal>,
    failed: HashSet<Literal>,
    model: Vec<bool>,
    /// The empty clause has been derived.
    inconsistent: bool,

    frozen: Vec<u32>,
    eliminated: Vec<bool>,
    user_phases: Vec<Option<bool>>,
    saved_phases: Vec<Option<bool>>,
    extension: Vec<Witnessed>,

    proof: Option<ProofTracer>,
    termination: TerminationHandle,
    /// Sticky within one call once a poll asked to stop.
    terminated: bool,
    stats: Statistics,
    started: Instant,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        let options = Options::default();
        Engine {
            state: State::Initializing,
            vsids: VsidsScoring::new(options.seed()),
            options,
            limits: Limits::default(),
            prefix: String::from("c "),
            trail: Trail::default(),
            clauses: ClauseDb::default(),
            watch: Watch::default(),
            analyzer: ConflictAnalyzer::default(),
            schedule: Schedule::default(),
            clause: Vec::new(),
            assumptions: Vec::new(),
            last_assumptions: Vec::new(),
            failed: HashSet::new(),
            model: Vec::new(),
            inconsistent: false,
            frozen: Vec::new(),
            eliminated: Vec::new(),
            user_phases: Vec::new(),
            saved_phases: Vec::new(),
            extension: Vec::new(),
            proof: None,
            termination: TerminationHandle::default(),
            terminated: false,
            stats: Statistics::default(),
            started: Instant::now(),
        }
    }

    pub fn signature() -> &'static str {
        concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"))
    }

    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Status of the last solving call, derived from the state.
    pub fn status(&self) -> Status {
        match self.state {
            State::Satisfied => Status::Satisfiable,
            State::Unsatisfied => Status::Unsatisfiable,
            _ => Status::Unsolved,
        }
    }

    fn require(&self, operation: &'static str, allowed: bool) -> Result<()> {
        ensure!(
            allowed,
            InvalidState {
                operation,
                state: self.state,
            }
        );
        Ok(())
    }

    fn leave_configuration(&mut self) {
        if self.state.accepts_options() {
            self.state = State::Unknown;
        }
    }

    /// Forgets the model and failed assumptions of the last call.
    fn reset_solution(&mut self) {
        if matches!(self.state, State::Satisfied | State::Unsatisfied) {
            self.state = State::Unknown;
        }
        self.model.clear();
        self.failed.clear();
        self.last_assumptions.clear();
    }

    /// Enters the unsatisfied state outside of `solve`, blaming every pending assumption.
    fn mark_unsatisfied(&mut self) {
        self.failed = self.assumptions.iter().copied().collect();
        self.last_assumptions = self.assumptions.clone();
        self.state = State::Unsatisfied;
    }

    fn finish_call(&mut self) {
        self.backtrack(0);
        self.termination.clear();
        self.terminated = false;
    }

    fn parse_literal(literal: i32) -> Result<Literal> {
        Literal::from_dimacs(literal).context(InvalidLiteral { literal })
    }

    fn import(&mut self, literal: i32) -> Result<Literal> {
        let parsed = Engine::parse_literal(literal)?;
        self.ensure_variable(parsed.variable());
        Ok(parsed)
    }

    fn ensure_variable(&mut self, variable: Variable) {
        let needed = variable.as_index() + 1;
        if needed <= self.vars() {
            return;
        }
        self.trail.grow(needed);
        self.watch.grow(needed);
        self.analyzer.grow(needed);
        self.vsids.grow(needed);
        self.frozen.resize(needed, 0);
        self.eliminated.resize(needed, false);
        self.user_phases.resize(needed, None);
        self.saved_phases.resize(needed, None);
    }

    fn backtrack(&mut self, level: usize) {
        let Engine {
            trail,
            vsids,
            saved_phases,
            ..
        } = self;
        trail.backtrack(level, |literal| {
            saved_phases[literal.variable().as_index()] = Some(literal.positive());
            vsids.insert(literal.variable());
        });
    }

    fn delete_clause(&mut self, index: ClauseIdx) {
        if let Some(proof) = self.proof.as_mut() {
            proof.delete(self.clauses[index].literals());
        }
        self.clauses.mark_garbage(index);
        self.stats.deleted += 1;
    }

    /// Drops deleted clause slots. Must not run while clause indices are held
    /// outside the trail and the watches, e.g. in occurrence lists.
    fn compact_clauses(&mut self) {
        if self.clauses.garbage() == 0 {
            return;
        }
        let remap = self.clauses.compact();
        self.trail.remap_reasons(&remap);
        self.watch.remap(&remap);
        trace!("compacted clause arena to {} slots", self.clauses.slots());
    }

    fn poll(&mut self, hooks: &mut Hooks<'_>) -> bool {
        if !self.terminated && (self.termination.is_requested() || hooks.terminate()) {
            debug!("termination requested");
            self.terminated = true;
        }
        self.terminated
    }

    /// Adds an input clause, bringing back eliminated variables it mentions.
    fn add_original(&mut self, literals: Vec<Literal>) {
        for literal in &literals {
            self.restore(literal.variable());
        }
        self.attach(literals, false);
    }

    /// Stores a clause at the root level, simplified against root assignments
    /// only as far as needed to keep the watch invariant.
    fn attach(&mut self, mut literals: Vec<Literal>, redundant: bool) -> Option<ClauseIdx> {
        debug_assert_eq!(self.trail.decision_level(), 0);

        let mut seen = HashSet::new();
        literals.retain(|literal| seen.insert(*literal));
        if literals.iter().any(|literal| literals.contains(&!*literal)) {
            trace!("dropping tautology {:?}", to_dimacs(&literals));
            return None;
        }

        match literals.len() {
            0 => {
                self.inconsistent = true;
                return None;
            }
            1 => {
                let unit = literals[0];
                match self.trail.value(unit) {
                    Some(true) => {}
                    Some(false) => self.inconsistent = true,
                    None => self.trail.assign(unit, None),
                }
                return None;
            }
            _ => {}
        }

        let trail = &self.trail;
        literals.sort_by_key(|&literal| trail.value(literal) == Some(false));
        let non_false = literals
            .iter()
            .filter(|&&literal| trail.value(literal) != Some(false))
            .count();
        let first = literals[0];

        let index = self.clauses.push(literals, redundant);
        self.watch.attach(index, self.clauses[index].literals());
        if non_false == 0 {
            self.inconsistent = true;
        } else if non_false == 1 && self.trail.value(first).is_none() {
            self.trail.assign(first, Some(index));
        }
        Some(index)
    }

    /// Brings back an eliminated variable together with every eliminated
    /// variable its removed clauses mention.
    fn restore(&mut self, variable: Variable) {
        if !self
            .eliminated
            .get(variable.as_index())
            .copied()
            .unwrap_or(false)
        {
            return;
        }

        let mut pending = vec![variable];
        let mut clauses = Vec::new();
        while let Some(variable) = pending.pop() {
            let index = variable.as_index();
            if !self.eliminated[index] {
                continue;
            }
            self.eliminated[index] = false;
            self.vsids.insert(variable);
            self.stats.restored += 1;
            trace!("restoring {}", variable);

            let (restored, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.extension)
                .into_iter()
                .partition(|entry| entry.witness.variable() == variable);
            self.extension = kept;
            for entry in restored {
                for literal in &entry.clause {
                    if self.eliminated[literal.variable().as_index()] {
                        pending.push(literal.variable());
                    }
                }
                clauses.push(entry.clause);
            }
        }

        for clause in clauses {
            self.attach(clause, false);
        }
    }

    pub fn add(&mut self, literal: i32) -> Result<()> {
        self.require("add", self.state.is_valid())?;
        if literal == 0 {
            let clause = std::mem::take(&mut self.clause);
            self.reset_solution();
            self.leave_configuration();
            self.add_original(clause);
            self.state = State::Unknown;
            return Ok(());
        }

        let parsed = self.import(literal)?;
        self.reset_solution();
        self.leave_configuration();
        self.clause.push(parsed);
        self.state = State::Adding;
        Ok(())
    }

    /// Adds a whole clause. Every literal is checked before anything is added.
    pub fn add_clause(&mut self, literals: &[i32]) -> Result<()> {
        self.require("add_clause", self.state.is_ready())?;
        for &literal in literals {
            Engine::parse_literal(literal)?;
        }
        for &literal in literals {
            self.add(literal)?;
        }
        self.add(0)
    }

    pub fn assume(&mut self, literal: i32) -> Result<()> {
        self.require("assume", self.state.is_ready())?;
        let parsed = self.import(literal)?;
        self.reset_solution();
        self.leave_configuration();
        self.restore(parsed.variable());
        self.assumptions.push(parsed);
        Ok(())
    }

    pub fn reset_assumptions(&mut self) -> Result<()> {
        self.require("reset_assumptions", self.state.is_ready())?;
        self.reset_solution();
        self.assumptions.clear();
        Ok(())
    }

    pub fn solve(&mut self, hooks: &mut Hooks<'_>) -> Result<Status> {
        self.require("solve", self.state.is_ready())?;
        self.reset_solution();
        self.leave_configuration();
        self.state = State::Solving;
        self.stats.solves += 1;
        debug!(
            "solve #{} with {} assumptions",
            self.stats.solves,
            self.assumptions.len()
        );

        let mut status = Status::Unsolved;
        if self.limits.preprocessing > 0 {
            status = self.simplify_rounds(self.limits.preprocessing, hooks);
        }
        if status != Status::Unsatisfiable {
            status = self.search(hooks);
        }

        let assumptions = std::mem::take(&mut self.assumptions);
        match status {
            Status::Satisfiable => {
                self.model = self.extend_model();
                self.state = State::Satisfied;
            }
            Status::Unsatisfiable => {
                if self.inconsistent || self.failed.is_empty() {
                    self.failed = assumptions.iter().copied().collect();
                }
                self.state = State::Unsatisfied;
            }
            Status::Unsolved => self.state = State::Unknown,
        }
        self.last_assumptions = assumptions;
        self.limits = Limits::default();
        self.finish_call();

        debug!("solve #{} returned {}", self.stats.solves, status);
        Ok(status)
    }

    /// Runs up to `rounds` rounds of root-level simplification and variable elimination.
    pub fn simplify(&mut self, rounds: usize, hooks: &mut Hooks<'_>) -> Result<Status> {
        self.require("simplify", self.state.is_ready())?;
        self.reset_solution();
        self.leave_configuration();
        self.state = State::Solving;

        let status = self.simplify_rounds(rounds, hooks);
        if status == Status::Unsatisfiable {
            self.mark_unsatisfied();
        } else {
            self.state = State::Unknown;
        }
        self.finish_call();
        Ok(status)
    }

    /// Suggests a decision literal, or `0` if none is left.
    pub fn lookahead(&mut self, hooks: &mut Hooks<'_>) -> Result<i32> {
        self.require("lookahead", self.state.is_ready())?;
        self.reset_solution();
        self.leave_configuration();
        self.state = State::Solving;

        let assumptions = self.assumptions.clone();
        let outcome = self.look_ahead(&assumptions, hooks, true);
        let literal = match outcome {
            lookahead::Outcome::Split(literal) => literal.to_dimacs(),
            _ => 0,
        };
        if self.inconsistent {
            self.mark_unsatisfied();
        } else {
            self.state = State::Unknown;
        }
        self.finish_call();

        debug!("lookahead suggests {}", literal);
        Ok(literal)
    }

    pub fn generate_cubes(&mut self, depth: usize, hooks: &mut Hooks<'_>) -> Result<Cubes> {
        self.require("generate_cubes", self.state.is_ready())?;
        self.reset_solution();
        self.leave_configuration();
        self.state = State::Solving;

        let cubes = self.split_cubes(depth, hooks);
        if cubes.status == Status::Unsatisfiable {
            self.mark_unsatisfied();
        } else {
            self.state = State::Unknown;
        }
        self.finish_call();

        debug!(
            "generated {} cubes up to depth {} ({})",
            cubes.cubes.len(),
            depth,
            cubes.status
        );
        Ok(cubes)
    }

    /// Forces the running or next call to stop at its next poll.
    pub fn terminate(&self) {
        self.termination.request();
    }

    pub fn termination_handle(&self) -> TerminationHandle {
        self.termination.clone()
    }

    pub fn val(&self, literal: i32) -> Result<i32> {
        self.require("val", self.state == State::Satisfied)?;
        let parsed = Engine::parse_literal(literal)?;
        let value = self
            .model
            .get(parsed.variable().as_index())
            .copied()
            .unwrap_or(false);
        Ok(if value == parsed.positive() {
            literal
        } else {
            -literal
        })
    }

    pub fn failed(&self, literal: i32) -> Result<bool> {
        self.require("failed", self.state == State::Unsatisfied)?;
        let parsed = Engine::parse_literal(literal)?;
        ensure!(
            self.last_assumptions.contains(&parsed),
            NotAssumed { literal }
        );
        Ok(self.failed.contains(&parsed))
    }

    pub fn fixed(&self, literal: i32) -> Result<Fixed> {
        self.require("fixed", self.state.is_valid())?;
        let parsed = Engine::parse_literal(literal)?;
        if parsed.variable().as_index() >= self.vars() || !self.trail.is_fixed(parsed.variable())
        {
            return Ok(Fixed::Unclear);
        }
        Ok(match self.trail.value(parsed) {
            Some(true) => Fixed::Implied,
            Some(false) => Fixed::Negation,
            None => Fixed::Unclear,
        })
    }

    /// Protects a variable from elimination. Freezes nest.
    pub fn freeze(&mut self, literal: i32) -> Result<()> {
        self.require("freeze", self.state.is_valid())?;
        let parsed = self.import(literal)?;
        self.restore(parsed.variable());
        self.frozen[parsed.variable().as_index()] += 1;
        Ok(())
    }

    pub fn melt(&mut self, literal: i32) -> Result<()> {
        self.require("melt", self.state.is_valid())?;
        let parsed = Engine::parse_literal(literal)?;
        let count = self.frozen.get_mut(parsed.variable().as_index());
        match count {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => NotFrozen { literal }.fail(),
        }
    }

    pub fn frozen(&self, literal: i32) -> Result<bool> {
        self.require("frozen", self.state.is_valid())?;
        let parsed = Engine::parse_literal(literal)?;
        Ok(self
            .frozen
            .get(parsed.variable().as_index())
            .map_or(false, |&count| count > 0))
    }

    /// Prefers the given polarity when deciding on its variable.
    pub fn phase(&mut self, literal: i32) -> Result<()> {
        self.require("phase", self.state.is_valid())?;
        let parsed = self.import(literal)?;
        self.user_phases[parsed.variable().as_index()] = Some(parsed.positive());
        Ok(())
    }

    pub fn unphase(&mut self, literal: i32) -> Result<()> {
        self.require("unphase", self.state.is_valid())?;
        let parsed = self.import(literal)?;
        self.user_phases[parsed.variable().as_index()] = None;
        Ok(())
    }

    /// Number of variables known to the engine.
    pub fn vars(&self) -> usize {
        self.trail.num_variables()
    }

    /// Makes variables `1..=max_var` known up front.
    pub fn reserve(&mut self, max_var: i32) -> Result<()> {
        self.require("reserve", self.state.is_valid())?;
        if max_var > 0 {
            self.import(max_var)?;
        }
        Ok(())
    }

    /// Variables that are neither fixed nor eliminated.
    pub fn active(&self) -> usize {
        (0..self.vars())
            .filter_map(Variable::from_index)
            .filter(|&variable| {
                !self.eliminated[variable.as_index()] && !self.trail.is_fixed(variable)
            })
            .count()
    }

    pub fn irredundant(&self) -> usize {
        self.clauses.irredundant()
    }

    pub fn redundant(&self) -> usize {
        self.clauses.redundant()
    }

    pub fn is_valid_option(name: &str) -> bool {
        Options::is_valid(name)
    }

    pub fn is_preprocessing_option(name: &str) -> bool {
        Options::is_preprocessing(name)
    }

    pub fn is_valid_long_option(arg: &str) -> bool {
        Options::is_valid_long_option(arg)
    }

    pub fn is_valid_configuration(name: &str) -> bool {
        Options::is_valid_configuration(name)
    }

    pub fn is_valid_limit(name: &str) -> bool {
        Limits::is_valid(name)
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.options.get(name)
    }

    /// Returns `false` for unknown options.
    pub fn set(&mut self, name: &str, value: i32) -> Result<bool> {
        self.require("set", self.state.accepts_options())?;
        let known = self.options.set(name, value);
        if known {
            self.state = State::Configuring;
            self.vsids.reseed(self.options.seed());
        }
        Ok(known)
    }

    pub fn set_long_option(&mut self, arg: &str) -> Result<bool> {
        match Options::parse_long_option(arg) {
            Some((name, value)) => self.set(name, value),
            None => {
                self.require("set_long_option", self.state.accepts_options())?;
                Ok(false)
            }
        }
    }

    pub fn configure(&mut self, name: &str) -> Result<bool> {
        self.require("configure", self.state.accepts_options())?;
        let known = self.options.configure(name);
        if known {
            self.state = State::Configuring;
            self.vsids.reseed(self.options.seed());
        }
        Ok(known)
    }

    pub fn optimize(&mut self, level: u32) -> Result<()> {
        self.require("optimize", self.state.accepts_options())?;
        self.options.optimize(level);
        self.state = State::Configuring;
        Ok(())
    }

    /// Sets a limit for the next `solve`. Returns `false` for unknown limits.
    pub fn limit(&mut self, name: &str, value: i32) -> Result<bool> {
        self.require("limit", self.state.is_valid())?;
        Ok(self.limits.set(name, value))
    }

    pub fn prefix(&mut self, prefix: &str) {
        self.prefix = prefix.to_owned();
    }

    pub fn trace_proof(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.require("trace_proof", self.state.accepts_options())?;
        let path = path.as_ref();
        let file = File::create(path).context(Io {
            path: path.to_owned(),
        })?;
        self.trace_proof_to(Box::new(BufWriter::new(file)), path.display().to_string())
    }

    pub fn trace_proof_to(&mut self, writer: Box<dyn Write>, name: impl Into<String>) -> Result<()> {
        self.require("trace_proof", self.state.accepts_options())?;
        let tracer = ProofTracer::new(writer, name, self.options.binary());
        debug!("tracing proof to '{}'", tracer.name());
        self.proof = Some(tracer);
        self.state = State::Configuring;
        Ok(())
    }

    pub fn flush_proof_trace(&mut self) -> Result<()> {
        self.require("flush_proof_trace", self.state.is_valid())?;
        if let Some(proof) = self.proof.as_mut() {
            proof.flush().context(Io {
                path: PathBuf::from(proof.name()),
            })?;
        }
        Ok(())
    }

    pub fn close_proof_trace(&mut self) -> Result<()> {
        self.flush_proof_trace()?;
        if let Some(proof) = self.proof.take() {
            let (added, deleted) = proof.counts();
            debug!(
                "closed proof trace '{}' ({} added, {} deleted)",
                proof.name(),
                added,
                deleted
            );
        }
        Ok(())
    }

    /// Irredundant clauses, root-level units first.
    fn irredundant_clauses(&self) -> Vec<Vec<Literal>> {
        let mut result = Vec::new();
        if self.inconsistent {
            result.push(Vec::new());
        }
        for variable in (0..self.vars()).filter_map(Variable::from_index) {
            if self.trail.is_fixed(variable) {
                if let Some(value) = self.trail.var_value(variable) {
                    result.push(vec![Literal::new(variable, value)]);
                }
            }
        }
        for (_, clause) in self.clauses.iter() {
            if !clause.is_redundant() {
                result.push(clause.literals().to_vec());
            }
        }
        result
    }

    pub fn traverse_clauses(&self, iterator: &mut dyn ClauseIterator) -> Result<bool> {
        self.require("traverse_clauses", self.state.is_ready())?;
        for clause in self.irredundant_clauses() {
            if !iterator.clause(&to_dimacs(&clause)) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Visits the extension stack from the oldest entry.
    pub fn traverse_witnesses_forward(&self, iterator: &mut dyn WitnessIterator) -> Result<bool> {
        self.require("traverse_witnesses_forward", self.state.is_ready())?;
        for entry in self.extension.iter() {
            if !iterator.witness(&to_dimacs(&entry.clause), &[entry.witness.to_dimacs()]) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Visits the extension stack from the newest entry, the order used to extend models.
    pub fn traverse_witnesses_backward(&self, iterator: &mut dyn WitnessIterator) -> Result<bool> {
        self.require("traverse_witnesses_backward", self.state.is_ready())?;
        for entry in self.extension.iter().rev() {
            if !iterator.witness(&to_dimacs(&entry.clause), &[entry.witness.to_dimacs()]) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn load(&mut self, dimacs: Dimacs) -> usize {
        let variables = dimacs.cnf.num_variables();
        if let Some(variable) = variables.checked_sub(1).and_then(Variable::from_index) {
            self.ensure_variable(variable);
        }
        self.reset_solution();
        for clause in dimacs.cnf.into_clauses() {
            self.leave_configuration();
            self.add_original(clause.iter().collect());
        }
        variables
    }

    /// Loads a DIMACS file and returns the number of variables it declares.
    pub fn read_dimacs(&mut self, path: impl AsRef<Path>, strictness: Strictness) -> Result<usize> {
        self.require("read_dimacs", self.state.is_ready())?;
        let dimacs = parser::parse_file(path, strictness).context(Parse)?;
        Ok(self.load(dimacs))
    }

    pub fn read_dimacs_from(&mut self, reader: impl BufRead, strictness: Strictness) -> Result<usize> {
        self.require("read_dimacs", self.state.is_ready())?;
        let dimacs = parser::parse_reader(reader, strictness).context(Parse)?;
        Ok(self.load(dimacs))
    }

    /// Loads an incremental DIMACS file, returning its cubes untouched.
    pub fn read_dimacs_inccnf(&mut self, path: impl AsRef<Path>, strictness: Strictness) -> Result<Inccnf> {
        self.require("read_dimacs", self.state.is_ready())?;
        let dimacs = parser::parse_file(path, strictness).context(Parse)?;
        let incremental = dimacs.incremental;
        let cubes = dimacs.cubes.iter().map(|cube| to_dimacs(cube)).collect();
        let variables = self.load(dimacs);
        Ok(Inccnf {
            variables,
            incremental,
            cubes,
        })
    }

    /// Writes the irredundant formula. The header declares at least `min_max_var` variables.
    pub fn write_dimacs(&self, path: impl AsRef<Path>, min_max_var: usize) -> Result<()> {
        self.require("write_dimacs", self.state.is_ready())?;
        let path = path.as_ref();
        let clauses = self
            .irredundant_clauses()
            .iter()
            .map(|clause| to_dimacs(clause))
            .collect::<Vec<_>>();
        let comment = format!("written by {}", Engine::signature());

        File::create(path)
            .and_then(|file| {
                let mut out = BufWriter::new(file);
                parser::write_cnf(
                    &mut out,
                    Some(&comment),
                    self.vars().max(min_max_var),
                    &clauses,
                )?;
                out.flush()
            })
            .context(Io {
                path: path.to_owned(),
            })
    }

    /// Writes the extension stack as `<witness> 0 <clause> 0` lines.
    pub fn write_extension(&self, path: impl AsRef<Path>) -> Result<()> {
        self.require("write_extension", self.state.is_ready())?;
        let path = path.as_ref();
        File::create(path)
            .and_then(|file| {
                let mut out = BufWriter::new(file);
                writeln!(out, "c extension stack of {}", Engine::signature())?;
                for entry in self.extension.iter() {
                    write!(out, "{} 0", entry.witness.to_dimacs())?;
                    for literal in &entry.clause {
                        write!(out, " {}", literal.to_dimacs())?;
                    }
                    writeln!(out, " 0")?;
                }
                out.flush()
            })
            .context(Io {
                path: path.to_owned(),
            })
    }

    /// An independent engine with the same options and irredundant formula.
    pub fn copy(&self) -> Result<Engine> {
        self.require("copy", self.state.is_ready())?;
        let mut other = Engine::new();
        other.options = self.options.clone();
        other.vsids.reseed(self.options.seed());
        other.prefix = self.prefix.clone();
        if let Some(variable) = self.vars().checked_sub(1).and_then(Variable::from_index) {
            other.ensure_variable(variable);
        }
        for clause in self.irredundant_clauses() {
            other.attach(clause, false);
        }
        other.extension = self.extension.clone();
        other.eliminated = self.eliminated.clone();
        for variable in (0..self.vars()).filter_map(Variable::from_index) {
            if self.eliminated[variable.as_index()] {
                other.vsids.remove(variable);
            }
        }
        other.frozen = self.frozen.clone();
        other.user_phases = self.user_phases.clone();
        other.state = if self.state.accepts_options() {
            self.state
        } else {
            State::Unknown
        };
        Ok(other)
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    fn prefixed(&self, text: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}\n", self.prefix, line))
            .collect()
    }

    pub fn statistics_report(&self) -> String {
        self.prefixed(&self.stats.to_string())
    }

    pub fn resources_report(&self) -> String {
        self.prefixed(&format!(
            "time: {:.2}s\nvariables: {} ({} active)\nclauses: {} irredundant, {} redundant",
            self.started.elapsed().as_secs_f64(),
            self.vars(),
            self.active(),
            self.irredundant(),
            self.redundant(),
        ))
    }

    pub fn options_report(&self) -> String {
        self.prefixed(&self.options.render())
    }

    pub fn usage() -> String {
        Options::usage()
    }

    pub fn configurations() -> String {
        Options::configurations()
    }

    /// Moves to the final state and flushes the proof trace.
    pub fn release(&mut self) {
        if self.state == State::Deleting {
            return;
        }
        self.state = State::Deleting;
        if let Some(mut proof) = self.proof.take() {
            if let Err(error) = proof.flush() {
                warn!("failed to flush proof trace '{}': {}", proof.name(), error);
            }
        }
        debug!("engine released after {} solves", self.stats.solves);
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.release();
    }
}
