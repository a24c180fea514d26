/*!
Host-facing solver facade.

[`Solver`] wraps an [`Engine`] and owns the callbacks connected to it. Host
callbacks may fail or panic; such failures are parked in a shared
[`ErrorChannel`] while the engine is running and re-raised here, after the
engine call has returned. A pending callback failure always takes priority
over the result of the call it interrupted.
*/

use std::{io::BufRead, path::Path, rc::Rc};

use crate::bridge::{
    adapters::{ClauseVisitor, InterruptAdapter, LearnerAdapter, TerminatorAdapter, WitnessVisitor},
    CallbackError, CallbackResult, ErrorChannel, HostError, InterruptFlag, InterruptSource,
};
use crate::engine::{
    self, Cubes, Engine, Fixed, Hooks, Inccnf, Learner, State, Statistics, Status, Terminator,
};
use crate::parser::Strictness;
use crate::prelude::*;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("{}", source))]
    HostCallback { source: CallbackError },
    #[snafu(display("{}", source))]
    EngineReported { source: engine::Error },
}

impl Error {
    /// The host error re-raised from a callback, if that is what this is.
    pub fn callback(&self) -> Option<&CallbackError> {
        match self {
            Error::HostCallback { source } => Some(source),
            Error::EngineReported { .. } => None,
        }
    }

    pub fn into_callback(self) -> Option<HostError> {
        match self {
            Error::HostCallback { source } => Some(source.into_inner()),
            Error::EngineReported { .. } => None,
        }
    }

    pub fn engine(&self) -> Option<&engine::Error> {
        match self {
            Error::EngineReported { source } => Some(source),
            Error::HostCallback { .. } => None,
        }
    }

    pub fn is_interrupt(&self) -> bool {
        self.callback().map_or(false, CallbackError::is_interrupt)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub struct Solver {
    engine: Engine,
    errors: Rc<ErrorChannel>,
    interrupt: InterruptFlag,
    terminator: Option<Box<dyn Terminator>>,
    learner: Option<Box<dyn Learner>>,
}

impl Default for Solver {
    fn default() -> Self {
        Solver::new()
    }
}

impl Solver {
    /// A fresh solver, polling its [`InterruptFlag`] through the terminator slot.
    pub fn new() -> Self {
        Solver::from_engine(Engine::new())
    }

    fn from_engine(engine: Engine) -> Self {
        let errors = Rc::new(ErrorChannel::default());
        let interrupt = InterruptFlag::new();
        let terminator: Box<dyn Terminator> = Box::new(InterruptAdapter::new(
            Rc::clone(&errors),
            interrupt.clone(),
        ));
        Solver {
            engine,
            errors,
            interrupt,
            terminator: Some(terminator),
            learner: None,
        }
    }

    pub fn signature() -> &'static str {
        Engine::signature()
    }

    pub fn version() -> &'static str {
        Engine::version()
    }

    /// Runs an engine call with the connected callbacks lent to it.
    fn drive<T>(
        &mut self,
        call: impl FnOnce(&mut Engine, &mut Hooks<'_>) -> engine::Result<T>,
    ) -> Result<T> {
        let Solver {
            engine,
            errors,
            terminator,
            learner,
            ..
        } = self;
        let result = {
            let mut hooks = Hooks::new(
                terminator
                    .as_mut()
                    .map(|terminator| &mut **terminator as &mut dyn Terminator),
                learner
                    .as_mut()
                    .map(|learner| &mut **learner as &mut dyn Learner),
            );
            call(engine, &mut hooks)
        };
        errors.rethrow().context(HostCallback)?;
        result.context(EngineReported)
    }

    pub fn state(&self) -> State {
        self.engine.state()
    }

    pub fn status(&self) -> Status {
        self.engine.status()
    }

    pub fn add(&mut self, literal: i32) -> Result<()> {
        self.engine.add(literal).context(EngineReported)
    }

    /// Adds one clause. The terminating `0` is appended here.
    pub fn add_clause<I>(&mut self, clause: I) -> Result<()>
    where
        I: IntoIterator<Item = i32>,
    {
        let literals = clause.into_iter().collect::<Vec<_>>();
        self.engine.add_clause(&literals).context(EngineReported)
    }

    pub fn add_clauses<I, C>(&mut self, clauses: I) -> Result<()>
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = i32>,
    {
        for clause in clauses {
            self.add_clause(clause)?;
        }
        Ok(())
    }

    pub fn assume(&mut self, literal: i32) -> Result<()> {
        self.engine.assume(literal).context(EngineReported)
    }

    pub fn reset_assumptions(&mut self) -> Result<()> {
        self.engine.reset_assumptions().context(EngineReported)
    }

    pub fn solve(&mut self) -> Result<Status> {
        self.drive(|engine, hooks| engine.solve(hooks))
    }

    /// Assumes every literal, then solves.
    pub fn solve_with<I>(&mut self, assumptions: I) -> Result<Status>
    where
        I: IntoIterator<Item = i32>,
    {
        for literal in assumptions {
            self.assume(literal)?;
        }
        self.solve()
    }

    pub fn simplify(&mut self, rounds: usize) -> Result<Status> {
        self.drive(move |engine, hooks| engine.simplify(rounds, hooks))
    }

    pub fn lookahead(&mut self) -> Result<i32> {
        self.drive(|engine, hooks| engine.lookahead(hooks))
    }

    pub fn generate_cubes(&mut self, depth: usize) -> Result<Cubes> {
        self.drive(move |engine, hooks| engine.generate_cubes(depth, hooks))
    }

    /// Makes the running or next call stop at its next poll.
    pub fn terminate(&self) {
        self.engine.terminate();
    }

    pub fn val(&self, literal: i32) -> Result<i32> {
        self.engine.val(literal).context(EngineReported)
    }

    /// The model as signed literals `1..=vars()`.
    pub fn model(&self) -> Result<Vec<i32>> {
        (1..=self.vars())
            .map(|variable| self.val(variable as i32))
            .collect()
    }

    pub fn failed(&self, literal: i32) -> Result<bool> {
        self.engine.failed(literal).context(EngineReported)
    }

    pub fn fixed(&self, literal: i32) -> Result<Fixed> {
        self.engine.fixed(literal).context(EngineReported)
    }

    pub fn freeze(&mut self, literal: i32) -> Result<()> {
        self.engine.freeze(literal).context(EngineReported)
    }

    pub fn melt(&mut self, literal: i32) -> Result<()> {
        self.engine.melt(literal).context(EngineReported)
    }

    pub fn frozen(&self, literal: i32) -> Result<bool> {
        self.engine.frozen(literal).context(EngineReported)
    }

    pub fn phase(&mut self, literal: i32) -> Result<()> {
        self.engine.phase(literal).context(EngineReported)
    }

    pub fn unphase(&mut self, literal: i32) -> Result<()> {
        self.engine.unphase(literal).context(EngineReported)
    }

    pub fn vars(&self) -> usize {
        self.engine.vars()
    }

    pub fn reserve(&mut self, max_var: i32) -> Result<()> {
        self.engine.reserve(max_var).context(EngineReported)
    }

    pub fn active(&self) -> usize {
        self.engine.active()
    }

    pub fn irredundant(&self) -> usize {
        self.engine.irredundant()
    }

    pub fn redundant(&self) -> usize {
        self.engine.redundant()
    }

    pub fn is_valid_option(name: &str) -> bool {
        Engine::is_valid_option(name)
    }

    pub fn is_preprocessing_option(name: &str) -> bool {
        Engine::is_preprocessing_option(name)
    }

    pub fn is_valid_long_option(arg: &str) -> bool {
        Engine::is_valid_long_option(arg)
    }

    pub fn is_valid_configuration(name: &str) -> bool {
        Engine::is_valid_configuration(name)
    }

    pub fn is_valid_limit(name: &str) -> bool {
        Engine::is_valid_limit(name)
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.engine.get(name)
    }

    pub fn set(&mut self, name: &str, value: i32) -> Result<bool> {
        self.engine.set(name, value).context(EngineReported)
    }

    pub fn set_long_option(&mut self, arg: &str) -> Result<bool> {
        self.engine.set_long_option(arg).context(EngineReported)
    }

    pub fn configure(&mut self, name: &str) -> Result<bool> {
        self.engine.configure(name).context(EngineReported)
    }

    pub fn optimize(&mut self, level: u32) -> Result<()> {
        self.engine.optimize(level).context(EngineReported)
    }

    pub fn limit(&mut self, name: &str, value: i32) -> Result<bool> {
        self.engine.limit(name, value).context(EngineReported)
    }

    pub fn prefix(&mut self, prefix: &str) {
        self.engine.prefix(prefix);
    }

    pub fn trace_proof(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.engine.trace_proof(path).context(EngineReported)
    }

    pub fn flush_proof_trace(&mut self) -> Result<()> {
        self.engine.flush_proof_trace().context(EngineReported)
    }

    pub fn close_proof_trace(&mut self) -> Result<()> {
        self.engine.close_proof_trace().context(EngineReported)
    }

    /// Replaces the terminator. The callback is polled during solving calls;
    /// returning `true` or failing stops the call.
    pub fn connect_terminator<F>(&mut self, callback: F)
    where
        F: FnMut() -> CallbackResult<bool> + 'static,
    {
        self.terminator = Some(Box::new(TerminatorAdapter::new(
            Rc::clone(&self.errors),
            callback,
        )));
        debug!("terminator connected");
    }

    /// Replaces the terminator by a poll of `source`.
    pub fn connect_interrupt_source<S>(&mut self, source: S)
    where
        S: InterruptSource + 'static,
    {
        self.terminator = Some(Box::new(InterruptAdapter::new(
            Rc::clone(&self.errors),
            source,
        )));
        debug!("interrupt source connected");
    }

    /// Reconnects the solver's own [`InterruptFlag`].
    pub fn connect_interrupt_terminator(&mut self) {
        let flag = self.interrupt.clone();
        self.connect_interrupt_source(flag);
    }

    /// Handle to the flag polled by the default terminator.
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    pub fn disconnect_terminator(&mut self) {
        if self.terminator.take().is_some() {
            debug!("terminator disconnected");
        }
    }

    /// Replaces the learner. `learning(size)` decides whether a clause of
    /// `size` literals is wanted; `learn` then receives its literals and a `0`.
    pub fn connect_learner<L, F>(&mut self, learning: L, learn: F)
    where
        L: FnMut(usize) -> CallbackResult<bool> + 'static,
        F: FnMut(i32) -> CallbackResult<()> + 'static,
    {
        self.learner = Some(Box::new(LearnerAdapter::new(
            Rc::clone(&self.errors),
            self.engine.termination_handle(),
            learning,
            learn,
        )));
        debug!("learner connected");
    }

    pub fn disconnect_learner(&mut self) {
        if self.learner.take().is_some() {
            debug!("learner disconnected");
        }
    }

    /// Visits the irredundant clauses. Returns `false` if the callback stopped early.
    pub fn traverse_clauses<F>(&self, callback: F) -> Result<bool>
    where
        F: FnMut(&[i32]) -> CallbackResult<bool>,
    {
        let mut visitor = ClauseVisitor::new(&self.errors, callback);
        let result = self.engine.traverse_clauses(&mut visitor);
        self.errors.rethrow().context(HostCallback)?;
        result.context(EngineReported)
    }

    pub fn traverse_witnesses_forward<F>(&self, callback: F) -> Result<bool>
    where
        F: FnMut(&[i32], &[i32]) -> CallbackResult<bool>,
    {
        let mut visitor = WitnessVisitor::new(&self.errors, callback);
        let result = self.engine.traverse_witnesses_forward(&mut visitor);
        self.errors.rethrow().context(HostCallback)?;
        result.context(EngineReported)
    }

    pub fn traverse_witnesses_backward<F>(&self, callback: F) -> Result<bool>
    where
        F: FnMut(&[i32], &[i32]) -> CallbackResult<bool>,
    {
        let mut visitor = WitnessVisitor::new(&self.errors, callback);
        let result = self.engine.traverse_witnesses_backward(&mut visitor);
        self.errors.rethrow().context(HostCallback)?;
        result.context(EngineReported)
    }

    /// Collects the irredundant clauses.
    pub fn clauses(&self) -> Result<Vec<Vec<i32>>> {
        let mut clauses = Vec::new();
        self.traverse_clauses(|clause: &[i32]| {
            clauses.push(clause.to_vec());
            Ok(true)
        })?;
        Ok(clauses)
    }

    /// Collects the extension stack as `(clause, witness)` pairs, oldest first.
    pub fn witnesses(&self) -> Result<Vec<(Vec<i32>, Vec<i32>)>> {
        let mut witnesses = Vec::new();
        self.traverse_witnesses_forward(|clause: &[i32], witness: &[i32]| {
            witnesses.push((clause.to_vec(), witness.to_vec()));
            Ok(true)
        })?;
        Ok(witnesses)
    }

    pub fn read_dimacs(&mut self, path: impl AsRef<Path>, strictness: Strictness) -> Result<usize> {
        self.engine
            .read_dimacs(path, strictness)
            .context(EngineReported)
    }

    pub fn read_dimacs_from(
        &mut self,
        reader: impl BufRead,
        strictness: Strictness,
    ) -> Result<usize> {
        self.engine
            .read_dimacs_from(reader, strictness)
            .context(EngineReported)
    }

    pub fn read_dimacs_inccnf(
        &mut self,
        path: impl AsRef<Path>,
        strictness: Strictness,
    ) -> Result<Inccnf> {
        self.engine
            .read_dimacs_inccnf(path, strictness)
            .context(EngineReported)
    }

    pub fn write_dimacs(&self, path: impl AsRef<Path>, min_max_var: usize) -> Result<()> {
        self.engine
            .write_dimacs(path, min_max_var)
            .context(EngineReported)
    }

    pub fn write_extension(&self, path: impl AsRef<Path>) -> Result<()> {
        self.engine.write_extension(path).context(EngineReported)
    }

    /// An independent solver with the same options and formula, and no callbacks.
    pub fn copy(&self) -> Result<Solver> {
        let engine = self.engine.copy().context(EngineReported)?;
        Ok(Solver::from_engine(engine))
    }

    pub fn statistics(&self) -> &Statistics {
        self.engine.statistics()
    }

    pub fn print_statistics(&self) {
        print!("{}", self.engine.statistics_report());
    }

    pub fn print_resources(&self) {
        print!("{}", self.engine.resources_report());
    }

    pub fn print_options(&self) {
        print!("{}", self.engine.options_report());
    }

    pub fn print_usage() {
        print!("{}", Engine::usage());
    }

    pub fn print_configurations() {
        print!("{}", Engine::configurations());
    }
}

impl Drop for Solver {
    fn drop(&mut self) {
        self.disconnect_terminator();
        self.disconnect_learner();
        self.engine.release();
        if let Some(failure) = self.errors.take() {
            warn!("dropping unreported callback failure {:?}", failure);
        }
    }
}
