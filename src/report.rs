/*!
Error printer for the command line front end.

Facade errors display their source transparently, so causes repeating the
message above them are skipped.
*/

use std::error::Error as StdError;

use crate::solver;

pub struct Report(Box<dyn StdError>);

impl Report {
    /// Whether the reported failure is a host interrupt rather than a real error.
    pub fn is_interrupt(&self) -> bool {
        self.0
            .downcast_ref::<solver::Error>()
            .map_or(false, solver::Error::is_interrupt)
    }
}

impl std::fmt::Debug for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut last = self.0.to_string();
        writeln!(f, "{}", last)?;

        let mut depth = 0;
        for cause in std::iter::successors(self.0.source(), |&e| e.source()) {
            let message = cause.to_string();
            if message == last {
                continue;
            }
            if depth == 0 {
                writeln!(f, "\nCaused by:")?;
            }
            writeln!(f, "  {}: {}", depth, message)?;
            depth += 1;
            last = message;
        }

        Ok(())
    }
}

impl<E: Into<Box<dyn StdError>>> From<E> for Report {
    fn from(e: E) -> Self {
        Report(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Interrupted;

    #[test]
    fn repeated_causes_are_skipped() {
        let mut solver = crate::Solver::new();
        solver.add_clause(vec![1]).unwrap();
        solver.connect_interrupt_source(|| Err(Interrupted.into()));
        let report = Report::from(solver.solve().unwrap_err());

        assert!(report.is_interrupt());
        assert_eq!(format!("{:?}", report), "interrupted by the host\n");
    }
}
