use std::fmt::Display;

/// Counters accumulated over the lifetime of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Statistics {
    pub solves: u64,
    pub conflicts: u64,
    pub decisions: u64,
    pub propagations: u64,
    pub restarts: u64,
    pub reductions: u64,
    pub learned: u64,
    pub deleted: u64,
    pub eliminated: u64,
    pub restored: u64,
    pub probes: u64,
}

impl Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rows = [
            ("solves", self.solves),
            ("conflicts", self.conflicts),
            ("decisions", self.decisions),
            ("propagations", self.propagations),
            ("restarts", self.restarts),
            ("reductions", self.reductions),
            ("learned", self.learned),
            ("deleted", self.deleted),
            ("eliminated", self.eliminated),
            ("restored", self.restored),
            ("probes", self.probes),
        ];
        for (name, value) in rows.iter() {
            writeln!(f, "{:<14}{:>12}", format!("{}:", name), value)?;
        }
        Ok(())
    }
}
