/*!
Named integer options, named configurations and per-call limits.
*/

use std::fmt::Write;

struct OptionSpec {
    name: &'static str,
    default: i32,
    min: i32,
    max: i32,
    preprocessing: bool,
    description: &'static str,
}

const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        name: "binary",
        default: 1,
        min: 0,
        max: 1,
        preprocessing: false,
        description: "use binary proof format",
    },
    OptionSpec {
        name: "elim",
        default: 1,
        min: 0,
        max: 1,
        preprocessing: true,
        description: "bounded variable elimination",
    },
    OptionSpec {
        name: "elimbound",
        default: 0,
        min: 0,
        max: 1024,
        preprocessing: true,
        description: "maximum number of additional clauses per elimination",
    },
    OptionSpec {
        name: "elimclslim",
        default: 100,
        min: 2,
        max: 100_000,
        preprocessing: true,
        description: "maximum resolvent size",
    },
    OptionSpec {
        name: "elimocclim",
        default: 100,
        min: 1,
        max: 1_000_000,
        preprocessing: true,
        description: "maximum occurrences of an elimination candidate",
    },
    OptionSpec {
        name: "phase",
        default: 1,
        min: 0,
        max: 1,
        preprocessing: false,
        description: "initial decision phase",
    },
    OptionSpec {
        name: "reduce",
        default: 1,
        min: 0,
        max: 1,
        preprocessing: false,
        description: "reduce learned clauses",
    },
    OptionSpec {
        name: "reduceint",
        default: 300,
        min: 10,
        max: 1_000_000,
        preprocessing: false,
        description: "conflicts between reductions",
    },
    OptionSpec {
        name: "restart",
        default: 1,
        min: 0,
        max: 1,
        preprocessing: false,
        description: "enable restarts",
    },
    OptionSpec {
        name: "restartint",
        default: 32,
        min: 1,
        max: 100_000,
        preprocessing: false,
        description: "luby restart unit in conflicts",
    },
    OptionSpec {
        name: "seed",
        default: 0,
        min: 0,
        max: std::i32::MAX,
        preprocessing: false,
        description: "random seed for tie breaking",
    },
];

const CONFIGURATIONS: &[(&str, &str, &[(&str, i32)])] = &[
    ("default", "set default options", &[]),
    ("plain", "disable preprocessing", &[("elim", 0)]),
    (
        "sat",
        "target satisfiable instances",
        &[("restartint", 256), ("reduceint", 1000)],
    ),
    (
        "unsat",
        "target unsatisfiable instances",
        &[("restartint", 16), ("elimbound", 16)],
    ),
];

fn lookup(name: &str) -> Option<usize> {
    OPTIONS.iter().position(|entry| entry.name == name)
}

#[derive(Debug, Clone)]
pub struct Options {
    values: Vec<i32>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            values: OPTIONS.iter().map(|entry| entry.default).collect(),
        }
    }
}

impl Options {
    pub fn is_valid(name: &str) -> bool {
        lookup(name).is_some()
    }

    pub fn is_preprocessing(name: &str) -> bool {
        lookup(name).map_or(false, |index| OPTIONS[index].preprocessing)
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        lookup(name).map(|index| self.values[index])
    }

    /// Returns `false` if the option is unknown. Out-of-range values are clamped.
    pub fn set(&mut self, name: &str, value: i32) -> bool {
        match lookup(name) {
            Some(index) => {
                let entry = &OPTIONS[index];
                let clamped = value.max(entry.min).min(entry.max);
                if clamped != value {
                    warn!(
                        "option '{}' value {} clamped to {}",
                        entry.name, value, clamped
                    );
                }
                self.values[index] = clamped;
                true
            }
            None => false,
        }
    }

    /// Parses `--name=value`, `--name` (meaning 1) and `--no-name` (meaning 0).
    pub fn parse_long_option(arg: &str) -> Option<(&'static str, i32)> {
        let body = arg.strip_prefix("--")?;
        let (name, value) = match body.find('=') {
            Some(split) => {
                let value = match &body[split + 1..] {
                    "true" => 1,
                    "false" => 0,
                    number => number.parse::<i32>().ok()?,
                };
                (&body[..split], value)
            }
            None => match body.strip_prefix("no-") {
                Some(name) => (name, 0),
                None => (body, 1),
            },
        };
        lookup(name).map(|index| (OPTIONS[index].name, value))
    }

    pub fn is_valid_long_option(arg: &str) -> bool {
        Options::parse_long_option(arg).is_some()
    }

    pub fn is_valid_configuration(name: &str) -> bool {
        CONFIGURATIONS.iter().any(|(config, _, _)| *config == name)
    }

    /// Applies a named configuration on top of the defaults.
    pub fn configure(&mut self, name: &str) -> bool {
        match CONFIGURATIONS.iter().find(|(config, _, _)| *config == name) {
            Some((_, _, settings)) => {
                *self = Options::default();
                for (option, value) in settings.iter() {
                    self.set(option, *value);
                }
                true
            }
            None => false,
        }
    }

    /// Scales the preprocessing limits by `10^level`.
    pub fn optimize(&mut self, level: u32) {
        let factor = 10i64.saturating_pow(level.min(9));
        for name in ["elimocclim", "elimclslim"].iter() {
            if let Some(index) = lookup(name) {
                let scaled = (i64::from(self.values[index]) * factor).min(i64::from(OPTIONS[index].max));
                self.values[index] = scaled as i32;
            }
        }
    }

    pub fn binary(&self) -> bool {
        self.flag("binary")
    }

    pub fn elim(&self) -> bool {
        self.flag("elim")
    }

    pub fn elim_bound(&self) -> usize {
        self.number("elimbound")
    }

    pub fn elim_clause_limit(&self) -> usize {
        self.number("elimclslim")
    }

    pub fn elim_occurrence_limit(&self) -> usize {
        self.number("elimocclim")
    }

    pub fn phase(&self) -> bool {
        self.flag("phase")
    }

    pub fn reduce(&self) -> bool {
        self.flag("reduce")
    }

    pub fn reduce_interval(&self) -> u64 {
        self.number("reduceint") as u64
    }

    pub fn restart(&self) -> bool {
        self.flag("restart")
    }

    pub fn restart_interval(&self) -> u64 {
        self.number("restartint") as u64
    }

    pub fn seed(&self) -> u64 {
        self.number("seed") as u64
    }

    fn flag(&self, name: &str) -> bool {
        self.get(name).map_or(false, |value| value != 0)
    }

    fn number(&self, name: &str) -> usize {
        self.get(name).map_or(0, |value| value.max(0) as usize)
    }

    /// Current values as `--name=value` lines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (entry, value) in OPTIONS.iter().zip(&self.values) {
            let _ = writeln!(out, "--{}={}", entry.name, value);
        }
        out
    }

    pub fn usage() -> String {
        let mut out = String::new();
        for entry in OPTIONS {
            let _ = writeln!(
                out,
                "--{}=<{}..{}>  {} [{}]",
                entry.name, entry.min, entry.max, entry.description, entry.default
            );
        }
        out
    }

    pub fn configurations() -> String {
        let mut out = String::new();
        for (name, description, _) in CONFIGURATIONS {
            let _ = writeln!(out, "--{}  {}", name, description);
        }
        out
    }
}

/// Limits that apply to the next solving call only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Limits {
    pub conflicts: Option<u64>,
    pub decisions: Option<u64>,
    /// Simplification rounds run before search.
    pub preprocessing: usize,
}

impl Limits {
    pub fn is_valid(name: &str) -> bool {
        matches!(name, "conflicts" | "decisions" | "preprocessing")
    }

    /// A negative budget means unlimited. Returns `false` for unknown limits.
    pub fn set(&mut self, name: &str, value: i32) -> bool {
        let budget = if value < 0 { None } else { Some(value as u64) };
        match name {
            "conflicts" => self.conflicts = budget,
            "decisions" => self.decisions = budget,
            "preprocessing" => self.preprocessing = value.max(0) as usize,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_clamping() {
        let mut options = Options::default();
        assert_eq!(options.get("restartint"), Some(32));
        assert_eq!(options.get("nonexistent"), None);
        assert!(options.set("elim", 7));
        assert_eq!(options.get("elim"), Some(1));
        assert!(!options.set("nonexistent", 1));
        assert!(Options::is_preprocessing("elim"));
        assert!(!Options::is_preprocessing("restart"));
    }

    #[test]
    fn long_options() {
        assert_eq!(Options::parse_long_option("--elim=0"), Some(("elim", 0)));
        assert_eq!(Options::parse_long_option("--no-restart"), Some(("restart", 0)));
        assert_eq!(Options::parse_long_option("--phase"), Some(("phase", 1)));
        assert_eq!(Options::parse_long_option("--phase=false"), Some(("phase", 0)));
        assert_eq!(Options::parse_long_option("-elim=0"), None);
        assert_eq!(Options::parse_long_option("--bogus=1"), None);
        assert_eq!(Options::parse_long_option("--seed=x"), None);
    }

    #[test]
    fn configurations_reset_to_defaults() {
        let mut options = Options::default();
        options.set("reduceint", 77);
        assert!(options.configure("plain"));
        assert_eq!(options.get("elim"), Some(0));
        assert_eq!(options.get("reduceint"), Some(300));
        assert!(!options.configure("turbo"));
        assert!(Options::is_valid_configuration("unsat"));
    }

    #[test]
    fn optimize_scales_limits() {
        let mut options = Options::default();
        options.optimize(2);
        assert_eq!(options.get("elimocclim"), Some(10_000));
        options.optimize(9);
        assert_eq!(options.get("elimocclim"), Some(1_000_000));
    }

    #[test]
    fn limits() {
        let mut limits = Limits::default();
        assert!(limits.set("conflicts", 10));
        assert!(limits.set("decisions", -1));
        assert!(!limits.set("bogus", 1));
        assert_eq!(limits.conflicts, Some(10));
        assert_eq!(limits.decisions, None);
    }
}
