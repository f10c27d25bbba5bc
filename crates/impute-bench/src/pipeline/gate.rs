//! Checkpoint between scenarios.
//!
//! After each scenario the runner asks a [`ScenarioGate`] whether to go on.
//! Interactive runs block on stdin; automated runs use [`AutoAdvance`].

use std::io::{self, BufRead, Write};
use tracing::debug;

/// Answer from a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Continue,
    /// End the run after the current scenario.
    Stop,
}

/// Decides whether the runner advances to the next scenario.
pub trait ScenarioGate: Send + Sync {
    /// Called after the scenario described by `finished` has been reported.
    fn wait(&self, finished: &str) -> GateDecision;
}

/// Never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAdvance;

impl ScenarioGate for AutoAdvance {
    fn wait(&self, _finished: &str) -> GateDecision {
        GateDecision::Continue
    }
}

/// Blocks until a line arrives on stdin.
///
/// An empty line continues; `q` or `quit` stops. End of input and read
/// errors continue, so a closed stdin never hangs the run.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinGate;

impl StdinGate {
    /// Interpret one line of user input.
    pub fn decide(line: &str) -> GateDecision {
        match line.trim().to_ascii_lowercase().as_str() {
            "q" | "quit" => GateDecision::Stop,
            _ => GateDecision::Continue,
        }
    }
}

impl ScenarioGate for StdinGate {
    fn wait(&self, finished: &str) -> GateDecision {
        eprint!(
            "Finished {}. Press Enter to continue to the next scenario (q to stop)... ",
            finished
        );
        let _ = io::stderr().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => {
                debug!("stdin closed; continuing");
                GateDecision::Continue
            }
            Ok(_) => Self::decide(&line),
            Err(e) => {
                debug!("Failed to read from stdin ({}); continuing", e);
                GateDecision::Continue
            }
        }
    }
}

static_assertions::assert_obj_safe!(ScenarioGate);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide() {
        assert_eq!(StdinGate::decide("\n"), GateDecision::Continue);
        assert_eq!(StdinGate::decide("anything"), GateDecision::Continue);
        assert_eq!(StdinGate::decide("q\n"), GateDecision::Stop);
        assert_eq!(StdinGate::decide("  QUIT "), GateDecision::Stop);
    }

    #[test]
    fn test_auto_advance() {
        assert_eq!(AutoAdvance.wait("scenario 1"), GateDecision::Continue);
    }
}
