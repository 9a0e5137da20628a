use serde::Serialize;

use caseforge_core::{EntityKind, Phase};

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct PhaseEntry {
    phase: Phase,
    depends_on: &'static [Phase],
    produces: &'static [EntityKind],
    terminal: bool,
}

/// Prints the declared phase order with each phase's dependencies.
pub fn run() -> CommandResult {
    if let Err(error) = Phase::validate_order(Phase::ORDER) {
        return CommandResult::classified("phases", "invariant_violation", error.to_string());
    }
    let entries = Phase::ORDER
        .iter()
        .map(|phase| PhaseEntry {
            phase: *phase,
            depends_on: phase.depends_on(),
            produces: phase.produces(),
            terminal: phase.is_terminal(),
        })
        .collect::<Vec<_>>();
    let message = format!("{} phases in execution order", entries.len());
    CommandResult::success_with("phases", message, entries)
}
