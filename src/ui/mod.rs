// UI module - Interactive decisions
//
// This module contains:
// - TerminalDecisions: DecisionProvider that prompts on a terminal

pub mod terminal;

pub use terminal::TerminalDecisions;
