//! Reasoning backend adapters.

mod heuristic;

pub use heuristic::HeuristicReasoner;
