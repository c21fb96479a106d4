//! Service layer: the operations the view layer invokes, plus the
//! persistence, timer, and feedback plumbing behind them.

pub mod duel_service;
pub mod feedback;
pub mod match_service;
pub mod persistence;
pub mod timer;
