// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free moving-average computations. Insufficient history is
// never an error: callers get `None`, an empty series or a "no crossover"
// signal and decide how to render it.

pub mod golden_cross;
pub mod sma;
