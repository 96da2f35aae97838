/// Pool code generation and normalisation.
pub mod code;
/// Deterministic ranking order.
pub mod ranking;
/// Building blocks of the result recomputation.
pub mod recompute;
/// Guess scoring rules.
pub mod scoring;
