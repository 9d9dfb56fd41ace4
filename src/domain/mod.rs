// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// Pure order rules: statuses, the transition table, commands and the
// aggregate. Nothing in here performs I/O.
//
// ============================================================================

pub mod order;
