// ============================================================================
// Order Domain - Business Logic for the Order Aggregate
// ============================================================================
//
// - Value objects (OrderStatus, id aliases)
// - Transition table (which status may follow which)
// - Commands (CreateOrder, UpdateOrder, TransitionAction)
// - Errors (OrderError enum)
// - Aggregate (Order with its update rules)
//
// ============================================================================

pub mod value_objects;
pub mod transitions;
pub mod commands;
pub mod errors;
pub mod aggregate;

// Re-export for convenience
pub use value_objects::*;
pub use commands::*;
pub use errors::*;
pub use aggregate::*;
