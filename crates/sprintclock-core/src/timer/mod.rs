mod category;
mod engine;
mod state;

pub use category::{SprintCategory, SprintStats};
pub use engine::{derive_and_maybe_transition, TimerStateMachine, COOLDOWN_DURATION_MS};
pub use state::{BaseState, DerivedState, TimerStats};
