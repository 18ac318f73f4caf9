//! AI systems (guard lifecycle, stimuli, FSM tick, arrest)

pub mod contact;
pub mod fsm;
pub mod stimuli;

// Re-export all systems
pub use contact::*;
pub use fsm::*;
pub use stimuli::*;
