//! AI components

pub mod fsm;
pub mod memory;


// Re-export all components
pub use fsm::*;
pub use memory::*;
