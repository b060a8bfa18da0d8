mod blockchain;
mod farming;
mod prover;

pub use blockchain::*;
pub use farming::*;
pub use prover::*;
