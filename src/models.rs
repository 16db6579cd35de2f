pub mod events;
pub mod games;
pub mod members;
pub mod participants;
pub mod payments;
pub mod stats;
