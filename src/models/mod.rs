// Core data models for Leadboard
// These structs represent the pipeline entities and their wire shapes

pub mod lead;
pub mod stage;

pub use lead::*;
pub use stage::*;
