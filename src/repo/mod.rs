pub mod lead;
pub mod note;
pub mod stage;

pub use lead::*;
pub use note::*;
pub use stage::*;
