mod commands;
mod probe;
mod progress;
mod runner;
mod status;
mod tools;

pub use commands::*;
pub use probe::*;
pub use progress::*;
pub use runner::*;
pub use status::*;
pub use tools::*;
