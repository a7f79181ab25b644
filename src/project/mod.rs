mod naming;
mod prepare;
mod request;

pub use naming::*;
pub use prepare::*;
pub use request::*;
