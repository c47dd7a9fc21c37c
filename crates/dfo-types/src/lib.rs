pub mod errors;
pub mod objective;
pub mod parameter;

pub use errors::*;
pub use objective::*;
pub use parameter::*;
