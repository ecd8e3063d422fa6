pub mod credits;
pub mod reactions;
