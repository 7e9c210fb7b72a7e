// Domain layer - Core remux types and rules

pub mod errors;
pub mod model;
pub mod rules;
