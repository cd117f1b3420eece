mod delineate;
mod health;

pub use delineate::{delineate, delineation_status};
pub use health::{health_check, root};
