// Canoe slalom live results scoreboard

pub mod client;
pub mod core;
