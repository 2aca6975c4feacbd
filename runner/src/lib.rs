pub mod cli;
pub mod config;
pub mod executors;
pub mod miniapps;
pub mod plans;
pub mod scaling;
pub mod systems;
