pub mod cli;
pub mod harness;
pub mod project;
