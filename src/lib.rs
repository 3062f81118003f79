pub mod cli;
pub mod commands;
pub mod error;
pub mod model;
pub mod partition;
pub mod report;
pub mod source;
pub mod trace;
pub mod traversal;
pub mod tree;
pub mod util;
