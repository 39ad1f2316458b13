//! addonctl - command line front-end for the addon manager
pub mod cli;
pub mod commands;
pub mod utils;
