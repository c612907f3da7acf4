//! qoraclectl - command-line front end for Qoracle.

pub mod card;
pub mod cli;
pub mod commands;
pub mod errors;
pub mod logging;
pub mod pause;
