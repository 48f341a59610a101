//! Command-line front end for `layerbox-core`

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
