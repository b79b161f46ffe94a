//! Small helpers shared across modules

pub mod helper;
