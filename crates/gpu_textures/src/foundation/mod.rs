//! Foundation utilities shared by the texture subsystems

pub mod logging;
