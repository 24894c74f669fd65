//! Foundation module - Core utilities shared by every subsystem
//!
//! Currently this is the logging facade and its initialisation.

pub mod logging;
