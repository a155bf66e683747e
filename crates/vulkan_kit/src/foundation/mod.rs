//! Foundation utilities shared by every layer of the kit

pub mod logging;
