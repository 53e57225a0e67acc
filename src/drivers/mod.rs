//! Hardware drivers
//!
//! The payload only talks to the serial console.

pub mod serial;
