//! Serialization primitives shared by the program image format.

pub mod encoding;
