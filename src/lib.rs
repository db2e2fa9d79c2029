// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod config;
pub mod connection;
mod decode;
pub mod descriptor;
pub mod diag;
mod mem;
pub mod prepare;
pub mod render;
pub mod session;
pub mod statement;
pub mod typeinfo;
pub mod variable;
pub mod wire;

// Scripted wire doubles shared by unit and integration tests
pub mod test_utils;
