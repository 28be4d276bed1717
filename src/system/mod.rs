pub mod collector;
pub mod command_line;
pub mod cpu;
pub mod error;
pub mod memory;
pub mod owner;
pub mod platform;
pub mod process;
pub mod snapshot;
pub mod tree;
