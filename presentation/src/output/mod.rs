//! Report formatting for console output.

mod console;

pub use console::ConsoleFormatter;
