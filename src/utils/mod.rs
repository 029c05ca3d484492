//! Utility functions and helpers

pub mod window;

pub use window::RecentWindow;
