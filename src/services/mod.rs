//! GitHub API service implementations.

mod hooks;

pub use hooks::*;
