// All core functionality is in qextract-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod tools;

// Re-export core types for convenience
pub use qextract_core::*;

// Re-export CLI utilities
pub use tools::{ToolLocator, ToolStatus};
