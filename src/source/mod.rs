//! Tabular data source module
//!
//! Defines the narrow read interface the gateway depends on, with a
//! PostgREST implementation for the hosted table and an in-memory one.

mod memory;
mod postgrest;
mod traits;

pub use memory::MemorySource;
pub use postgrest::PostgrestSource;
pub use traits::*;
