//! Domain layer for the portfolio backend
//!
//! Architecture: Domain Model - Pure records and validation outcomes
//! - Contains the portfolio records, their identifiers and relations
//! - Independent of storage files, admin presentation and the CLI
//! - Expresses the ubiquitous language of bindings, constraints and violations

pub mod models;
pub mod violations;

// Re-export main domain types for convenience
pub use models::*;
pub use violations::*;
