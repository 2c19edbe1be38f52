//! # third_party_notices
//!
//! Maintains a third-party notices document for a .NET project's direct
//! dependencies:
//! - **Resolution**: match declared package references against central pins
//!   and restore lock data
//! - **Acquisition**: locate each package's license text through an ordered
//!   fallback chain with a persistent on-disk cache
//! - **Classification**: group related packages under shared legal families
//! - **Assembly**: render one alphabetized section per family
//! - **Validation**: check an existing document against structure and
//!   grouping rules without touching the network
//!
//! ## Quick Start
//!
//! ```no_run
//! use third_party_notices::{run_update, NoticeConfig, UpdateOptions};
//!
//! # fn main() -> third_party_notices::Result<()> {
//! let config = NoticeConfig::default();
//! let outcome = run_update(&config, &UpdateOptions::default())?;
//!
//! for warning in &outcome.warnings {
//!     println!("{}: {} license variants", warning.family, warning.variants.len());
//! }
//! # Ok(())
//! # }
//! ```

mod acquire;
mod assemble;
mod canonical;
mod config;
mod error;
mod family;
mod resolver;
mod text;
mod types;
mod validate;

// Re-export public API
pub use assemble::{run_update, UpdateOptions, UpdateOutcome};
pub use config::{
    CachePaths, DocumentRules, GroupingRules, InputPaths, ManualDependency, NetworkConfig,
    NoticeConfig, PrefixRule,
};
pub use error::{NoticeError, Result};
pub use types::{FamilyMap, PackageNotice, ValidationReport, VariantWarning};
pub use validate::run_check;
