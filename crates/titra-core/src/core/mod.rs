//! # Core Module
//!
//! Stateless building blocks of the titration simulation.
//!
//! - **Models** ([`models`]) - apparatus items, instructional stages and pH readings
//! - **Curve** ([`curve`]) - the piecewise glycine titration curve with injected noise
//! - **Analysis** ([`analysis`]) - pKa and isoelectric point estimation from a reading history
//! - **I/O** ([`io`]) - export of reading tables and analysis summaries
//!
//! Nothing in this module owns mutable session state; the [`crate::engine`] layer does.

pub mod analysis;
pub mod curve;
pub mod io;
pub mod models;
