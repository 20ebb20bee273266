//! # Titrasim Core Library
//!
//! A simulation engine for the glycine titration teaching experiment: the user assembles a
//! burette apparatus in a fixed order, titrates a glycine sample with NaOH, and estimates the
//! two pKa values and the isoelectric point of the amino acid from the recorded curve.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture so that presentation code never has to
//! reach into the simulation state directly.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`ApparatusItem`, `Stage`,
//!   `Reading`), the piecewise glycine pH curve, the banded pKa estimator, and CSV export.
//!
//! - **[`engine`]: The Logic Core.** The stateful components: the ordered `SetupGate`, the
//!   `TitrationEngine` that owns the reading history and decides fine-increment gating and
//!   termination, plus configuration, notifications and error types.
//!
//! - **[`workflows`]: The Public API.** `LabSession` ties the engine together into the
//!   complete experiment and is the single object a presentation adapter talks to.

pub mod core;
pub mod engine;
pub mod workflows;
