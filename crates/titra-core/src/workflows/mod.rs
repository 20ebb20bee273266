//! # Workflows Module
//!
//! High-level entry points that run the titration experiment.
//!
//! ## Overview
//!
//! Presentation adapters talk to a [`lab::LabSession`]: they forward user input (start,
//! placements, increment presses, stop, reset), wait out the settle delays the session
//! asks for, and render the [`crate::engine::events::LabEvent`]s it emits.
//!
//! - **Lab Session** ([`lab`]) - The interactive experiment: stage sequencing, setup gate,
//!   titration engine and analysis behind one owned object.
//! - **Experiment** ([`experiment`]) - Scripted walkthrough that assembles the apparatus and
//!   titrates to completion with a chosen increment strategy.

pub mod experiment;
pub mod lab;
