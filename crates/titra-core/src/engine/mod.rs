//! # Engine Module
//!
//! The stateful half of the simulation: the components that own session state and the
//! rules that mutate it.
//!
//! ## Overview
//!
//! A titration session moves through two phases. During setup the [`setup::SetupGate`]
//! accepts apparatus items strictly in sequence. Once everything is in place the
//! [`titration::TitrationEngine`] records the initial pH, applies titrant increments,
//! toggles the fine increment around the steep part of the curve and ends the run when the
//! pH or volume limit is reached.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Burette capacity, increment sizes, stop limits and
//!   settle delays
//! - **Setup** ([`setup`]) - Ordered apparatus placement
//! - **Titration** ([`titration`]) - Reading history, fine-increment gating and termination
//! - **Events** ([`events`]) - Notifications for the presentation adapter
//! - **Error Handling** ([`error`]) - Engine-specific error types
//!
//! Invalid user actions (an out-of-order placement, an increment while idle) are not
//! errors: they are ignored and, where useful, reported through an event. [`error`] covers
//! invalid configuration and invalid increment volumes only.

pub mod config;
pub mod error;
pub mod events;
pub mod setup;
pub mod titration;
