//! Export of titration data.
//!
//! Adapters that want a permanent record of a run (the data table and the pKa summary)
//! write it through this module as CSV.

pub mod csv;
