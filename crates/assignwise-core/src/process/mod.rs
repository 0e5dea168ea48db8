//! # Process Module
//!
//! Workflow definition and the stage classifier.
//!
//! The remote store owns the workflow and performs the actual moves; this
//! module only interprets the definition it returns.

mod tracker;

pub use tracker::*;
