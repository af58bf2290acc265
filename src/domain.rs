//! Domain models for directive documents.
//!
//! This module contains the core domain types: directive points, the ordered
//! directive document that numbers them, numeral generation and
//! configuration.

/// Directive point domain model.
pub mod point;
pub use point::{Point, PointId};

pub mod numeral;

mod config;
pub use config::Config;

pub mod verfuegung;
pub use verfuegung::Verfuegung;
