//! Sachleitende Verfügungen
//!
//! A directive document ("Sachleitende Verfügung") is a list of numbered
//! points embedded in a document. Each point says who receives a copy of the
//! document and how far it is printed.
//!
//! - [`domain`] holds the in-memory model: points, their ordinals, numerals and
//!   reproduction prefixes.
//! - [`host`] is the interface to the document the points live in, with an
//!   in-memory implementation.
//! - [`service`] translates between points and anchors in the document.
//! - [`print`] composes the progressive print of a document.
//! - [`session`] owns the model of one document and serializes every change
//!   to it.

pub mod domain;
pub use domain::{Config, Point, PointId, Verfuegung};

pub mod host;
pub use host::{DocumentHost, HostError, MemoryHost};

pub mod service;
pub use service::{DirectiveService, ServiceError};

pub mod print;
pub use print::{PrintComposer, PrintError};

pub mod session;
pub use session::Session;
