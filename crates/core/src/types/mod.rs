//! Core types for Atelier.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod locale;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use locale::{Locale, LocalizedText};
pub use status::*;
