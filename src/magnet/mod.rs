//! Magnet URI handling
//!
//! - [`MagnetLink`] parsing and canonical re-serialization
//! - [`extract_magnets`] scanning of raw page bodies
//! - [`Categorizer`] and [`QualityFilter`] keyword rules over display names

mod category;
mod extract;
mod link;

pub use category::{Categorizer, Category, QualityFilter};
pub use extract::extract_magnets;
pub use link::{Fingerprint, MagnetError, MagnetLink, MAX_MAGNET_LENGTH};
