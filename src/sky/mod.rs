//! Sky Module
//!
//! Everything between the magnetosphere and the observer's eyes:
//!
//! - `darkness`: solar altitude and darkness classification (pure)
//! - `visibility`: minimum latitude at which aurora should be visible (pure)
//! - `clouds`: cloud-cover and ovation-forecast collaborators (optional,
//!   fail-open to neutral defaults)

pub mod clouds;
pub mod darkness;
pub mod visibility;

pub use clouds::{CloudClient, OvationClient};
pub use darkness::{darkness_info, hours_until_dark, solar_altitude_deg};
pub use visibility::visible_latitude;
