//! API Routes
//!
//! Route handlers organized by functionality.

pub mod detections;
pub mod health;
