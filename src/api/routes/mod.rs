//! API Routes
//!
//! Route handlers organized by functionality.

pub mod clocks;
pub mod export;
pub mod health;
pub mod history;
pub mod sync;
