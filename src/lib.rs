//! Terminal map of factories and suppliers.
//!
//! The supplier table is loaded once, narrowed with three linked dropdown
//! filters (city, main product, secondary product) and drawn as markers on a
//! Braille map.

pub mod app;
pub mod braille;
pub mod config;
pub mod data;
pub mod dataset;
pub mod filter;
pub mod logging;
pub mod map;
pub mod popup;
pub mod select;
pub mod ui;
