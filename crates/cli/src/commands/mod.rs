//! CLI Commands

pub mod error_ui;
pub mod matrix;
pub mod probe;
