//! Interactive terminal search and download for an online book catalog.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod extract;
pub mod sanitize;
pub mod session;
pub mod tui;
