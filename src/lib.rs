//! ScanLens Server Library
//!
//! OCR overlay backend for scanned comic and manga pages. The main server
//! binary is in main.rs.
//!
//! # Modules
//!
//! - `ocr`: Engine boundary and the line/block geometry types
//! - `clustering`: Groups detected lines into text blocks
//! - `tiler`: Splits tall images into strips before OCR
//! - `cache`: URL-keyed, disk-persisted result store
//! - `pipeline`: Per-image request path (cache, fetch, OCR)
//! - `jobs`: Background chapter preprocessing

pub mod cache;
pub mod clustering;
pub mod config;
pub mod error;
pub mod fetch;
pub mod jobs;
pub mod ocr;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod tiler;
