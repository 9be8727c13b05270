//! Livets - Live FLV to MPEG-TS transmuxer
//!
//! This library crate exposes the collaborators around the `livets-media`
//! core for integration testing.

pub mod config;
pub mod playlist;
pub mod session;
pub mod storage;
