//! Image Gacha Generator
//!
//! This library provides the client core for the img-gacha system: it
//! submits AI image generation requests to a backend over HTTP, polls each
//! task until it settles, and merges the finished images into a shared
//! gallery. A stub backend speaking the same wire contract is included for
//! local development and tests.

pub mod app_state;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
