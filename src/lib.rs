//! # Hotel API Library
//!
//! Back-office service for a small hotel: staff accounts, guests, rates,
//! rooms, reservations with availability search, and the check-in /
//! check-out workflow with proof-of-payment uploads.

pub mod auth;
pub mod booking;
pub mod config;
pub mod crypto;
pub mod db;
pub mod error;
pub mod front_desk;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod storage;
pub mod telemetry;
pub use migration;
