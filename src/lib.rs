//! Crewbase signup API library
//!
//! This library provides the account-provisioning backend for Crewbase,
//! including the signup orchestration saga, the payment provider gateway,
//! webhook ingestion and the persistence layer.

pub mod api;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod infrastructure;
pub mod orchestrator;
pub mod validation;
pub mod webhook;
