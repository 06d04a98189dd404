//! Hint Data Enrichment Library
//!
//! This library provides the enrichment step used by workflow script tasks:
//! it sends a person or company record to the Hint enrichment service,
//! retries while the service is still collecting data, and maps the returned
//! fields onto the record without overwriting anything already populated.
//!
//! # Modules
//!
//! - `api`: HTTP surface.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `circuit_breaker`: Circuit breaker around the enrichment service.
//! - `client`: Enrichment client.
//! - `config`: Configuration management.
//! - `credentials`: Access token and instance credentials.
//! - `errors`: Error handling types.
//! - `field_mapping`: Response field translation.
//! - `handlers`: HTTP request handlers.
//! - `models`: Subjects, records and service payloads.
//! - `transport`: HTTP sender with content-driven retry.
//! - `webhook_models`: Workflow webhook payloads.
//! - `workflow`: Workflow script-task step.

pub mod api;
pub mod core;
pub mod integrations;

pub mod circuit_breaker;
pub mod client;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod field_mapping;
pub mod handlers;
pub mod models;
pub mod transport;
pub mod webhook_models;
pub mod workflow;
