//! Fleetgate — tiered action-authorization gateway for fleet automation.
//!
//! Sits between an AI operations agent (or an unattended remediation
//! loop) and the infrastructure it manages. Every side-effecting action
//! flows through one pipeline: sanitize, protected-resource guard, tier
//! classification, guardrails, then execute / notify / confirm / refuse —
//! with an append-only audit trail of every decision.
//!
//! This library exposes the core components for integration testing and
//! embedding. The binary entrypoint is in `main.rs`.

pub mod audit;
pub mod classify;
pub mod cli;
pub mod config;
pub mod confirm;
pub mod elevate;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod guard;
pub mod guardrail;
pub mod registry;
pub mod sanitize;
pub mod types;
