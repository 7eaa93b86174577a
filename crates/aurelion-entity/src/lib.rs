//! # aurelion-entity
//!
//! Domain entity models for Aurelion. Every struct in this crate represents
//! a database table row or a domain value object. Database entities derive
//! `sqlx::FromRow`; wire-facing values serialize in camelCase.

pub mod change;
pub mod file;
pub mod sync;
