//! Streetside catalog core.
//!
//! This crate implements the store catalog's query and derivation logic:
//! slug derivation, geospatial nearest-store search, full-text relevance
//! search, tag faceting, rating aggregation, and favorite toggling. It is
//! transport-free: routing, sessions, uploads, and rendering live in the
//! caller, which hands the catalog an already-authenticated actor id and an
//! already-stored photo reference.
//!
//! # Architecture
//!
//! - [`models`] - Domain types (stores, reviews, favorites)
//! - [`repo`] - The [`repo::CatalogRepository`] seam with Postgres and
//!   in-memory implementations
//! - [`slug`], [`geo`], [`tags`], [`ratings`] - Pure derivation and
//!   aggregation stages
//! - [`search`] - Tantivy-backed full-text index over name + description
//! - [`service`] - The [`service::CatalogService`] facade the caller uses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod ratings;
pub mod repo;
pub mod search;
pub mod service;
pub mod slug;
pub mod tags;
