//! # Recipe Harness
//!
//! Recipe cost and nutrition aggregation with ingredient substitute ranking.
//!
//! This crate is the application around
//! [`recipe_harness_core`]: configuration, SQLite storage, embedding
//! providers, CSV import, the HTTP API, and the `recipe` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────────────────────┐
//! │ CSV seed │──▶│  SQLite  │──▶│ Catalog (core)             │
//! │  import  │   │  Store   │   │  snapshot + features       │
//! └──────────┘   └──────────┘   │  substitutes / totals      │
//!                               └─────────────┬──────────────┘
//!                                             │
//!                          ┌──────────────────┤
//!                          ▼                  ▼
//!                     ┌──────────┐       ┌──────────┐
//!                     │   CLI    │       │   HTTP   │
//!                     │ (recipe) │       │  (axum)  │
//!                     └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` |
//! | [`embedding`] | Embedding providers (disabled, local, Ollama) |
//! | [`import`] | CSV seed-data import |
//! | [`service`] | Application service shared by CLI and server |
//! | [`server`] | HTTP API |
//! | [`commands`] | CLI command implementations |
//! | [`logging`] | `tracing` subscriber setup |

pub mod commands;
pub mod config;
pub mod db;
pub mod embedding;
pub mod import;
pub mod logging;
pub mod migrate;
pub mod server;
pub mod service;
pub mod sqlite_store;
