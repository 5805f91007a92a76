//! # pdf-brief
//!
//! A local-first PDF store that summarizes documents and answers questions
//! about them by delegating to a locally running LLM server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────┐   ┌───────────┐
//! │ HTTP/CLI │──▶│  PDF store   │──▶│ extraction │──▶│ LLM (HTTP)│
//! │          │   │ SQLite + dir │   │ pdf-extract│   │  Ollama   │
//! └──────────┘   └──────┬───────┘   └────────────┘   └───────────┘
//!                       │  cache check before extraction
//!                       ▼
//!               ┌────────────────┐
//!               │ summary cache  │ SQLite, durable
//!               │ answer cache   │ in-memory LRU
//!               └────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pdf-brief init                         # create storage dir and database
//! pdf-brief upload ./report.pdf          # → id 1
//! pdf-brief summarize 1
//! pdf-brief ask 1 "What are the key findings?"
//! pdf-brief serve                        # HTTP API on 127.0.0.1:8000
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Request and response types |
//! | [`error`] | Error taxonomy and HTTP mapping |
//! | [`store`] | Uploaded files and the id registry |
//! | [`extract`] | PDF text extraction and truncation |
//! | [`llm`] | Generation endpoint client |
//! | [`cache`] | Summary and answer caches |
//! | [`app`] | Pipeline composition |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod app;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod server;
pub mod store;
