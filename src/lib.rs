//! # Prism
//!
//! A profile-aware context selection engine for AI coding agents.
//!
//! Prism selects which cached manifest documents to hand an agent for a
//! given task: candidates are scored against the task text, then packed
//! into the agent profile's byte budget in tier priority order. Every
//! packing decision is appended to a SQLite usage log for offline tuning.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │  Manifest   │──▶│ Route→Score  │──▶│ Selection │
//! │  Store (fs) │   │   →Pack      │   │  Result   │
//! └─────────────┘   └──────┬───────┘   └────┬─────┘
//!                          │                │
//!        ┌─────────────────┤                ▼
//!        ▼                 ▼           ┌──────────┐
//!   ┌──────────┐     ┌──────────┐     │  SQLite   │
//!   │   CLI    │     │   HTTP   │     │ usage log │
//!   │ (prism)  │     │ (serve)  │     └──────────┘
//!   └──────────┘     └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! prism init                              # create usage database
//! prism profiles                          # list registered profiles
//! prism pack "build api endpoint"         # route, score, pack, record
//! prism pack "fix css" --profile frontend # explicit profile
//! prism history --limit 20                # recent packing decisions
//! prism serve                             # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed error taxonomy |
//! | [`store`] | Manifest store access |
//! | [`registry`] | Profile registry loading |
//! | [`score`] | Task-to-document relevance scoring |
//! | [`route`] | Task-to-profile routing |
//! | [`pack`] | Tiered greedy context packing |
//! | [`recorder`] | SQLite usage recorder |
//! | [`engine`] | Engine assembly and the select pipeline |
//! | [`server`] | JSON HTTP service |

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pack;
pub mod recorder;
pub mod registry;
pub mod route;
pub mod score;
pub mod server;
pub mod store;
