//! # AEO Visibility
//!
//! Measures how often a brand shows up when an AI assistant answers
//! shopping questions in its market ("share of voice").
//!
//! A run asks a language model for realistic shopper queries per category,
//! then asks it to rank the top brands for each query and checks whether the
//! brand's name appears in the answer. The results are shown on a local
//! dashboard with a pie chart and a CSV download.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌────────────┐   ┌──────────────┐
//! │   Form   │──▶│  Discover  │──▶│  Presence  │──▶│ ResultsTable │
//! │ (server) │   │  queries   │   │  per query │   │  → session   │
//! └──────────┘   └─────┬──────┘   └─────┬──────┘   └──────┬───────┘
//!                      └──── ChatClient ┘                 ▼
//!                                                  dashboard / CSV
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! aeo init                      # write config/aeo.toml
//! export OPENAI_API_KEY=sk-...
//! aeo serve                     # open http://127.0.0.1:8501
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`llm`] | Chat-completion client abstraction |
//! | [`discover`] | Shopper query discovery |
//! | [`presence`] | Brand presence checks |
//! | [`analysis`] | Run orchestration |
//! | [`progress`] | Progress reporting |
//! | [`report`] | Share of voice, chart and CSV |
//! | [`session`] | Session-scoped results store |
//! | [`dashboard`] | HTML rendering |
//! | [`server`] | Dashboard HTTP server |
//! | [`logging`] | Tracing setup |

pub mod analysis;
pub mod config;
pub mod dashboard;
pub mod discover;
pub mod llm;
pub mod logging;
pub mod models;
pub mod presence;
pub mod progress;
pub mod report;
pub mod server;
pub mod session;
