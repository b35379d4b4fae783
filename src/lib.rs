//! # ragserve
//!
//! A retrieval-grounded prompting service with answer caching.
//!
//! Given a free-text question, ragserve decides which ingested documents and
//! database tables are relevant, tries to answer directly from their content,
//! and otherwise delegates to a generative model with grounded context. A
//! normalized-key response cache absorbs repeated and paraphrased questions.
//!
//! ## Architecture
//!
//! ```text
//!             query
//!               │
//!        ┌──────▼───────┐   hit
//!        │ ResponseCache │────────▶ answer
//!        └──────┬───────┘
//!          miss │
//!     ┌─────────┴──────────┐    (concurrent)
//!     ▼                    ▼
//! ┌─────────┐        ┌──────────┐
//! │Documents │        │  Tables  │   rank + retrieve
//! │ (files)  │        │ (SQLite) │   via ContentCache
//! └────┬────┘        └────┬─────┘
//!      └────────┬─────────┘
//!               ▼
//!       ┌──────────────┐  confident
//!       │ DirectAnswer │───────────▶ answer
//!       └──────┬───────┘
//!              ▼ otherwise
//!       ┌──────────────┐
//!       │  Generative  │───────────▶ answer
//!       │    model     │
//!       └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`keywords`] | Keyword extraction (Hangul-aware) |
//! | [`fuzzy`] | Bounded edit-distance matching |
//! | [`rank`] | Weighted relevance scoring |
//! | [`answer`] | Direct-answer extraction |
//! | [`normalize`] | Cache-key normalization |
//! | [`cache`] | Bounded in-memory caches |
//! | [`extract`] | PDF/PPTX/DOCX/text extraction |
//! | [`documents`] | Document registry and discovery |
//! | [`tables`] | SQLite row-store collaborator |
//! | [`generate`] | Generative-model client |
//! | [`orchestrate`] | End-to-end query pipeline |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`logging`] | Tracing subscriber setup |

pub mod answer;
pub mod cache;
pub mod config;
pub mod db;
pub mod documents;
pub mod extract;
pub mod fuzzy;
pub mod generate;
pub mod keywords;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod orchestrate;
pub mod rank;
pub mod server;
pub mod tables;
