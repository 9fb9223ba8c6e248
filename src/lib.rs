//! pagescore - Web page audit scoring engine
//!
//! Takes the raw artifacts gathered from one page load, derives shared
//! computed artifacts at most once per run, runs every configured audit in
//! isolation and rolls the results up into weighted category scores and
//! one overall score.
//!
//! ```text
//! Artifacts ─▶ AuditRunner ─▶ AuditResult map ─▶ scoring ─▶ ReportResult ─▶ reporters
//!                  │
//!                  └─▶ ComputedCache (memoized derived artifacts)
//! ```

pub mod artifacts;
pub mod audits;
pub mod cli;
pub mod computed;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod reporters;
pub mod scoring;

pub use artifacts::Artifacts;
pub use config::ReportConfig;
pub use models::{AuditResult, ReportResult};
pub use pipeline::{Pipeline, RunOutput};
