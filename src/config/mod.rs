//! Configuration module for pagescore
//!
//! This module handles:
//! - Category definitions, audit refs and weights
//! - Overall-score category weights
//! - Per-audit option overrides
//! - Run settings (locale, filters, opaque pass-through values)

mod report_config;

pub use report_config::{
    filter_config, load_config, load_project_config, AuditRefConfig, AuditSettings,
    CategoryConfig, GroupConfig, ReportConfig, Settings, DEFAULT_CONFIG_TOML,
};
