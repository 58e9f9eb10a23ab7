//! # maildigest-core
//!
//! Core pipeline for the mail digest system.
//!
//! This crate provides:
//! - **Content extraction** - raw message to normalized content bundle
//!   (text, HTML-derived text, links, attachments, structured data)
//! - **Classification** - message type, routing category, and two
//!   importance scales over keyword rule lists
//! - **Key-information extraction** - summaries, highlights, action items
//! - **Daily aggregation** - per-run statistics with count invariants
//! - **History store** - flat JSON log of daily aggregates
//! - **Trend analysis** - volume/keyword/importance/category trends
//! - **Report rendering** - markdown digests and structured output

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod aggregate;
pub mod attachment;
pub mod classify;
pub mod config;
pub mod content;
mod error;
pub mod history;
pub mod keyinfo;
pub mod message;
pub mod pipeline;
pub mod report;
pub mod service;
pub mod trends;

pub use aggregate::{DailyAggregate, DataPoint, DataPointKind, UrgentItem, aggregate_daily};
pub use attachment::{
    AttachmentDecoder, AttachmentDescriptor, AttachmentKind, AttachmentSummary, BasicDecoder,
};
pub use classify::{Category, MessageType, Priority, Severity};
pub use config::Settings;
pub use content::{ContentBundle, StructuredData, extract_content};
pub use error::{Error, Result};
pub use history::{HistoryComparison, HistoryStore, compare_with_history};
pub use keyinfo::{DecisionInfo, KeyInfo, extract_key_info};
pub use message::{AnalyzedMessage, analyze_message};
pub use pipeline::{
    HeartbeatAlert, OutputFormat, run_daily, run_heartbeat, run_trends,
};
pub use report::{RunReport, render_digest, render_failure_digest, render_trend_report};
pub use trends::{TrendAnalysis, analyze_trends, generate_insights};
