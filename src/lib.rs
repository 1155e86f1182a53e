//! taskmaster - task management with productivity analytics
//!
//! This library provides the core functionality for the taskmaster CLI:
//! a file-backed task store and the analytics computed over it.
//!
//! # Core Concepts
//!
//! - **Tasks**: titled work items with status, priority, due date, category and tags
//! - **Effective priority**: OVERDUE replaces the stored priority of open tasks past due
//! - **Ordering**: open tasks before completed ones, then a per-field comparator
//! - **Analytics**: period-filtered overview, trends, productivity and streaks
//! - **Lifetime totals**: created/completed counters that survive deletion
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `taskmaster.toml`
//! - `error`: Error types and result aliases
//! - `lock`: File locking and atomic writes
//! - `storage`: Data directory layout and JSON documents
//! - `task`, `category`, `tag`: record models and their stores
//! - `store`: task store, filters and the `TaskSource` read contract
//! - `derived`: overdue detection and effective priority
//! - `ordering`: sorting and pagination
//! - `streak`, `trends`, `analytics`: report computations
//! - `lifetime`: lifetime counters
//! - `upload`: image attachments
//! - `output`: JSON envelope and human output

pub mod analytics;
pub mod category;
pub mod cli;
pub mod config;
pub mod derived;
pub mod error;
pub mod lifetime;
pub mod lock;
pub mod ordering;
pub mod output;
pub mod storage;
pub mod store;
pub mod streak;
pub mod tag;
pub mod task;
pub mod trends;
pub mod upload;

pub use error::{Error, Result};
