//! Algorand Insights MCP Server Library
//!
//! A Model Context Protocol server that gathers Algorand network metrics and
//! assembles comparative reports from them.
//!
//! # Features
//!
//! - **Metric Lookups**: TVL, price, stablecoins, RWA, nodes, ranking, downloads
//! - **Reports**: Month-over-month insights and week-over-week KPIs
//! - **Publishing**: Write reports into Google Sheets tabs
//!
//! # Example
//!
//! ```rust,ignore
//! use algo_insights_mcp::{Config, InsightsServer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let server = InsightsServer::new(config)?;
//!     // Run server...
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mcp;
pub mod reports;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::{AppError, Result};
pub use mcp::InsightsServer;
