//! MCP server module.
//!
//! Contains the MCP server implementation with tool handlers.

pub mod server;

pub use server::{InsightsServer, Sheets};
pub use server::{
    DateInput, DownloadsInput, MarketValueInput, MonthInput, PublishKpisInput, QueryInput,
    WeekInput,
};
