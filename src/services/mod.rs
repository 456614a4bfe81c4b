//! External data sources and the spreadsheet service.

pub mod coingecko;
pub mod defillama;
pub mod devs;
pub mod downloads;
pub mod google;
pub mod http;
pub mod nodes;
pub mod queries;
pub mod ranking;
pub mod sheets;
pub mod source;
pub mod warehouse;

pub use coingecko::{CoinGeckoService, MarketField};
pub use defillama::DefiLlamaService;
pub use google::GoogleAuth;
pub use queries::{NamedQuery, QueryCatalog};
pub use sheets::{GoogleSheetsClient, SheetWriter};
pub use source::{HttpMetricSource, MetricSource};
pub use warehouse::{QueryRow, WarehouseService};
