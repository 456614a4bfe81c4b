//! Report assemblers and sheet publishers.

pub mod monthly;
pub mod publish;
pub mod weekly;

pub use monthly::{monthly_report, stables_report, tvl_report};
pub use publish::{publish_monthly, publish_weekly, KpiSheet};
pub use weekly::{developer_report, kpis_report, weekly_tvl_report};
