//! Budget lines query engine.
//!
//! Serves paginated, filterable views over the `flatten_financial_lines`
//! materialized view: individual budget lines, drill-down aggregations,
//! and cached grand totals, all scoped to the caller's region.
//!
//! ```text
//!                 ┌─────────────────────────────┐
//!  request ──────▶│ params::LineQueryParams     │  parse + validate once
//!                 └──────────────┬──────────────┘
//!                                │
//!                 ┌──────────────▼──────────────┐
//!                 │ service::BudgetLinesService │  scope, orchestrate
//!                 └──────┬───────────────┬──────┘
//!                        │               │
//!          ┌─────────────▼─────┐   ┌─────▼──────────────┐
//!          │ composer::        │   │ total_cache::      │
//!          │ QueryComposer     │   │ TotalCache (LRU)   │
//!          └─────────┬─────────┘   └─────▲──────────────┘
//!                    │                   │ clear()
//!          ┌─────────▼─────────┐   ┌─────┴──────────────┐
//!          │ fetch (sqlx/PG)   │   │ listener (NOTIFY)  │
//!          └───────────────────┘   └────────────────────┘
//! ```
//!
//! The composer builds one WHERE clause per request and renders it twice:
//! onto the paginated data query and onto the totals query. Totals for
//! coarse filter sets are cached in an LRU, invalidated as a whole when
//! the ETL pipeline refreshes the view and notifies over Postgres.

pub mod composer;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geo;
pub mod listener;
pub mod model;
pub mod params;
pub mod registry;
pub mod service;
pub mod total_cache;
pub mod user;

pub use composer::QueryComposer;
pub use config::Config;
pub use error::{QueryError, Result};
pub use model::{DataType, FinancialLine, GroupedLine, Total};
pub use params::{LineQueryParams, RawLineQueryParams};
pub use service::{BudgetLinesService, LinesData, LinesPage};
pub use total_cache::{TotalCache, TotalCacheKey};
pub use user::ConnectedUser;
