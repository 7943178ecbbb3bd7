//! Market-sizing query core.
//!
//! Answers "how much demand exists for product X in geography Y, segmented
//! by industry Z" against a relational dataset of business locations,
//! industry classifications and geography. The pipeline: normalize inbound
//! filters, validate them against reference tables, compile them into
//! parameterized predicates, pick the right pre-aggregated extent table,
//! and run one aggregate query per operation.

pub mod config;
pub mod engine;
pub mod error;
pub mod extent;
pub mod model;
pub mod sql;
pub mod store;
pub mod validate;

pub use config::MarketscopeConfig;
pub use engine::{
    DemandTable, DemographicsTable, LocationDemand, MarketModel, ProductCatalog, TotalRow,
};
pub use error::{MarketscopeError, Result};
pub use extent::{min_extent, resolve_extent, Extent};
pub use model::{GeoClause, GeoFilter, GeoLevel, GroupBy, SegFilter, SegType};
pub use store::{MarketStore, PgPool, PgSession};
pub use validate::Validator;
