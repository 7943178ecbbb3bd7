//! The aggregation engine: the operations the API layer calls.
//!
//! Every operation validates all of its inputs up front, compiles the
//! filters, resolves an extent, runs one aggregate query through the
//! request-scoped store handle, and post-processes rows (integer coercion,
//! running totals). Output structs serialize with camelCase field names;
//! that casing is the stable contract.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::MarketscopeConfig;
use crate::error::{MarketscopeError, Result};
use crate::extent::{min_extent, resolve_extent};
use crate::model::{GeoFilter, GroupBy, SegFilter, SegType};
use crate::sql::queries;
use crate::store::{value_to_i64, MarketStore};
use crate::validate::Validator;

/// A demand table: header, rows, and running totals over the returned rows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandTable {
    pub header: Vec<&'static str>,
    pub results: Vec<Vec<Value>>,
    pub demand: i64,
    pub companies: i64,
}

/// Company counts per (company size, industry code) cell.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicsTable {
    pub header: Vec<&'static str>,
    pub results: Vec<Vec<Value>>,
    pub total: i64,
}

/// Grand totals with no grouping dimension.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalRow {
    pub header: Vec<&'static str>,
    pub demand: i64,
    pub companies: i64,
}

/// Single-location demand estimate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDemand {
    pub duns: String,
    pub demand: i64,
}

/// Product catalog listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCatalog {
    pub header: Vec<&'static str>,
    pub results: Vec<Vec<Value>>,
}

/// The market model, scoped to one request's store handle.
pub struct MarketModel<'a> {
    store: &'a dyn MarketStore,
    config: &'a MarketscopeConfig,
}

impl<'a> MarketModel<'a> {
    pub fn new(store: &'a dyn MarketStore, config: &'a MarketscopeConfig) -> Self {
        Self { store, config }
    }

    fn validator(&self) -> Validator<'a> {
        Validator::new(self.store)
    }

    /// Validate the filter triple every aggregate operation takes, failing
    /// fast before any aggregate query runs.
    async fn check_filters(
        &self,
        geo: &GeoFilter,
        seg: &SegFilter,
        products: &[String],
    ) -> Result<()> {
        let validator = self.validator();
        if !validator.valid_geo_filter(geo).await? {
            return Err(MarketscopeError::invalid(
                "geo_filter",
                serde_json::to_string(geo)?,
            ));
        }
        if !validator.valid_seg_filter(seg).await? {
            return Err(MarketscopeError::invalid(
                "seg_filter",
                serde_json::to_string(seg)?,
            ));
        }
        if !validator.valid_products(products).await? {
            return Err(MarketscopeError::invalid("products", products.join(",")));
        }
        Ok(())
    }

    /// Demand grouped by the requested dimension.
    ///
    /// Geographic group-bys and company_size aggregate over the resolved
    /// extent table; sic/naics aggregate per code with descriptions joined
    /// in; `company` returns a flat ranked prospect listing capped at
    /// `limit` (config default when absent).
    pub async fn demand(
        &self,
        group_by: GroupBy,
        geo: &GeoFilter,
        seg: &SegFilter,
        products: &[String],
        limit: Option<i64>,
    ) -> Result<DemandTable> {
        self.check_filters(geo, seg, products).await?;

        let extent = resolve_extent(min_extent(geo), group_by);
        tracing::debug!(group_by = ?group_by, extent = ?extent, "demand query");

        let query = match group_by {
            GroupBy::Company => {
                let limit = self.config.effective_prospect_limit(limit);
                queries::prospects(geo, seg, products, limit)?
            }
            GroupBy::Sic => queries::seg_demand(SegType::Sic, extent, geo, seg, products)?,
            GroupBy::Naics => queries::seg_demand(SegType::Naics, extent, geo, seg, products)?,
            GroupBy::CompanySize => queries::company_size_demand(extent, geo, seg, products)?,
            _ => queries::geo_demand(group_by, extent, geo, seg, products)?,
        };

        let rows = self.store.fetch(&query).await?;
        let header = queries::demand_header(group_by);

        let mut results = Vec::with_capacity(rows.len());
        let mut total_demand = 0i64;
        let mut total_companies = 0i64;
        for mut row in rows {
            if row.is_empty() {
                continue;
            }
            if group_by == GroupBy::Company {
                // Flat listing: demand is the last column, one company per row.
                let demand = coerce_last(&mut row, 1);
                total_demand += demand;
                total_companies += 1;
            } else {
                let companies = coerce_last(&mut row, 1);
                let demand = coerce_last(&mut row, 2);
                total_demand += demand;
                total_companies += companies;
            }
            results.push(row);
        }

        Ok(DemandTable {
            header,
            results,
            demand: total_demand,
            companies: total_companies,
        })
    }

    /// Company counts per (company_size, sic, description) cell.
    pub async fn demographics(
        &self,
        geo: &GeoFilter,
        seg: &SegFilter,
        products: &[String],
    ) -> Result<DemographicsTable> {
        self.check_filters(geo, seg, products).await?;

        let extent = min_extent(geo);
        tracing::debug!(extent = ?extent, "demographics query");
        let query = queries::demographics(extent, geo, seg, products)?;
        let rows = self.store.fetch(&query).await?;

        let mut results = Vec::with_capacity(rows.len());
        let mut total = 0i64;
        for mut row in rows {
            if row.is_empty() {
                continue;
            }
            total += coerce_last(&mut row, 1);
            results.push(row);
        }

        Ok(DemographicsTable {
            header: vec!["companySize", "sic", "description", "companies"],
            results,
            total,
        })
    }

    /// Grand totals for the filter set. A filter matching nothing is zeroes,
    /// not an error.
    pub async fn total(
        &self,
        geo: &GeoFilter,
        seg: &SegFilter,
        products: &[String],
    ) -> Result<TotalRow> {
        self.check_filters(geo, seg, products).await?;

        let extent = min_extent(geo);
        tracing::debug!(extent = ?extent, "total query");
        let query = queries::total(extent, geo, seg, products)?;
        let rows = self.store.fetch(&query).await?;

        let (demand, companies) = match rows.first() {
            Some(row) if row.len() >= 2 => (value_to_i64(&row[0]), value_to_i64(&row[1])),
            _ => (0, 0),
        };

        Ok(TotalRow {
            header: vec!["demand", "companies"],
            demand,
            companies,
        })
    }

    /// Demand estimate for one location. A duns with no matching ratio rows
    /// estimates to zero, not an error.
    pub async fn location_demand(
        &self,
        duns: &str,
        products: &[String],
    ) -> Result<LocationDemand> {
        let validator = self.validator();
        if !validator.valid_duns(duns) {
            return Err(MarketscopeError::invalid("duns", duns));
        }
        if !validator.valid_products(products).await? {
            return Err(MarketscopeError::invalid("products", products.join(",")));
        }

        let query = queries::location_demand(duns, products);
        let rows = self.store.fetch(&query).await?;

        let demand = rows
            .first()
            .and_then(|row| row.get(1))
            .map(value_to_i64)
            .unwrap_or(0);

        Ok(LocationDemand {
            duns: duns.to_string(),
            demand,
        })
    }

    /// Product catalog, optionally narrowed to one category. Unvalidated by
    /// design: an unknown category lists nothing.
    pub async fn product_list(&self, category: Option<&str>) -> Result<ProductCatalog> {
        let query = queries::product_list(category);
        let results = self.store.fetch(&query).await?;
        Ok(ProductCatalog {
            header: vec!["id", "description", "type", "category", "extendedDescription"],
            results,
        })
    }

    /// Single product lookup. Unvalidated by design: an unknown id returns
    /// an empty mapping, not an error. Callers that need validation run
    /// `valid_products` first.
    pub async fn product(&self, product_id: &str) -> Result<Map<String, Value>> {
        let query = queries::product(product_id);
        let rows = self.store.fetch(&query).await?;

        let mut product = Map::new();
        if let Some(row) = rows.first() {
            let keys = ["productId", "description", "type", "category", "extended"];
            for (key, value) in keys.iter().zip(row.iter()) {
                product.insert(key.to_string(), value.clone());
            }
        }
        Ok(product)
    }

    /// Version marker of the dataset snapshot currently loaded.
    pub async fn fingerprint(&self) -> Result<String> {
        let query = queries::fingerprint();
        let rows = self.store.fetch(&query).await?;
        rows.first()
            .and_then(|row| row.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| MarketscopeError::Execution("version table is empty".to_string()))
    }
}

/// Coerce the column `offset` places from the end of the row to a plain
/// integer in place, returning it.
fn coerce_last(row: &mut [Value], offset: usize) -> i64 {
    if row.len() < offset {
        return 0;
    }
    let idx = row.len() - offset;
    let coerced = value_to_i64(&row[idx]);
    row[idx] = Value::from(coerced);
    coerced
}
