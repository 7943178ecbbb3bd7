//! Filter validation against the reference tables.
//!
//! Validation and compilation are separate passes: once a filter passes here
//! it lowers to SQL without further checks. All methods report rejection by
//! returning `false`; only backend failures surface as errors. Existence
//! checks are batched so each filter costs at most one round trip per probe
//! kind, regardless of clause count.

use crate::error::Result;
use crate::model::{parse_seg_clause, GeoFilter, SegClause, SegFilter};
use crate::sql::predicate::classify_filter;
use crate::sql::queries;
use crate::store::{value_to_bool, value_to_i64, MarketStore};

pub struct Validator<'a> {
    store: &'a dyn MarketStore,
}

impl<'a> Validator<'a> {
    pub fn new(store: &'a dyn MarketStore) -> Self {
        Self { store }
    }

    /// An empty filter is always valid. Otherwise every clause must use a
    /// supported key combination whose values exist in the geography
    /// reference table; one bad clause invalidates the whole filter.
    pub async fn valid_geo_filter(&self, geo: &GeoFilter) -> Result<bool> {
        if geo.is_empty() {
            return Ok(true);
        }
        let combinations = match classify_filter(geo) {
            Some(combinations) => combinations,
            None => return Ok(false),
        };
        let query = queries::geo_exists(&combinations);
        let rows = self.store.fetch(&query).await?;
        Ok(first_cell_bool(&rows))
    }

    /// An empty filter is always valid. Exact codes must exist in the
    /// matching reference table; ranges are probed with symmetric bounds, so
    /// an inverted range passes validation (and later compiles to an empty
    /// match). A malformed range invalidates the filter.
    pub async fn valid_seg_filter(&self, seg: &SegFilter) -> Result<bool> {
        let (seg_type, raw_clauses) = match seg {
            SegFilter::Empty => return Ok(true),
            SegFilter::Filter { seg_type, clauses } => (*seg_type, clauses),
        };

        let mut codes = Vec::new();
        let mut ranges = Vec::new();
        for raw in raw_clauses {
            match parse_seg_clause(raw) {
                Err(_) => return Ok(false),
                Ok(None) => continue,
                Ok(Some(SegClause::Code(code))) => codes.push(code),
                Ok(Some(SegClause::Range { lo, hi })) => ranges.push((lo, hi)),
            }
        }

        if !codes.is_empty() {
            let mut distinct = codes.clone();
            distinct.sort();
            distinct.dedup();
            let query = queries::seg_codes_exist(seg_type, &distinct);
            let rows = self.store.fetch(&query).await?;
            if first_cell_i64(&rows) != distinct.len() as i64 {
                return Ok(false);
            }
        }

        if !ranges.is_empty() {
            let query = queries::seg_ranges_exist(seg_type, &ranges);
            let rows = self.store.fetch(&query).await?;
            if !first_cell_bool(&rows) {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Every demand query needs at least one product; each id must have
    /// ratio rows.
    pub async fn valid_products(&self, products: &[String]) -> Result<bool> {
        if products.is_empty() {
            return Ok(false);
        }
        let mut distinct = products.to_vec();
        distinct.sort();
        distinct.dedup();
        let query = queries::products_exist(&distinct);
        let rows = self.store.fetch(&query).await?;
        Ok(first_cell_i64(&rows) == distinct.len() as i64)
    }

    /// A location identifier is exactly 9 characters once stringified.
    pub fn valid_duns(&self, duns: &str) -> bool {
        duns.len() == 9
    }

    /// The group-by token must name one of the enumerated dimensions.
    pub fn valid_group_by(&self, token: &str) -> bool {
        crate::model::GroupBy::parse(token).is_some()
    }
}

fn first_cell_bool(rows: &[Vec<serde_json::Value>]) -> bool {
    rows.first()
        .and_then(|row| row.first())
        .map(value_to_bool)
        .unwrap_or(false)
}

fn first_cell_i64(rows: &[Vec<serde_json::Value>]) -> i64 {
    rows.first()
        .and_then(|row| row.first())
        .map(value_to_i64)
        .unwrap_or(0)
}
