//! In-memory store fixture shared by the integration tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use marketscope::sql::{BuiltQuery, Param};
use marketscope::{MarketStore, Result};

/// A fake store: answers the validator's existence probes from in-memory
/// reference sets and hands back canned rows for everything else. Records
/// every executed query for assertions.
pub struct FakeStore {
    pub geo_known: bool,
    pub sic_codes: HashSet<String>,
    pub naics_codes: HashSet<String>,
    pub products: HashSet<String>,
    pub rows: Vec<Vec<Value>>,
    pub log: Mutex<Vec<BuiltQuery>>,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            geo_known: true,
            sic_codes: ["1234", "5000", "5500", "5999"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            naics_codes: ["541511", "541512"].iter().map(|s| s.to_string()).collect(),
            products: ["P1", "P2"].iter().map(|s| s.to_string()).collect(),
            rows: Vec::new(),
            log: Mutex::new(Vec::new()),
        }
    }
}

impl FakeStore {
    pub fn with_rows(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|q| q.sql.clone()).collect()
    }

    fn first_text_array<'a>(&self, query: &'a BuiltQuery) -> &'a [String] {
        query
            .params
            .iter()
            .find_map(|p| match p {
                Param::TextArray(items) => Some(items.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    fn code_set(&self, sql: &str) -> &HashSet<String> {
        if sql.contains("from naics s") {
            &self.naics_codes
        } else {
            &self.sic_codes
        }
    }
}

#[async_trait]
impl MarketStore for FakeStore {
    async fn fetch(&self, query: &BuiltQuery) -> Result<Vec<Vec<Value>>> {
        self.log.lock().unwrap().push(query.clone());
        let sql = query.sql.as_str();

        // Validator probes, matched on their fixed SQL shapes.
        if sql.contains("from geo l where") {
            return Ok(vec![vec![Value::Bool(self.geo_known)]]);
        }
        if sql.contains("between least(") {
            let set = self.code_set(sql);
            let pairs: Vec<&String> = query
                .params
                .iter()
                .filter_map(|p| match p {
                    Param::Text(s) => Some(s),
                    _ => None,
                })
                .collect();
            let mut all_found = true;
            for pair in pairs.chunks(2) {
                let (lo, hi) = (pair[0].min(pair[1]), pair[0].max(pair[1]));
                if !set.iter().any(|c| c >= lo && c <= hi) {
                    all_found = false;
                }
            }
            return Ok(vec![vec![Value::Bool(all_found)]]);
        }
        if sql.contains("count(distinct s.") {
            let set = self.code_set(sql);
            let requested = self.first_text_array(query);
            let count = requested.iter().filter(|c| set.contains(*c)).count();
            return Ok(vec![vec![Value::from(count as i64)]]);
        }
        if sql.contains("count(distinct r.product_id)") {
            let requested = self.first_text_array(query);
            let count = requested.iter().filter(|p| self.products.contains(*p)).count();
            return Ok(vec![vec![Value::from(count as i64)]]);
        }

        Ok(self.rows.clone())
    }
}
