//! Canonical filter and dimension types.
//!
//! Inbound filters arrive in several wire shapes (compact strings, structured
//! objects, or nothing at all). Normalization happens exactly once, in the
//! `Deserialize` impls and `from_compact` constructors here; everything past
//! this module operates on the canonical variants only. Normalization never
//! rejects input: malformed clauses are carried through unchanged so the
//! validator stays the single authority on rejection.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::extent::Extent;

/// A recognized geography level name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoLevel {
    Nation,
    Region,
    State,
    StateAbbrev,
    Msa,
    County,
    CountyFips,
    PostalCode,
}

impl GeoLevel {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "nation" => Some(Self::Nation),
            "region" => Some(Self::Region),
            "state" => Some(Self::State),
            "state_abbrev" => Some(Self::StateAbbrev),
            "msa" => Some(Self::Msa),
            "county" => Some(Self::County),
            "county_fips" => Some(Self::CountyFips),
            "postal_code" => Some(Self::PostalCode),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nation => "nation",
            Self::Region => "region",
            Self::State => "state",
            Self::StateAbbrev => "state_abbrev",
            Self::Msa => "msa",
            Self::County => "county",
            Self::CountyFips => "county_fips",
            Self::PostalCode => "postal_code",
        }
    }

    /// The geography granularity this level pins a filter to.
    pub fn extent(self) -> Extent {
        match self {
            Self::Nation => Extent::Nation,
            Self::Region => Extent::Region,
            Self::State | Self::StateAbbrev => Extent::State,
            Self::Msa => Extent::Msa,
            Self::County | Self::CountyFips => Extent::County,
            Self::PostalCode => Extent::PostalCode,
        }
    }
}

/// One clause of a geo filter: level-name keys mapped to values.
///
/// Keys stay plain strings so unrecognized level names survive normalization
/// and reach the validator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeoClause(pub BTreeMap<String, String>);

impl GeoClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, level: GeoLevel) -> Option<&str> {
        self.0.get(level.as_str()).map(String::as_str)
    }

    /// Human-readable description of the clause, coarsest level first.
    pub fn describe(&self) -> String {
        if self.is_empty() {
            return "North America".to_string();
        }
        let order = [
            GeoLevel::Nation,
            GeoLevel::Region,
            GeoLevel::State,
            GeoLevel::StateAbbrev,
            GeoLevel::Msa,
            GeoLevel::County,
            GeoLevel::CountyFips,
            GeoLevel::PostalCode,
        ];
        let mut words = String::new();
        for level in order {
            if let Some(value) = self.get(level) {
                if !words.is_empty() {
                    words.push_str(" - ");
                }
                words.push_str(value);
            }
        }
        words
    }
}

/// A geo filter: either unrestricted or a disjunction of clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GeoFilter {
    #[default]
    Empty,
    Clauses(Vec<GeoClause>),
}

/// Dot positions of the compact geo string form `NATION.STATE_ABBREV.COUNTY_FIPS.POSTAL_CODE`.
const COMPACT_GEO_LEVELS: [GeoLevel; 4] = [
    GeoLevel::Nation,
    GeoLevel::StateAbbrev,
    GeoLevel::CountyFips,
    GeoLevel::PostalCode,
];

impl GeoFilter {
    pub fn clauses(&self) -> &[GeoClause] {
        match self {
            Self::Empty => &[],
            Self::Clauses(clauses) => clauses,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses().is_empty()
    }

    /// Build from a clause list, dropping empty clauses. `[{}]` and `[]`
    /// both normalize to `Empty` (no restriction).
    pub fn from_clauses(clauses: Vec<GeoClause>) -> Self {
        let clauses: Vec<_> = clauses.into_iter().filter(|c| !c.is_empty()).collect();
        if clauses.is_empty() {
            Self::Empty
        } else {
            Self::Clauses(clauses)
        }
    }

    /// Parse the compact string form: comma-separated alternatives of
    /// dot-separated hierarchy levels, e.g. `"US.CO.037,US.WY"`.
    ///
    /// Extra dot segments past the known hierarchy map to synthetic level
    /// names, which the validator then rejects; this keeps normalization
    /// total.
    pub fn from_compact(compact: &str) -> Self {
        if compact.trim().is_empty() {
            return Self::Empty;
        }
        let mut clauses = Vec::new();
        for alt in compact.split(',') {
            if alt.is_empty() {
                continue;
            }
            let mut clause = GeoClause::new();
            for (idx, part) in alt.split('.').enumerate() {
                let key = match COMPACT_GEO_LEVELS.get(idx) {
                    Some(level) => level.as_str().to_string(),
                    None => format!("level_{idx}"),
                };
                clause.0.insert(key, part.to_string());
            }
            clauses.push(clause);
        }
        Self::from_clauses(clauses)
    }
}

impl<'de> Deserialize<'de> for GeoFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => GeoFilter::Empty,
            Value::String(s) => GeoFilter::from_compact(&s),
            Value::Object(map) => GeoFilter::from_clauses(vec![clause_from_map(map)]),
            Value::Array(items) => {
                let clauses = items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(map) => clause_from_map(map),
                        other => {
                            // Carried through under a key no level matches, so
                            // the validator rejects it.
                            let mut clause = GeoClause::new();
                            clause.0.insert("_raw".to_string(), value_to_string(&other));
                            clause
                        }
                    })
                    .collect();
                GeoFilter::from_clauses(clauses)
            }
            other => {
                return Err(serde::de::Error::custom(format!(
                    "geo filter must be null, a string, an object or an array, got {other}"
                )))
            }
        })
    }
}

impl Serialize for GeoFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Clauses(clauses) => {
                let mut seq = serializer.serialize_seq(Some(clauses.len()))?;
                for clause in clauses {
                    seq.serialize_element(&ClauseMap(clause))?;
                }
                seq.end()
            }
        }
    }
}

struct ClauseMap<'a>(&'a GeoClause);

impl Serialize for ClauseMap<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0 .0.len()))?;
        for (k, v) in &self.0 .0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn clause_from_map(map: serde_json::Map<String, Value>) -> GeoClause {
    let mut clause = GeoClause::new();
    for (key, value) in map {
        clause.0.insert(key, value_to_string(&value));
    }
    clause
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Industry classification scheme of a segment filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegType {
    Sic,
    Naics,
}

impl SegType {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "sic" => Some(Self::Sic),
            "naics" => Some(Self::Naics),
            _ => None,
        }
    }

    /// Both the reference table and the code column share this name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sic => "sic",
            Self::Naics => "naics",
        }
    }
}

impl fmt::Display for SegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed segment clause: an exact code or a closed range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegClause {
    Code(String),
    Range { lo: String, hi: String },
}

/// A range clause that did not split into exactly two parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MalformedRange;

/// Parse one raw segment clause. Empty clauses are skipped (`Ok(None)`);
/// a range with anything other than two parts is malformed.
pub fn parse_seg_clause(raw: &str) -> Result<Option<SegClause>, MalformedRange> {
    if raw.is_empty() {
        return Ok(None);
    }
    if raw.contains(':') {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() != 2 {
            return Err(MalformedRange);
        }
        Ok(Some(SegClause::Range {
            lo: parts[0].to_string(),
            hi: parts[1].to_string(),
        }))
    } else {
        Ok(Some(SegClause::Code(raw.to_string())))
    }
}

/// A segment (industry) filter: unrestricted, or raw clauses scoped to one
/// classification scheme. Clauses stay raw strings canonically; parsing is
/// shared between the validator and the predicate compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SegFilter {
    #[default]
    Empty,
    Filter {
        seg_type: SegType,
        clauses: Vec<String>,
    },
}

impl SegFilter {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn from_parts(seg_type: SegType, clauses: Vec<String>) -> Self {
        let clauses: Vec<_> = clauses.into_iter().filter(|c| !c.is_empty()).collect();
        if clauses.is_empty() {
            Self::Empty
        } else {
            Self::Filter { seg_type, clauses }
        }
    }

    /// Parse the compact string form: comma-separated codes and `lo:hi`
    /// ranges. The digit count of the first code picks the scheme (4 digits
    /// is SIC, 6 is NAICS); anything else defaults to SIC.
    pub fn from_compact(compact: &str) -> Self {
        if compact.trim().is_empty() {
            return Self::Empty;
        }
        let clauses: Vec<String> = compact
            .split(',')
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        let seg_type = infer_seg_type(&clauses);
        Self::from_parts(seg_type, clauses)
    }
}

fn infer_seg_type(clauses: &[String]) -> SegType {
    let first_code = clauses
        .first()
        .map(|c| c.split(':').next().unwrap_or(""))
        .unwrap_or("");
    if first_code.len() == 6 {
        SegType::Naics
    } else {
        SegType::Sic
    }
}

impl<'de> Deserialize<'de> for SegFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::Null => SegFilter::Empty,
            Value::String(s) => SegFilter::from_compact(&s),
            other => {
                #[derive(Deserialize)]
                struct Structured {
                    seg_type: SegType,
                    filter: Option<Value>,
                }
                let structured =
                    Structured::deserialize(other).map_err(serde::de::Error::custom)?;
                let clauses = match structured.filter {
                    None | Some(Value::Null) => Vec::new(),
                    Some(Value::String(s)) => {
                        s.split(',').filter(|c| !c.is_empty()).map(str::to_string).collect()
                    }
                    Some(Value::Array(items)) => {
                        items.iter().map(value_to_string).collect()
                    }
                    Some(other) => vec![value_to_string(&other)],
                };
                SegFilter::from_parts(structured.seg_type, clauses)
            }
        })
    }
}

impl Serialize for SegFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Empty => serializer.serialize_none(),
            Self::Filter { seg_type, clauses } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("seg_type", seg_type)?;
                map.serialize_entry("filter", clauses)?;
                map.end()
            }
        }
    }
}

/// The requested output dimension of a demand query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Nation,
    Region,
    State,
    Msa,
    County,
    PostalCode,
    Sic,
    Naics,
    Company,
    CompanySize,
}

impl GroupBy {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "nation" => Some(Self::Nation),
            "region" => Some(Self::Region),
            "state" => Some(Self::State),
            "msa" => Some(Self::Msa),
            "county" => Some(Self::County),
            "postal_code" => Some(Self::PostalCode),
            "sic" => Some(Self::Sic),
            "naics" => Some(Self::Naics),
            "company" => Some(Self::Company),
            "company_size" => Some(Self::CompanySize),
            _ => None,
        }
    }

    /// The geography granularity a group-by dimension inherently needs,
    /// if it is a geographic dimension at all.
    pub fn natural_extent(self) -> Option<Extent> {
        match self {
            Self::Nation => Some(Extent::Nation),
            Self::Region => Some(Extent::Region),
            Self::State => Some(Extent::State),
            Self::Msa => Some(Extent::Msa),
            Self::County => Some(Extent::County),
            Self::PostalCode => Some(Extent::PostalCode),
            Self::Sic | Self::Naics | Self::Company | Self::CompanySize => None,
        }
    }
}
