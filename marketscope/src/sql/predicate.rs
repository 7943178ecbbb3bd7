//! Predicate compilation: lowering validated filters into a structured
//! boolean tree, then rendering the tree with bound placeholders.
//!
//! The tree is the safe intermediate representation between filters and SQL.
//! Rendering only ever concatenates column names from the closed [`Column`]
//! enum and `$n` placeholders; values go through parameter binding.

use crate::error::{MarketscopeError, Result};
use crate::model::{parse_seg_clause, GeoClause, GeoFilter, GeoLevel, SegClause, SegFilter, SegType};
use crate::sql::{BuiltQuery, Param};

/// Columns a predicate may reference. The closed set is what makes
/// identifier concatenation safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Nation,
    Region,
    State,
    StateAbbrev,
    Msa,
    County,
    CountyFips,
    PostalCode,
    Sic,
    Naics,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Self::Nation => "nation",
            Self::Region => "region",
            Self::State => "state",
            Self::StateAbbrev => "state_abbrev",
            Self::Msa => "msa",
            Self::County => "county",
            Self::CountyFips => "county_fips",
            Self::PostalCode => "postal_code",
            Self::Sic => "sic",
            Self::Naics => "naics",
        }
    }

    fn for_level(level: GeoLevel) -> Self {
        match level {
            GeoLevel::Nation => Self::Nation,
            GeoLevel::Region => Self::Region,
            GeoLevel::State => Self::State,
            GeoLevel::StateAbbrev => Self::StateAbbrev,
            GeoLevel::Msa => Self::Msa,
            GeoLevel::County => Self::County,
            GeoLevel::CountyFips => Self::CountyFips,
            GeoLevel::PostalCode => Self::PostalCode,
        }
    }

    pub fn for_seg_type(seg_type: SegType) -> Self {
        match seg_type {
            SegType::Sic => Self::Sic,
            SegType::Naics => Self::Naics,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Gte,
    Lte,
}

impl CmpOp {
    fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

/// A compiled boolean predicate over one table alias.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Always true; what an absent filter compiles to.
    True,
    Compare {
        column: Column,
        op: CmpOp,
        value: String,
    },
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
}

impl Predicate {
    pub fn eq(column: Column, value: impl Into<String>) -> Self {
        Self::Compare {
            column,
            op: CmpOp::Eq,
            value: value.into(),
        }
    }

    /// Render into SQL text, binding every value on `query`. The alias must
    /// come from a caller-side literal, never from user input.
    pub fn render(&self, alias: &str, query: &mut BuiltQuery) -> String {
        match self {
            Self::True => "1=1".to_string(),
            Self::Compare { column, op, value } => {
                let placeholder = query.bind(Param::Text(value.clone()));
                format!("{alias}.{} {} {placeholder}", column.name(), op.as_str())
            }
            Self::AllOf(parts) => join_rendered(parts, " and ", alias, query),
            Self::AnyOf(parts) => join_rendered(parts, " or ", alias, query),
        }
    }
}

fn join_rendered(parts: &[Predicate], sep: &str, alias: &str, query: &mut BuiltQuery) -> String {
    let rendered: Vec<String> = parts.iter().map(|p| p.render(alias, query)).collect();
    format!("({})", rendered.join(sep))
}

/// One of the supported geo clause key combinations.
///
/// State and county accept their abbrev/FIPS aliases; the concrete column is
/// carried so compilation targets whichever the clause actually used.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoCombination {
    Nation {
        nation: String,
    },
    Region {
        nation: String,
        region: String,
    },
    State {
        nation: String,
        state: (Column, String),
    },
    Msa {
        nation: String,
        msa: String,
    },
    County {
        nation: String,
        state: (Column, String),
        county: (Column, String),
    },
}

impl GeoCombination {
    pub fn to_predicate(&self) -> Predicate {
        match self {
            Self::Nation { nation } => {
                Predicate::AllOf(vec![Predicate::eq(Column::Nation, nation.clone())])
            }
            Self::Region { nation, region } => Predicate::AllOf(vec![
                Predicate::eq(Column::Nation, nation.clone()),
                Predicate::eq(Column::Region, region.clone()),
            ]),
            Self::State { nation, state } => Predicate::AllOf(vec![
                Predicate::eq(Column::Nation, nation.clone()),
                Predicate::eq(state.0, state.1.clone()),
            ]),
            Self::Msa { nation, msa } => Predicate::AllOf(vec![
                Predicate::eq(Column::Nation, nation.clone()),
                Predicate::eq(Column::Msa, msa.clone()),
            ]),
            Self::County {
                nation,
                state,
                county,
            } => Predicate::AllOf(vec![
                Predicate::eq(Column::Nation, nation.clone()),
                Predicate::eq(state.0, state.1.clone()),
                Predicate::eq(county.0, county.1.clone()),
            ]),
        }
    }
}

fn level_value(clause: &GeoClause, level: GeoLevel) -> Option<(Column, String)> {
    clause
        .get(level)
        .map(|v| (Column::for_level(level), v.to_string()))
}

/// Classify a clause against the closed set of supported key combinations.
///
/// The key set must match a combination exactly; any unrecognized key or
/// leftover key fails the whole clause (the filter fails closed).
pub fn classify_clause(clause: &GeoClause) -> Option<GeoCombination> {
    let mut keys: Vec<GeoLevel> = Vec::with_capacity(clause.0.len());
    for key in clause.0.keys() {
        keys.push(GeoLevel::parse(key)?);
    }

    let nation = clause.get(GeoLevel::Nation)?.to_string();
    let state = level_value(clause, GeoLevel::State)
        .or_else(|| level_value(clause, GeoLevel::StateAbbrev));
    let county = level_value(clause, GeoLevel::County)
        .or_else(|| level_value(clause, GeoLevel::CountyFips));
    let region = clause.get(GeoLevel::Region);
    let msa = clause.get(GeoLevel::Msa);

    let combination = match (region, state, msa, county, keys.len()) {
        (None, None, None, None, 1) => GeoCombination::Nation { nation },
        (Some(region), None, None, None, 2) => GeoCombination::Region {
            nation,
            region: region.to_string(),
        },
        (None, Some(state), None, None, 2) => GeoCombination::State { nation, state },
        (None, None, Some(msa), None, 2) => GeoCombination::Msa {
            nation,
            msa: msa.to_string(),
        },
        (None, Some(state), None, Some(county), 3) => GeoCombination::County {
            nation,
            state,
            county,
        },
        _ => return None,
    };
    Some(combination)
}

/// Classify every clause of a filter, failing closed on the first bad one.
pub fn classify_filter(geo: &GeoFilter) -> Option<Vec<GeoCombination>> {
    geo.clauses().iter().map(classify_clause).collect()
}

/// Lower a geo filter into a predicate: supported combinations OR'd together.
/// Callers must have validated the filter; an unclassifiable clause surfaces
/// as an `InvalidArgument` error rather than unchecked SQL.
pub fn compile_geo_filter(geo: &GeoFilter) -> Result<Predicate> {
    if geo.is_empty() {
        return Ok(Predicate::True);
    }
    let combinations = classify_filter(geo)
        .ok_or_else(|| MarketscopeError::invalid("geo_filter", format!("{geo:?}")))?;
    Ok(Predicate::AnyOf(
        combinations.iter().map(GeoCombination::to_predicate).collect(),
    ))
}

/// Lower a seg filter into a predicate scoped to the seg_type's column:
/// equality or closed-range clauses OR'd together. An inverted range is
/// permitted and compiles to an empty match.
pub fn compile_seg_filter(seg: &SegFilter) -> Result<Predicate> {
    let (seg_type, clauses) = match seg {
        SegFilter::Empty => return Ok(Predicate::True),
        SegFilter::Filter { seg_type, clauses } => (*seg_type, clauses),
    };
    let column = Column::for_seg_type(seg_type);

    let mut parts = Vec::new();
    for raw in clauses {
        let clause = parse_seg_clause(raw)
            .map_err(|_| MarketscopeError::invalid("seg_filter", raw.clone()))?;
        match clause {
            None => continue,
            Some(SegClause::Code(code)) => parts.push(Predicate::eq(column, code)),
            Some(SegClause::Range { lo, hi }) => parts.push(Predicate::AllOf(vec![
                Predicate::Compare {
                    column,
                    op: CmpOp::Gte,
                    value: lo,
                },
                Predicate::Compare {
                    column,
                    op: CmpOp::Lte,
                    value: hi,
                },
            ])),
        }
    }

    if parts.is_empty() {
        Ok(Predicate::True)
    } else {
        Ok(Predicate::AnyOf(parts))
    }
}
