//! Extent selection: choosing which pre-aggregated table partition to query.
//!
//! Each extent corresponds to a separately materialized `locations_<extent>`
//! table. Querying the coarsest table sufficient for both the filter and the
//! group-by dimension avoids scanning unnecessarily fine-grained data.

use crate::model::{GeoFilter, GeoLevel, GroupBy};

/// Geography granularity, coarsest to finest. The derived ordering is load
/// bearing: `max` picks the finer of two extents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Extent {
    Nation,
    Region,
    State,
    Msa,
    County,
    PostalCode,
}

impl Extent {
    /// The physical aggregate table backing this extent.
    pub fn table(self) -> &'static str {
        match self {
            Self::Nation => "locations_nation",
            Self::Region => "locations_region",
            Self::State => "locations_state",
            Self::Msa => "locations_msa",
            Self::County => "locations_county",
            Self::PostalCode => "locations_postal_code",
        }
    }
}

/// The most granular geography level any clause of the filter touches.
/// Unrecognized keys are ignored; an empty filter pins nothing finer than
/// nation.
pub fn min_extent(geo: &GeoFilter) -> Extent {
    let mut finest = Extent::Nation;
    for clause in geo.clauses() {
        for key in clause.0.keys() {
            if let Some(level) = GeoLevel::parse(key) {
                finest = finest.max(level.extent());
            }
        }
    }
    finest
}

/// Reconcile the filter's granularity against the requested group-by. When
/// the group-by dimension is finer than the filter requires, the finer table
/// must be queried so the dimension's columns exist; otherwise the filter's
/// own granularity wins.
pub fn resolve_extent(min_extent: Extent, group_by: GroupBy) -> Extent {
    match group_by.natural_extent() {
        Some(natural) => min_extent.max(natural),
        None => min_extent,
    }
}
