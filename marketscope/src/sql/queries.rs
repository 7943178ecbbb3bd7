//! Builders for the aggregate and lookup queries.
//!
//! Every builder returns a [`BuiltQuery`]: SQL text with `$n` placeholders
//! plus the bound values in order. The product list always binds first, then
//! geo predicate values, then seg predicate values.

use crate::error::{MarketscopeError, Result};
use crate::extent::Extent;
use crate::model::{GeoFilter, GroupBy, SegFilter, SegType};
use crate::sql::predicate::{compile_geo_filter, compile_seg_filter, GeoCombination};
use crate::sql::{BuiltQuery, Param};

/// Join against the per-product ratio weights, pre-summed per SIC code.
/// Binds the product list and returns the join fragment.
fn ratio_join(query: &mut BuiltQuery, products: &[String]) -> String {
    let placeholder = query.bind(Param::TextArray(products.to_vec()));
    format!(
        "inner join (select sic, sum(ratio) as ratio from ratios \
         where product_id = any({placeholder}) group by sic) r on r.sic = l.sic"
    )
}

/// Select/group-by columns for a geographic group-by dimension. The FIPS
/// composite is zero-padded to the census 2+3 digit convention.
fn geo_group_columns(group_by: GroupBy) -> Option<&'static str> {
    match group_by {
        GroupBy::Nation => Some("l.nation"),
        GroupBy::Region => Some("l.nation, l.region"),
        GroupBy::State => Some("l.nation, l.state"),
        GroupBy::Msa => Some("l.nation, l.msa"),
        GroupBy::County => Some(
            "l.nation, l.state, l.county, \
             lpad(l.state_fips, 2, '0') || lpad(l.county_fips, 3, '0')",
        ),
        GroupBy::PostalCode => Some(
            "l.nation, l.state, l.county, \
             lpad(l.state_fips, 2, '0') || lpad(l.county_fips, 3, '0'), l.postal_code",
        ),
        _ => None,
    }
}

/// Output header for a demand table, camelCase, ending demand/companies.
pub fn demand_header(group_by: GroupBy) -> Vec<&'static str> {
    let mut header: Vec<&'static str> = match group_by {
        GroupBy::Nation => vec!["nation"],
        GroupBy::Region => vec!["nation", "region"],
        GroupBy::State => vec!["nation", "state"],
        GroupBy::Msa => vec!["nation", "msa"],
        GroupBy::County => vec!["nation", "state", "county", "fips"],
        GroupBy::PostalCode => vec!["nation", "state", "county", "countyFips", "postalCode"],
        GroupBy::Sic => vec!["sic", "description"],
        GroupBy::Naics => vec!["naics", "description"],
        GroupBy::CompanySize => vec!["companySize"],
        GroupBy::Company => {
            return vec![
                "duns",
                "name",
                "url",
                "employees",
                "sic",
                "sicDescription",
                "naics",
                "naicsDescription",
                "sales",
                "nation",
                "region",
                "state",
                "msa",
                "county",
                "postalCode",
                "lon",
                "lat",
                "demand",
            ]
        }
    };
    header.push("demand");
    header.push("companies");
    header
}

/// Demand aggregated over a geographic dimension, against the extent's
/// pre-aggregated table.
pub fn geo_demand(
    group_by: GroupBy,
    extent: Extent,
    geo: &GeoFilter,
    seg: &SegFilter,
    products: &[String],
) -> Result<BuiltQuery> {
    let columns = geo_group_columns(group_by)
        .ok_or_else(|| MarketscopeError::invalid("group_by", format!("{group_by:?}")))?;

    let mut query = BuiltQuery::new();
    let ratio = ratio_join(&mut query, products);
    let geo_sql = compile_geo_filter(geo)?.render("l", &mut query);
    let seg_sql = compile_seg_filter(seg)?.render("l", &mut query);

    query.sql = format!(
        "select {columns}, round(sum(l.employees * r.ratio)) as demand, \
         sum(l.companies) as companies \
         from {table} l {ratio} \
         where ({geo_sql}) and ({seg_sql}) \
         group by {columns} \
         order by demand desc",
        table = extent.table(),
    );
    Ok(query)
}

/// Demand aggregated per industry code, with the reference table joined in
/// for descriptions.
pub fn seg_demand(
    seg_type: SegType,
    extent: Extent,
    geo: &GeoFilter,
    seg: &SegFilter,
    products: &[String],
) -> Result<BuiltQuery> {
    let code = seg_type.as_str();

    let mut query = BuiltQuery::new();
    let ratio = ratio_join(&mut query, products);
    let geo_sql = compile_geo_filter(geo)?.render("l", &mut query);
    let seg_sql = compile_seg_filter(seg)?.render("l", &mut query);

    query.sql = format!(
        "select l.{code}, s.description, \
         round(sum(l.employees * r.ratio)) as demand, \
         sum(l.companies) as companies \
         from {table} l {ratio} \
         left join {code} s on s.{code} = l.{code} \
         where ({geo_sql}) and ({seg_sql}) \
         group by l.{code}, s.description \
         order by demand desc",
        table = extent.table(),
    );
    Ok(query)
}

/// Demand aggregated per company-size bracket.
pub fn company_size_demand(
    extent: Extent,
    geo: &GeoFilter,
    seg: &SegFilter,
    products: &[String],
) -> Result<BuiltQuery> {
    let mut query = BuiltQuery::new();
    let ratio = ratio_join(&mut query, products);
    let geo_sql = compile_geo_filter(geo)?.render("l", &mut query);
    let seg_sql = compile_seg_filter(seg)?.render("l", &mut query);

    query.sql = format!(
        "select l.company_size, round(sum(l.employees * r.ratio)) as demand, \
         sum(l.companies) as companies \
         from {table} l {ratio} \
         where ({geo_sql}) and ({seg_sql}) \
         group by l.company_size \
         order by demand desc",
        table = extent.table(),
    );
    Ok(query)
}

/// Flat ranked listing of the top prospect locations. Runs against the raw
/// `locations` table joined to `geo`, so the geo predicate targets the `g`
/// alias here.
pub fn prospects(
    geo: &GeoFilter,
    seg: &SegFilter,
    products: &[String],
    limit: i64,
) -> Result<BuiltQuery> {
    let mut query = BuiltQuery::new();
    let ratio = ratio_join(&mut query, products);
    let geo_sql = compile_geo_filter(geo)?.render("g", &mut query);
    let seg_sql = compile_seg_filter(seg)?.render("l", &mut query);
    let limit_ph = query.bind(Param::Int(limit));

    query.sql = format!(
        "select l.duns, l.name, l.url, l.employees, \
         l.sic, s.description, l.naics, n.description, l.sales, \
         g.nation, g.region, g.state, g.msa, g.county, g.postal_code, \
         l.lon, l.lat, round(l.employees * r.ratio) as demand \
         from locations l {ratio} \
         inner join geo g on g.id = l.geo_id \
         left join sic s on s.sic = l.sic \
         left join naics n on n.naics = l.naics \
         where ({geo_sql}) and ({seg_sql}) \
         order by demand desc \
         limit {limit_ph}"
    );
    Ok(query)
}

/// Company counts per (company_size, sic, description).
pub fn demographics(
    extent: Extent,
    geo: &GeoFilter,
    seg: &SegFilter,
    products: &[String],
) -> Result<BuiltQuery> {
    let mut query = BuiltQuery::new();
    let ratio = ratio_join(&mut query, products);
    let geo_sql = compile_geo_filter(geo)?.render("l", &mut query);
    let seg_sql = compile_seg_filter(seg)?.render("l", &mut query);

    query.sql = format!(
        "select l.company_size, l.sic, s.description, \
         sum(l.companies) as companies \
         from {table} l {ratio} \
         left join sic s on s.sic = l.sic \
         where ({geo_sql}) and ({seg_sql}) \
         group by l.company_size, l.sic, s.description",
        table = extent.table(),
    );
    Ok(query)
}

/// Grand totals with no grouping dimension.
pub fn total(
    extent: Extent,
    geo: &GeoFilter,
    seg: &SegFilter,
    products: &[String],
) -> Result<BuiltQuery> {
    let mut query = BuiltQuery::new();
    let ratio = ratio_join(&mut query, products);
    let geo_sql = compile_geo_filter(geo)?.render("l", &mut query);
    let seg_sql = compile_seg_filter(seg)?.render("l", &mut query);

    query.sql = format!(
        "select round(sum(l.employees * r.ratio)) as demand, \
         sum(l.companies) as companies \
         from {table} l {ratio} \
         where ({geo_sql}) and ({seg_sql})",
        table = extent.table(),
    );
    Ok(query)
}

/// Single-location demand estimate.
pub fn location_demand(duns: &str, products: &[String]) -> BuiltQuery {
    let mut query = BuiltQuery::new();
    let products_ph = query.bind(Param::TextArray(products.to_vec()));
    let duns_ph = query.bind(Param::Text(duns.to_string()));
    query.sql = format!(
        "select l.duns, round(sum(l.employees * r.ratio)) as demand \
         from locations l \
         inner join ratios r on r.sic = l.sic \
         where l.duns = {duns_ph} and r.product_id = any({products_ph}) \
         group by l.duns"
    );
    query
}

/// Product catalog listing, optionally narrowed to one category.
pub fn product_list(category: Option<&str>) -> BuiltQuery {
    let mut query = BuiltQuery::new();
    let columns =
        "p.product_id, p.description, p.type, p.category, p.extended_description";
    match category {
        Some(category) => {
            let ph = query.bind(Param::Text(category.to_string()));
            query.sql = format!(
                "select {columns} from products p where p.category = {ph} \
                 order by p.category, p.description"
            );
        }
        None => {
            query.sql = format!(
                "select {columns} from products p where p.category is not null \
                 order by p.category, p.description"
            );
        }
    }
    query
}

/// Single product lookup by id.
pub fn product(product_id: &str) -> BuiltQuery {
    let mut query = BuiltQuery::new();
    let ph = query.bind(Param::Text(product_id.to_string()));
    query.sql = format!(
        "select p.product_id, p.description, p.type, p.category, \
         p.extended_description \
         from products p where p.product_id = {ph} limit 1"
    );
    query
}

/// Dataset version marker.
pub fn fingerprint() -> BuiltQuery {
    BuiltQuery {
        sql: "select version from version".to_string(),
        params: Vec::new(),
    }
}

// Existence probes used by the validator. Each probe is one round trip for
// the whole filter.

/// One `exists` probe per clause combination, and-ed into a single boolean.
pub fn geo_exists(combinations: &[GeoCombination]) -> BuiltQuery {
    let mut query = BuiltQuery::new();
    let probes: Vec<String> = combinations
        .iter()
        .map(|combo| {
            let sql = combo.to_predicate().render("l", &mut query);
            format!("exists (select 1 from geo l where {sql})")
        })
        .collect();
    query.sql = format!("select {}", probes.join(" and "));
    query
}

/// Count how many of the requested codes exist in the reference table.
pub fn seg_codes_exist(seg_type: SegType, codes: &[String]) -> BuiltQuery {
    let code = seg_type.as_str();
    let mut query = BuiltQuery::new();
    let ph = query.bind(Param::TextArray(codes.to_vec()));
    query.sql = format!(
        "select count(distinct s.{code}) from {code} s where s.{code} = any({ph})"
    );
    query
}

/// One `exists` probe per range, with symmetric bounds so an inverted range
/// validates the same span as its ordered twin.
pub fn seg_ranges_exist(seg_type: SegType, ranges: &[(String, String)]) -> BuiltQuery {
    let code = seg_type.as_str();
    let mut query = BuiltQuery::new();
    let probes: Vec<String> = ranges
        .iter()
        .map(|(lo, hi)| {
            let lo_ph = query.bind(Param::Text(lo.clone()));
            let hi_ph = query.bind(Param::Text(hi.clone()));
            format!(
                "exists (select 1 from {code} s where s.{code} \
                 between least({lo_ph}, {hi_ph}) and greatest({lo_ph}, {hi_ph}))"
            )
        })
        .collect();
    query.sql = format!("select {}", probes.join(" and "));
    query
}

/// Count how many of the requested product ids have ratio rows.
pub fn products_exist(products: &[String]) -> BuiltQuery {
    let mut query = BuiltQuery::new();
    let ph = query.bind(Param::TextArray(products.to_vec()));
    query.sql = format!(
        "select count(distinct r.product_id) from ratios r where r.product_id = any({ph})"
    );
    query
}
