//! End-to-end engine tests over the in-memory store fixture.

mod common;

use common::FakeStore;
use serde_json::{json, Value};

use marketscope::model::{GeoFilter, GroupBy, SegFilter};
use marketscope::sql::Param;
use marketscope::{MarketModel, MarketscopeConfig, MarketscopeError};

fn products() -> Vec<String> {
    vec!["P1".to_string()]
}

#[tokio::test]
async fn demand_by_state_coerces_rows_and_totals_them() {
    let store = FakeStore::with_rows(vec![
        vec![json!("US"), json!("Colorado"), json!(1234.6), json!("10")],
        vec![json!("US"), json!("Wyoming"), json!(5), json!(2)],
    ]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let table = model
        .demand(
            GroupBy::State,
            &GeoFilter::Empty,
            &SegFilter::Empty,
            &products(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(table.header, vec!["nation", "state", "demand", "companies"]);
    assert_eq!(table.results.len(), 2);
    // numeric and string cells land as plain integers
    assert_eq!(table.results[0][2], json!(1235));
    assert_eq!(table.results[0][3], json!(10));
    assert_eq!(table.demand, 1235 + 5);
    assert_eq!(table.companies, 12);

    // totals are the sum over the returned rows
    let row_demand: i64 = table
        .results
        .iter()
        .map(|r| r[2].as_i64().unwrap())
        .sum();
    assert_eq!(row_demand, table.demand);

    let executed = store.executed_sql();
    assert!(executed.iter().any(|sql| sql.contains("locations_state")));
}

#[tokio::test]
async fn prospect_listing_counts_one_company_per_row() {
    let store = FakeStore::with_rows(vec![
        vec![json!("123456789"), json!("Acme"), json!(7.2)],
        vec![json!("987654321"), json!("Globex"), json!(3)],
    ]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let table = model
        .demand(
            GroupBy::Company,
            &GeoFilter::Empty,
            &SegFilter::Empty,
            &products(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(table.header.last(), Some(&"demand"));
    assert_eq!(table.demand, 7 + 3);
    assert_eq!(table.companies, 2);

    // absent limit falls back to the configured default, bound as $n
    let log = store.log.lock().unwrap();
    let listing = log.iter().find(|q| q.sql.contains("limit $")).unwrap();
    assert!(listing.params.contains(&Param::Int(100)));
}

#[tokio::test]
async fn prospect_limit_is_capped_by_config() {
    let store = FakeStore::with_rows(vec![]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    model
        .demand(
            GroupBy::Company,
            &GeoFilter::Empty,
            &SegFilter::Empty,
            &products(),
            Some(1_000_000),
        )
        .await
        .unwrap();

    let log = store.log.lock().unwrap();
    let listing = log.iter().find(|q| q.sql.contains("limit $")).unwrap();
    assert!(listing.params.contains(&Param::Int(10_000)));
}

#[tokio::test]
async fn empty_products_fail_before_any_aggregate_runs() {
    let store = FakeStore::default();
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let err = model
        .demand(
            GroupBy::State,
            &GeoFilter::Empty,
            &SegFilter::Empty,
            &[],
            None,
        )
        .await
        .unwrap_err();

    match err {
        MarketscopeError::InvalidArgument { argument, .. } => {
            assert_eq!(argument, "products")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(store.executed_sql().is_empty());
}

#[tokio::test]
async fn invalid_geo_filter_names_the_argument() {
    let store = FakeStore {
        geo_known: false,
        ..FakeStore::default()
    };
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let geo = GeoFilter::from_compact("ZZ");
    let err = model
        .demand(GroupBy::State, &geo, &SegFilter::Empty, &products(), None)
        .await
        .unwrap_err();

    match err {
        MarketscopeError::InvalidArgument { argument, value } => {
            assert_eq!(argument, "geo_filter");
            assert!(value.contains("ZZ"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn demographics_totals_companies_only() {
    let store = FakeStore::with_rows(vec![
        vec![json!("a"), json!("1234"), json!("Widgets"), json!(5)],
        vec![json!("b"), json!("5500"), json!("Gadgets"), json!(7.4)],
    ]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let table = model
        .demographics(&GeoFilter::Empty, &SegFilter::Empty, &products())
        .await
        .unwrap();

    assert_eq!(
        table.header,
        vec!["companySize", "sic", "description", "companies"]
    );
    assert_eq!(table.total, 5 + 7);
    assert_eq!(table.results[1][3], json!(7));
}

#[tokio::test]
async fn total_reads_one_row_and_tolerates_none() {
    let store = FakeStore::with_rows(vec![vec![json!(100.2), json!(7)]]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let totals = model
        .total(&GeoFilter::Empty, &SegFilter::Empty, &products())
        .await
        .unwrap();
    assert_eq!(totals.demand, 100);
    assert_eq!(totals.companies, 7);

    let empty = FakeStore::with_rows(vec![]);
    let model = MarketModel::new(&empty, &config);
    let totals = model
        .total(&GeoFilter::Empty, &SegFilter::Empty, &products())
        .await
        .unwrap();
    assert_eq!(totals.demand, 0);
    assert_eq!(totals.companies, 0);
}

#[tokio::test]
async fn null_totals_coerce_to_zero() {
    let store = FakeStore::with_rows(vec![vec![Value::Null, Value::Null]]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let totals = model
        .total(&GeoFilter::Empty, &SegFilter::Empty, &products())
        .await
        .unwrap();
    assert_eq!(totals.demand, 0);
    assert_eq!(totals.companies, 0);
}

#[tokio::test]
async fn location_demand_for_an_unknown_duns_is_zero() {
    let store = FakeStore::with_rows(vec![]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let estimate = model
        .location_demand("123456789", &products())
        .await
        .unwrap();
    assert_eq!(estimate.duns, "123456789");
    assert_eq!(estimate.demand, 0);
}

#[tokio::test]
async fn location_demand_rejects_a_malformed_duns() {
    let store = FakeStore::default();
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let err = model.location_demand("1234", &products()).await.unwrap_err();
    match err {
        MarketscopeError::InvalidArgument { argument, .. } => assert_eq!(argument, "duns"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn location_demand_reads_the_estimate_column() {
    let store = FakeStore::with_rows(vec![vec![json!("123456789"), json!(42.7)]]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let estimate = model
        .location_demand("123456789", &products())
        .await
        .unwrap();
    assert_eq!(estimate.demand, 43);
}

#[tokio::test]
async fn unknown_product_is_an_empty_mapping() {
    let store = FakeStore::with_rows(vec![]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let product = model.product("NOPE").await.unwrap();
    assert!(product.is_empty());
}

#[tokio::test]
async fn product_row_maps_to_named_fields() {
    let store = FakeStore::with_rows(vec![vec![
        json!("P1"),
        json!("Widget demand model"),
        json!("hardware"),
        json!("widgets"),
        json!("Long form description"),
    ]]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let product = model.product("P1").await.unwrap();
    assert_eq!(product.get("productId"), Some(&json!("P1")));
    assert_eq!(product.get("category"), Some(&json!("widgets")));
    assert_eq!(product.len(), 5);
}

#[tokio::test]
async fn product_list_has_the_catalog_header() {
    let store = FakeStore::with_rows(vec![vec![
        json!("P1"),
        json!("Widget demand model"),
        json!("hardware"),
        json!("widgets"),
        json!("Long form description"),
    ]]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let catalog = model.product_list(Some("widgets")).await.unwrap();
    assert_eq!(
        catalog.header,
        vec!["id", "description", "type", "category", "extendedDescription"]
    );
    assert_eq!(catalog.results.len(), 1);
}

#[tokio::test]
async fn fingerprint_returns_the_version_marker() {
    let store = FakeStore::with_rows(vec![vec![json!("2026.08-r3")]]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    assert_eq!(model.fingerprint().await.unwrap(), "2026.08-r3");

    let empty = FakeStore::with_rows(vec![]);
    let model = MarketModel::new(&empty, &config);
    assert!(model.fingerprint().await.is_err());
}

#[tokio::test]
async fn demand_tables_serialize_with_camel_case_fields() {
    let store = FakeStore::with_rows(vec![vec![json!("US"), json!(10), json!(2)]]);
    let config = MarketscopeConfig::default();
    let model = MarketModel::new(&store, &config);

    let table = model
        .demand(
            GroupBy::Nation,
            &GeoFilter::Empty,
            &SegFilter::Empty,
            &products(),
            None,
        )
        .await
        .unwrap();

    let encoded = serde_json::to_value(&table).unwrap();
    assert!(encoded.get("header").is_some());
    assert!(encoded.get("results").is_some());
    assert!(encoded.get("demand").is_some());
    assert!(encoded.get("companies").is_some());
}
