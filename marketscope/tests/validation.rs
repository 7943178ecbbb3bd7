//! Validator behavior against an in-memory reference store.

mod common;

use common::FakeStore;
use marketscope::model::{GeoClause, GeoFilter, SegFilter, SegType};
use marketscope::Validator;

#[tokio::test]
async fn empty_filters_are_always_valid() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    assert!(validator.valid_geo_filter(&GeoFilter::Empty).await.unwrap());
    assert!(validator.valid_seg_filter(&SegFilter::Empty).await.unwrap());
    // no probe should have run
    assert!(store.executed_sql().is_empty());
}

#[tokio::test]
async fn unrecognized_level_key_rejects_without_a_round_trip() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    let geo = GeoFilter::Clauses(vec![GeoClause::from_pairs(&[
        ("nation", "US"),
        ("planet", "Earth"),
    ])]);
    assert!(!validator.valid_geo_filter(&geo).await.unwrap());
    assert!(store.executed_sql().is_empty());
}

#[tokio::test]
async fn unsupported_combination_fails_the_whole_filter() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    // one good clause plus one bad one: fails closed
    let geo = GeoFilter::Clauses(vec![
        GeoClause::from_pairs(&[("nation", "US")]),
        GeoClause::from_pairs(&[("nation", "US"), ("county", "Boulder")]),
    ]);
    assert!(!validator.valid_geo_filter(&geo).await.unwrap());
}

#[tokio::test]
async fn supported_combinations_existence_check_in_one_round_trip() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    let geo = GeoFilter::Clauses(vec![
        GeoClause::from_pairs(&[("nation", "US"), ("state", "Colorado")]),
        GeoClause::from_pairs(&[("nation", "US"), ("msa", "Denver")]),
    ]);
    assert!(validator.valid_geo_filter(&geo).await.unwrap());
    assert_eq!(store.executed_sql().len(), 1);
}

#[tokio::test]
async fn missing_geography_values_reject() {
    let store = FakeStore {
        geo_known: false,
        ..FakeStore::default()
    };
    let validator = Validator::new(&store);

    let geo = GeoFilter::Clauses(vec![GeoClause::from_pairs(&[("nation", "ZZ")])]);
    assert!(!validator.valid_geo_filter(&geo).await.unwrap());
}

#[tokio::test]
async fn seg_codes_must_exist_in_the_reference_table() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    let known = SegFilter::Filter {
        seg_type: SegType::Sic,
        clauses: vec!["1234".to_string()],
    };
    assert!(validator.valid_seg_filter(&known).await.unwrap());

    let unknown = SegFilter::Filter {
        seg_type: SegType::Sic,
        clauses: vec!["1234".to_string(), "9999".to_string()],
    };
    assert!(!validator.valid_seg_filter(&unknown).await.unwrap());
}

#[tokio::test]
async fn naics_codes_check_the_naics_table() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    let seg = SegFilter::Filter {
        seg_type: SegType::Naics,
        clauses: vec!["541511".to_string()],
    };
    assert!(validator.valid_seg_filter(&seg).await.unwrap());
    let sql = store.executed_sql();
    assert!(sql[0].contains("from naics s"));
}

#[tokio::test]
async fn malformed_range_rejects_without_a_round_trip() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    let seg = SegFilter::Filter {
        seg_type: SegType::Sic,
        clauses: vec!["1:2:3".to_string()],
    };
    assert!(!validator.valid_seg_filter(&seg).await.unwrap());
    assert!(store.executed_sql().is_empty());
}

#[tokio::test]
async fn inverted_range_is_accepted_by_validation() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    // hi < lo: no ordering check, the probe spans the symmetric bounds
    let seg = SegFilter::Filter {
        seg_type: SegType::Sic,
        clauses: vec!["5999:5000".to_string()],
    };
    assert!(validator.valid_seg_filter(&seg).await.unwrap());
}

#[tokio::test]
async fn range_with_no_codes_in_span_rejects() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    let seg = SegFilter::Filter {
        seg_type: SegType::Sic,
        clauses: vec!["8000:8999".to_string()],
    };
    assert!(!validator.valid_seg_filter(&seg).await.unwrap());
}

#[tokio::test]
async fn empty_product_list_is_always_invalid() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    assert!(!validator.valid_products(&[]).await.unwrap());
    assert!(store.executed_sql().is_empty());
}

#[tokio::test]
async fn products_must_all_have_ratio_rows() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    assert!(validator
        .valid_products(&["P1".to_string(), "P2".to_string()])
        .await
        .unwrap());
    assert!(!validator
        .valid_products(&["P1".to_string(), "NOPE".to_string()])
        .await
        .unwrap());
}

#[tokio::test]
async fn duplicate_products_validate_once() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    assert!(validator
        .valid_products(&["P1".to_string(), "P1".to_string()])
        .await
        .unwrap());
}

#[test]
fn duns_must_be_nine_characters() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    assert!(validator.valid_duns("123456789"));
    assert!(validator.valid_duns("000000000"));
    assert!(!validator.valid_duns("12345678"));
    assert!(!validator.valid_duns("1234567890"));
    assert!(!validator.valid_duns(""));
}

#[test]
fn group_by_tokens_validate_against_the_enumeration() {
    let store = FakeStore::default();
    let validator = Validator::new(&store);

    assert!(validator.valid_group_by("state"));
    assert!(validator.valid_group_by("company_size"));
    assert!(!validator.valid_group_by("division"));
}
