use std::env;

use marketscope::model::{GeoFilter, GroupBy, SegFilter};
use marketscope::sql::queries;
use marketscope::{min_extent, resolve_extent};

fn usage() {
    eprintln!("Usage: print_sql <group_by> [geo] [seg] [products]");
    eprintln!("Example: cargo run --example print_sql -- state US.CO 5000:5999 P1,P2");
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        usage();
        std::process::exit(1);
    }

    let group_by = match GroupBy::parse(&args.remove(0)) {
        Some(group_by) => group_by,
        None => {
            usage();
            std::process::exit(1);
        }
    };
    let geo = if args.is_empty() {
        GeoFilter::Empty
    } else {
        GeoFilter::from_compact(&args.remove(0))
    };
    let seg = if args.is_empty() {
        SegFilter::Empty
    } else {
        SegFilter::from_compact(&args.remove(0))
    };
    let products: Vec<String> = if args.is_empty() {
        vec!["P1".to_string()]
    } else {
        args.remove(0).split(',').map(str::to_string).collect()
    };

    let extent = resolve_extent(min_extent(&geo), group_by);
    tracing::info!(group_by = ?group_by, extent = ?extent, "building demand query");

    let query = match group_by {
        GroupBy::Company => queries::prospects(&geo, &seg, &products, 100)?,
        GroupBy::Sic => {
            queries::seg_demand(marketscope::SegType::Sic, extent, &geo, &seg, &products)?
        }
        GroupBy::Naics => {
            queries::seg_demand(marketscope::SegType::Naics, extent, &geo, &seg, &products)?
        }
        GroupBy::CompanySize => queries::company_size_demand(extent, &geo, &seg, &products)?,
        _ => queries::geo_demand(group_by, extent, &geo, &seg, &products)?,
    };

    println!("{}", query.sql);
    for (idx, param) in query.params.iter().enumerate() {
        println!("  ${} = {:?}", idx + 1, param);
    }
    Ok(())
}
