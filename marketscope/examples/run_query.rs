use std::env;

use marketscope::model::{GeoFilter, GroupBy, SegFilter};
use marketscope::{MarketModel, MarketscopeConfig, PgPool};

fn usage() {
    eprintln!("Usage: run_query <group_by> [geo] [seg] [products]");
    eprintln!("Reads the connection string from MARKETSCOPE_DATABASE_URL.");
    eprintln!("Example: MARKETSCOPE_DATABASE_URL=postgresql://localhost/market \\");
    eprintln!("  cargo run --example run_query -- state US.CO '' P1");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
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

    let connection_string = env::var("MARKETSCOPE_DATABASE_URL")
        .unwrap_or_else(|_| "host=localhost user=postgres dbname=market".to_string());

    let config = MarketscopeConfig::load_default();
    let pool = PgPool::new(&connection_string, &config)?;
    let session = pool.session().await?;

    let model = MarketModel::new(&session, &config);
    let table = model.demand(group_by, &geo, &seg, &products, None).await?;

    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}
