use criterion::{Criterion, black_box, criterion_group, criterion_main};
use leasedb::LeasedbInstance;
use leasedb::config::LeasedbConfig;
use tempfile::tempdir;
use tokio::runtime::Runtime;

const SEEDED_ROWS: i64 = 1_000;

async fn setup_db(config: LeasedbConfig, seed_rows: i64) -> (tempfile::TempDir, LeasedbInstance) {
    let dir = tempdir().expect("temp");
    let db = LeasedbInstance::open(config, dir.path().join("bench.db"))
        .await
        .expect("open");
    for value in 0..seed_rows {
        db.insert_record(value).await.expect("seed row");
    }
    (dir, db)
}

fn bench_leasedb_hot_paths(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");

    let (_seed_dir, seed_db) = rt.block_on(setup_db(LeasedbConfig::default(), SEEDED_ROWS));

    let mut next_value = 0_i64;
    c.bench_function("leased_insert_single_record", |b| {
        b.iter(|| {
            rt.block_on(async {
                let value = black_box(next_value);
                next_value += 1;
                seed_db.insert_record(value).await.expect("insert");
            });
        })
    });

    c.bench_function("fetch_recent_default_window", |b| {
        b.iter(|| {
            rt.block_on(async {
                let recent = seed_db.fetch_recent().await.expect("fetch");
                black_box(recent.records.len());
            });
        })
    });

    c.bench_function("empty_write_bracket", |b| {
        b.iter(|| {
            rt.block_on(async {
                seed_db
                    .with_write_lease(|_conn| Ok(()))
                    .await
                    .expect("bracket");
            });
        })
    });
}

fn bench_end_to_end_bootstrap(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    c.bench_function("e2e_open_migrate_insert_fetch", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (_dir, db) = setup_db(LeasedbConfig::default(), 0).await;
                db.insert_record(1).await.expect("insert");
                let _ = db.fetch_recent().await.expect("fetch");
            });
        })
    });
}

criterion_group!(benches, bench_leasedb_hot_paths, bench_end_to_end_bootstrap);
criterion_main!(benches);
