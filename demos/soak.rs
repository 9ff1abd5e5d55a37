//! Loads 512 keys into a skip list three ways and reports how long each took.
//!
//! RUST_LOG=graphskip=debug cargo run --release --example soak

use std::time::Instant;

use graphskip::{MemStore, Options, Result, SkipList};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

const LIMIT: u64 = 512;
const PAR: u64 = 8;

fn kv(n: u64) -> ([u8; 8], [u8; 8]) {
    (n.to_be_bytes(), (n * n).to_be_bytes())
}

fn ordered() -> Result<()> {
    let list = SkipList::create(MemStore::new(), Options::default())?;
    for n in 0..LIMIT {
        let (k, v) = kv(n);
        list.insert(&k, &v)?;
    }
    list.verify()
}

fn permutation() -> Result<()> {
    let list = SkipList::create(MemStore::new(), Options::default())?;
    let mut keys: Vec<u64> = (0..LIMIT).collect();
    keys.shuffle(&mut StdRng::from_entropy());
    for n in keys {
        let (k, v) = kv(n);
        list.insert(&k, &v)?;
    }
    list.verify()
}

fn parallel() -> Result<()> {
    let store = MemStore::new();
    let list = SkipList::create(store.clone(), Options::default())?;
    let id = list.id();
    let results: Vec<Result<()>> = crossbeam::thread::scope(|s| {
        let handles: Vec<_> = (0..PAR)
            .map(|conn| {
                let store = store.clone();
                s.spawn(move |_| -> Result<()> {
                    let list = SkipList::open(store, id, Options::default())?;
                    for n in (conn..LIMIT).step_by(PAR as usize) {
                        let (k, v) = kv(n);
                        list.insert(&k, &v)?;
                    }
                    Ok(())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("loader panicked"))
            .collect()
    })
    .expect("loader scope panicked");
    for result in results {
        result?;
    }
    let stats = store.stats();
    info!(commits = stats.commits, conflicts = stats.conflicts, "parallel load done");
    list.verify()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let then = Instant::now();
    ordered()?;
    info!(elapsed = ?then.elapsed(), "total ordered");

    let then = Instant::now();
    permutation()?;
    info!(elapsed = ?then.elapsed(), "total permutation");

    let then = Instant::now();
    parallel()?;
    info!(elapsed = ?then.elapsed(), "total parallel");
    Ok(())
}
