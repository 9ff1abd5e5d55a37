//! Shared helpers for the integration tests.
//!
//! `RUST_LOG=graphskip=debug cargo test` shows level growth and remove races.

#![allow(dead_code)]

use std::sync::Once;

use graphskip::{MemStore, Options, SkipList};
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .with_test_writer()
            .try_init();
    });
}

pub fn new_list(seed: u64) -> SkipList<MemStore> {
    init_tracing();
    SkipList::create(MemStore::new(), Options::default().with_seed(seed)).unwrap()
}

/// Big endian so that byte order matches numeric order.
pub fn key(n: u64) -> [u8; 8] {
    n.to_be_bytes()
}

pub fn square(n: u64) -> [u8; 8] {
    (n * n).to_be_bytes()
}

/// Walks the list front to back through `first` / `next`.
pub fn forward_keys(list: &SkipList<MemStore>) -> Vec<Vec<u8>> {
    let mut keys = Vec::new();
    let mut cur = list.first().unwrap();
    while let Some(node) = cur {
        keys.push(node.key().unwrap());
        cur = node.next().unwrap();
    }
    keys
}

/// Walks the list back to front through `last` / `prev`, returned in ascending order.
pub fn backward_keys(list: &SkipList<MemStore>) -> Vec<Vec<u8>> {
    let mut keys = Vec::new();
    let mut cur = list.last().unwrap();
    while let Some(node) = cur {
        keys.push(node.key().unwrap());
        cur = node.prev().unwrap();
    }
    keys.reverse();
    keys
}

pub fn expected_keys(range: std::ops::Range<u64>) -> Vec<Vec<u8>> {
    range.map(|n| key(n).to_vec()).collect()
}
