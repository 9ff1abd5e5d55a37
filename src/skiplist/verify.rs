use crate::error::{Error, Result};
use crate::store::{Store, Txn};
use crate::types::{ObjectRef, LIST_SLOT, PREV_SLOT, VALUE_SLOT};

use super::capacity::calculate_capacity;
use super::{Loaded, Meta, SkipList};

fn corrupt(msg: String) -> Error {
    Error::Corruption(msg)
}

/// Nodes on `level` in list order, terminus excluded. Checks ordering and the
/// cached successor keys on the way.
fn walk_level<T: Txn>(
    txn: &mut T,
    terminus: &Loaded,
    level: usize,
    limit: u64,
) -> Result<Vec<Loaded>> {
    let mut nodes: Vec<Loaded> = Vec::new();
    let mut next = terminus.forward(level);
    let mut cached = terminus.record.next_keys[level].clone();
    while next != terminus.obj {
        if nodes.len() as u64 >= limit {
            return Err(corrupt(format!(
                "level {} has more than {} nodes",
                level, limit
            )));
        }
        let node = Loaded::read(txn, next)?;
        if node.height() <= level {
            return Err(corrupt(format!(
                "node {} of height {} linked on level {}",
                node.obj,
                node.height(),
                level
            )));
        }
        if cached != node.record.key {
            return Err(corrupt(format!(
                "stale cached key for {} on level {}",
                node.obj, level
            )));
        }
        if let Some(prev) = nodes.last() {
            if prev.record.key >= node.record.key {
                return Err(corrupt(format!(
                    "keys out of order on level {} at {}",
                    level, node.obj
                )));
            }
        }
        next = node.forward(level);
        cached = node.record.next_keys[level].clone();
        nodes.push(node);
    }
    if !cached.is_empty() {
        return Err(corrupt(format!(
            "non empty cached key for the terminus on level {}",
            level
        )));
    }
    Ok(nodes)
}

impl<S: Store> SkipList<S> {
    /// Checks every structural invariant of the list in one transaction.
    pub fn verify(&self) -> Result<()> {
        self.store.run_transaction(|txn| self.verify_in(txn))
    }

    pub fn verify_in(&self, txn: &mut S::Txn) -> Result<()> {
        let meta = Meta::read(txn, self.obj)?;
        let record = &meta.record;
        let depth = record.depth();
        let terminus = Loaded::read(txn, meta.terminus())?;

        if terminus.height() != depth {
            return Err(corrupt(format!(
                "terminus height {} but depth {}",
                terminus.height(),
                depth
            )));
        }
        if !terminus.record.key.is_empty()
            || terminus.refs[LIST_SLOT] != self.obj
            || terminus.refs[VALUE_SLOT] != terminus.obj
        {
            return Err(corrupt("malformed terminus".into()));
        }
        if record.cur_capacity != calculate_capacity(meta.probability(), record.cur_depth) {
            return Err(corrupt(format!(
                "capacity {} does not match depth {}",
                record.cur_capacity, depth
            )));
        }
        if record.length > record.cur_capacity {
            return Err(corrupt(format!(
                "length {} exceeds capacity {}",
                record.length, record.cur_capacity
            )));
        }
        let p = meta.probability();
        for pair in record.level_probabilities.windows(2) {
            if pair[1] != pair[0] * p {
                return Err(corrupt(format!(
                    "level probabilities {:?} do not shrink by {}",
                    record.level_probabilities, p
                )));
            }
        }

        let base = walk_level(txn, &terminus, 0, record.length)?;
        if base.len() as u64 != record.length {
            return Err(corrupt(format!(
                "length {} but {} nodes on level 0",
                record.length,
                base.len()
            )));
        }
        let mut prev = terminus.obj;
        for node in base.iter() {
            if node.refs[PREV_SLOT] != prev {
                return Err(corrupt(format!("bad prev link at {}", node.obj)));
            }
            if node.refs[LIST_SLOT] != self.obj {
                return Err(corrupt(format!("{} belongs to another list", node.obj)));
            }
            prev = node.obj;
        }
        if terminus.refs[PREV_SLOT] != prev {
            return Err(corrupt("terminus does not point back at the last node".into()));
        }

        let mut below: Vec<ObjectRef> = base.iter().map(|n| n.obj).collect();
        for level in 1..depth {
            let nodes = walk_level(txn, &terminus, level, record.length)?;
            let mut candidates = below.iter();
            for node in nodes.iter() {
                if !candidates.any(|obj| *obj == node.obj) {
                    return Err(corrupt(format!(
                        "{} on level {} is missing from level {}",
                        node.obj,
                        level,
                        level - 1
                    )));
                }
            }
            below = nodes.iter().map(|n| n.obj).collect();
        }
        Ok(())
    }

    /// Number of nodes linked on each level, level 0 first.
    pub fn level_counts(&self) -> Result<Vec<u64>> {
        self.store.run_transaction(|txn| {
            let meta = Meta::read(txn, self.obj)?;
            let terminus = Loaded::read(txn, meta.terminus())?;
            let mut counts = Vec::with_capacity(terminus.height());
            for level in 0..terminus.height() {
                counts.push(walk_level(txn, &terminus, level, meta.record.length)?.len() as u64);
            }
            Ok(counts)
        })
    }
}
