use rand::Rng;
use tracing::debug;

use crate::error::Result;
use crate::record::MetaRecord;
use crate::store::{Store, Txn};
use crate::types::ObjectRef;

use super::{set_next, Loaded, Meta, SkipList};

/// `floor((1/p)^depth)`: the number of keys a list of `depth` levels is sized for.
pub(crate) fn calculate_capacity(p: f32, depth: u64) -> u64 {
    let base = 1.0 / p as f64;
    base.powi(depth as i32).floor() as u64
}

/// Makes room for one more key. When the list is full a level is added and
/// eligible nodes of the old top level are promoted into it, all inside `txn`.
pub(crate) fn ensure_capacity<T: Txn>(txn: &mut T, list: ObjectRef) -> Result<Meta> {
    let mut meta = Meta::read(txn, list)?;
    if meta.record.length < meta.record.cur_capacity {
        return Ok(meta);
    }

    let old_depth = meta.record.depth();
    let p = meta.probability();
    let threshold = p * meta.record.level_probabilities[old_depth - 2];
    meta.record.level_probabilities.push(threshold);
    meta.record.cur_depth += 1;
    meta.record.cur_capacity = calculate_capacity(p, meta.record.cur_depth);
    meta.store(txn)?;

    let promoted = promote(txn, meta.terminus(), old_depth, threshold)?;
    debug!(
        list = %list,
        depth = meta.record.cur_depth,
        capacity = meta.record.cur_capacity,
        threshold,
        promoted,
        "skip list grew a level"
    );
    Ok(meta)
}

/// Walks the old top level and links every node whose permanent height draw
/// is within `threshold` into the new level `old_depth`. The terminus always
/// takes part and starts out pointing at itself.
///
/// Only nodes on the old top level can take the new slot: a node's forward
/// references are contiguous, so the slot appended to a shorter node would
/// not be the new level.
fn promote<T: Txn>(
    txn: &mut T,
    terminus: ObjectRef,
    old_depth: usize,
    threshold: f32,
) -> Result<usize> {
    let top = old_depth - 1;
    let new_level = old_depth;
    let mut prev = terminus;
    let mut cur = terminus;
    let mut promoted = 0;
    loop {
        let mut node = Loaded::read(txn, cur)?;
        let next = node.forward(top);
        let eligible = cur == terminus
            || (node.height() == old_depth && node.record.height_rand <= threshold);
        if eligible {
            node.record.next_keys.push(Vec::new());
            node.refs.push(terminus);
            node.store(txn)?;
            if cur != terminus {
                set_next(txn, prev, new_level, &node.record.key, cur)?;
                promoted += 1;
            }
            prev = cur;
        }
        if next == terminus {
            break;
        }
        cur = next;
    }
    Ok(promoted)
}

impl<S: Store> SkipList<S> {
    /// Draws the permanent height value and, independently, the sample that
    /// picks the initial height: one level plus one for every leading
    /// threshold the sample does not exceed.
    pub(crate) fn choose_height(&self, meta: &MetaRecord) -> (f32, usize) {
        let mut rng = self.rng.lock();
        let height_rand: f32 = rng.gen();
        let sample: f32 = rng.gen();
        let height = 1 + meta
            .level_probabilities
            .iter()
            .take_while(|threshold| sample <= **threshold)
            .count();
        (height_rand, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::store::mem::MemStore;

    #[test]
    fn test_calculate_capacity() {
        assert_eq!(calculate_capacity(0.25, 2), 16);
        assert_eq!(calculate_capacity(0.25, 3), 64);
        assert_eq!(calculate_capacity(0.5, 10), 1024);
        assert_eq!(calculate_capacity(0.3, 2), 11);
    }

    #[test]
    fn test_choose_height_in_range() {
        let list = SkipList::create(MemStore::new(), Options::default().with_seed(3)).unwrap();
        let meta = MetaRecord {
            length: 0,
            level_probabilities: vec![0.25, 0.0625, 0.015625],
            cur_depth: 4,
            cur_capacity: 256,
        };
        let mut seen = [0usize; 5];
        for _ in 0..4000 {
            let (height_rand, height) = list.choose_height(&meta);
            assert!((0.0..1.0).contains(&height_rand));
            assert!((1..=4).contains(&height));
            seen[height] += 1;
        }
        // roughly three quarters of all nodes stay on level 0 only
        assert!(seen[1] > 2700 && seen[1] < 3300, "{:?}", seen);
        assert!(seen[2] > seen[3]);
    }

    #[test]
    fn test_growth_at_capacity() {
        let list = SkipList::create(MemStore::new(), Options::default().with_seed(5)).unwrap();
        for i in 0u64..16 {
            list.insert(&i.to_be_bytes(), b"v").unwrap();
        }
        let depth = |list: &SkipList<MemStore>| {
            list.store()
                .run_transaction(|txn| Meta::read(txn, list.id()))
                .map(|meta| (meta.record.cur_depth, meta.record.cur_capacity))
                .unwrap()
        };
        assert_eq!(depth(&list), (2, 16));

        list.insert(&16u64.to_be_bytes(), b"v").unwrap();
        assert_eq!(depth(&list), (3, 64));
        assert_eq!(list.length().unwrap(), 17);

        list.store()
            .run_transaction(|txn| {
                let meta = Meta::read(txn, list.id())?;
                assert_eq!(meta.record.level_probabilities, vec![0.25, 0.0625]);
                let terminus = Loaded::read(txn, meta.terminus())?;
                assert_eq!(terminus.height(), 3);
                Ok(())
            })
            .unwrap();
        list.verify().unwrap();
    }

    #[test]
    fn test_growth_keeps_lookups() {
        let list = SkipList::create(MemStore::new(), Options::default().with_seed(9)).unwrap();
        for i in 0u64..64 {
            list.insert(&(i * 3).to_be_bytes(), &i.to_be_bytes()).unwrap();
        }
        let before: Vec<_> = (0u64..64)
            .map(|i| list.get(&(i * 3).to_be_bytes()).unwrap().id())
            .collect();

        // crosses capacity 64
        list.insert(&1u64.to_be_bytes(), b"x").unwrap();

        for (i, id) in before.iter().enumerate() {
            let node = list.get(&(i as u64 * 3).to_be_bytes()).unwrap();
            assert_eq!(node.id(), *id);
            assert_eq!(node.value().unwrap().as_ref(), &(i as u64).to_be_bytes());
        }
        list.verify().unwrap();
    }
}
