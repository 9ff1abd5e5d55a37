//! A skip list whose nodes live in a transactional object store.
//!
//! There are no in-process pointers: every link is an `ObjectRef` and every
//! step of a traversal is a read inside the current transaction attempt.
//! Nothing decoded is kept across attempts, so each public operation can be
//! re-run from scratch whenever the store asks for a restart.
//!
//! Object layout:
//!
//! ```text
//! skip list : MetaRecord                 refs [terminus]
//! terminus  : NodeRecord (empty key)     refs [skip list, terminus, last, fwd_0 .. fwd_{depth-1}]
//! node      : NodeRecord                 refs [skip list, value, prev, fwd_0 .. fwd_{height-1}]
//! ```
//!
//! Level 0 is a doubly linked cycle through the terminus; every higher level is
//! a forward only subsequence of the level below it.

mod capacity;
mod descent;
mod mutation;
mod node;
mod verify;

use std::iter;

use bytes::Bytes;
use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::{Error, Result};
use crate::options::Options;
use crate::record::{MetaRecord, NodeRecord};
use crate::store::{Store, Txn};
use crate::types::{forward_slot, ObjectRef, FORWARD_BASE, PREV_SLOT, TERMINUS_SLOT, VALUE_SLOT};

pub use node::Node;

pub struct SkipList<S: Store> {
    store: S,
    obj: ObjectRef,
    rng: Mutex<StdRng>,
}

impl<S: Store> SkipList<S> {
    /// Creates an empty list in its own transaction.
    pub fn create(store: S, options: Options) -> Result<Self> {
        options.validate()?;
        let obj = store.run_transaction(|txn| Self::create_in(txn, &options))?;
        Ok(Self::attach(store, obj, &options))
    }

    /// Creates the metadata object and the terminus inside `txn` and returns
    /// the identity of the new list.
    pub fn create_in(txn: &mut S::Txn, options: &Options) -> Result<ObjectRef> {
        options.validate()?;
        let depth = options.initial_depth;
        let p = options.probability;

        let mut level_probabilities = Vec::with_capacity(depth - 1);
        let mut threshold = p;
        for _ in 1..depth {
            level_probabilities.push(threshold);
            threshold *= p;
        }
        let meta = MetaRecord {
            length: 0,
            level_probabilities,
            cur_depth: depth as u64,
            cur_capacity: capacity::calculate_capacity(p, depth as u64),
        };

        let terminus_bytes = NodeRecord::terminus(depth).encode()?;
        let terminus = txn.create_object(&terminus_bytes, &[])?;
        let list = txn.create_object(&meta.encode()?, &[terminus])?;

        //                             list  value     prev
        let refs: Vec<ObjectRef> = [list, terminus, terminus]
            .into_iter()
            .chain(iter::repeat(terminus).take(depth))
            .collect();
        txn.write_object(terminus, &terminus_bytes, &refs)?;
        Ok(list)
    }

    /// Attaches a new handle, with its own random source, to an existing list.
    pub fn open(store: S, obj: ObjectRef, options: Options) -> Result<Self> {
        options.validate()?;
        store.run_transaction(|txn| Meta::read(txn, obj).map(|_| ()))?;
        Ok(Self::attach(store, obj, &options))
    }

    fn attach(store: S, obj: ObjectRef, options: &Options) -> Self {
        let rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        SkipList {
            store,
            obj,
            rng: Mutex::new(rng),
        }
    }

    pub fn id(&self) -> ObjectRef {
        self.obj
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn insert(&self, key: &[u8], value: &[u8]) -> Result<Node<'_, S>> {
        let obj = self
            .store
            .run_transaction(|txn| self.insert_in(txn, key, value))?;
        Ok(Node::new(self, obj))
    }

    /// Returns the node holding `key`, or `Error::NotFound`.
    pub fn get(&self, key: &[u8]) -> Result<Node<'_, S>> {
        let obj = self.store.run_transaction(|txn| self.get_in(txn, key))?;
        Ok(Node::new(self, obj))
    }

    pub fn get_in(&self, txn: &mut S::Txn, key: &[u8]) -> Result<ObjectRef> {
        let meta = Meta::read(txn, self.obj)?;
        match descent::get_eq_or_less_than(txn, meta.terminus(), key)? {
            descent::Descent::Found(obj) => Ok(obj),
            descent::Descent::NotFound { predecessor, .. } => {
                // The descent only reports a match through a cached key; the
                // predecessor can still be checked directly.
                if predecessor != meta.terminus() {
                    let node = Loaded::read(txn, predecessor)?;
                    if node.record.key == key {
                        return Ok(predecessor);
                    }
                }
                Err(Error::NotFound(format!("key {:?}", key)))
            }
        }
    }

    /// Removes `node` if it is still the node that holds its key. Returns
    /// `false` when the key has meanwhile been taken over by another node.
    pub fn remove(&self, node: &Node<'_, S>) -> Result<bool> {
        self.store
            .run_transaction(|txn| self.remove_in(txn, node.id()))
    }

    pub fn first(&self) -> Result<Option<Node<'_, S>>> {
        let obj = self.store.run_transaction(|txn| self.first_in(txn))?;
        Ok(obj.map(|obj| Node::new(self, obj)))
    }

    pub fn first_in(&self, txn: &mut S::Txn) -> Result<Option<ObjectRef>> {
        let meta = Meta::read(txn, self.obj)?;
        self.neighbour_in(txn, meta.terminus(), forward_slot(0))
    }

    pub fn last(&self) -> Result<Option<Node<'_, S>>> {
        let obj = self.store.run_transaction(|txn| self.last_in(txn))?;
        Ok(obj.map(|obj| Node::new(self, obj)))
    }

    pub fn last_in(&self, txn: &mut S::Txn) -> Result<Option<ObjectRef>> {
        let meta = Meta::read(txn, self.obj)?;
        self.neighbour_in(txn, meta.terminus(), PREV_SLOT)
    }

    pub fn length(&self) -> Result<u64> {
        self.store.run_transaction(|txn| self.length_in(txn))
    }

    pub fn length_in(&self, txn: &mut S::Txn) -> Result<u64> {
        Ok(Meta::read(txn, self.obj)?.record.length)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.length()? == 0)
    }

    pub fn key_in(&self, txn: &mut S::Txn, node: ObjectRef) -> Result<Vec<u8>> {
        Ok(Loaded::read(txn, node)?.record.key)
    }

    pub fn value_in(&self, txn: &mut S::Txn, node: ObjectRef) -> Result<Bytes> {
        let node = txn.read_object(node)?;
        let value = *node
            .refs
            .get(VALUE_SLOT)
            .ok_or_else(|| Error::Corruption("node without value reference".into()))?;
        Ok(txn.read_object(value)?.value)
    }

    /// Follows `slot` of `from`. The terminus maps to `None`.
    pub(crate) fn neighbour_in(
        &self,
        txn: &mut S::Txn,
        from: ObjectRef,
        slot: usize,
    ) -> Result<Option<ObjectRef>> {
        let terminus = Meta::read(txn, self.obj)?.terminus();
        let node = Loaded::read(txn, from)?;
        let target = node.refs[slot];
        if target == terminus {
            Ok(None)
        } else {
            Ok(Some(target))
        }
    }
}

/// The metadata object as read by the current attempt.
pub(crate) struct Meta {
    pub obj: ObjectRef,
    pub record: MetaRecord,
    pub refs: Vec<ObjectRef>,
}

impl Meta {
    pub fn read<T: Txn>(txn: &mut T, obj: ObjectRef) -> Result<Self> {
        let object = txn.read_object(obj)?;
        let record = MetaRecord::decode(&object.value)?;
        if object.refs.len() != 1 {
            return Err(Error::Corruption(format!(
                "skip list {} has {} references",
                obj,
                object.refs.len()
            )));
        }
        if record.cur_depth < 2 || record.level_probabilities.len() + 1 != record.depth() {
            return Err(Error::Corruption(format!(
                "skip list {} has depth {} with {} level probabilities",
                obj,
                record.cur_depth,
                record.level_probabilities.len()
            )));
        }
        Ok(Meta {
            obj,
            record,
            refs: object.refs,
        })
    }

    pub fn store<T: Txn>(&self, txn: &mut T) -> Result<()> {
        txn.write_object(self.obj, &self.record.encode()?, &self.refs)
    }

    pub fn terminus(&self) -> ObjectRef {
        self.refs[TERMINUS_SLOT]
    }

    /// Ratio between consecutive thresholds; the first threshold is the ratio itself.
    pub fn probability(&self) -> f32 {
        self.record.level_probabilities[0]
    }
}

/// A node, or the terminus, as read by the current attempt.
pub(crate) struct Loaded {
    pub obj: ObjectRef,
    pub record: NodeRecord,
    pub refs: Vec<ObjectRef>,
}

impl Loaded {
    pub fn read<T: Txn>(txn: &mut T, obj: ObjectRef) -> Result<Self> {
        let object = txn.read_object(obj)?;
        let record = NodeRecord::decode(&object.value)?;
        if object.refs.len() != FORWARD_BASE + record.height() {
            return Err(Error::Corruption(format!(
                "node {} has height {} but {} references",
                obj,
                record.height(),
                object.refs.len()
            )));
        }
        Ok(Loaded {
            obj,
            record,
            refs: object.refs,
        })
    }

    pub fn store<T: Txn>(&self, txn: &mut T) -> Result<()> {
        txn.write_object(self.obj, &self.record.encode()?, &self.refs)
    }

    pub fn height(&self) -> usize {
        self.record.height()
    }

    pub fn forward(&self, level: usize) -> ObjectRef {
        self.refs[forward_slot(level)]
    }
}

/// Points `obj`'s level-`level` forward reference at `target` and caches
/// `target_key` for it. Returns the successor and cached key it replaced.
pub(crate) fn set_next<T: Txn>(
    txn: &mut T,
    obj: ObjectRef,
    level: usize,
    target_key: &[u8],
    target: ObjectRef,
) -> Result<(ObjectRef, Vec<u8>)> {
    let mut node = Loaded::read(txn, obj)?;
    if level >= node.height() {
        return Err(Error::Corruption(format!(
            "node {} of height {} has no level {}",
            obj,
            node.height(),
            level
        )));
    }
    let old_key = std::mem::replace(&mut node.record.next_keys[level], target_key.to_vec());
    let old_target = std::mem::replace(&mut node.refs[forward_slot(level)], target);
    node.store(txn)?;
    Ok((old_target, old_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mem::MemStore;

    fn new_list() -> SkipList<MemStore> {
        SkipList::create(MemStore::new(), Options::default().with_seed(7)).unwrap()
    }

    #[test]
    fn test_create_layout() {
        let list = new_list();
        let store = list.store().clone();
        store
            .run_transaction(|txn| {
                let meta = Meta::read(txn, list.id())?;
                assert_eq!(meta.record.length, 0);
                assert_eq!(meta.record.cur_depth, 2);
                assert_eq!(meta.record.cur_capacity, 16);
                assert_eq!(meta.record.level_probabilities, vec![0.25]);

                let terminus = Loaded::read(txn, meta.terminus())?;
                assert_eq!(terminus.height(), 2);
                assert_eq!(
                    terminus.refs,
                    vec![
                        list.id(),
                        meta.terminus(),
                        meta.terminus(),
                        meta.terminus(),
                        meta.terminus()
                    ]
                );
                Ok(())
            })
            .unwrap();
        assert_eq!(list.length().unwrap(), 0);
        assert!(list.first().unwrap().is_none());
        assert!(list.last().unwrap().is_none());
    }

    #[test]
    fn test_create_deeper() {
        let mut options = Options::default();
        options.initial_depth = 4;
        let list = SkipList::create(MemStore::new(), options).unwrap();
        list.store()
            .run_transaction(|txn| {
                let meta = Meta::read(txn, list.id())?;
                assert_eq!(meta.record.level_probabilities, vec![0.25, 0.0625, 0.015625]);
                assert_eq!(meta.record.cur_capacity, 256);
                assert_eq!(Loaded::read(txn, meta.terminus())?.height(), 4);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_open_rejects_non_list() {
        let store = MemStore::new();
        let root = store.root();
        let result = SkipList::open(store, root, Options::default());
        assert!(matches!(result, Err(Error::Corruption(_))));
    }

    #[test]
    fn test_set_next_returns_replaced() {
        let list = new_list();
        list.store()
            .run_transaction(|txn| {
                let terminus = Meta::read(txn, list.id())?.terminus();
                let other = txn.create_object(b"", &[])?;
                let (old, old_key) = set_next(txn, terminus, 1, b"k", other)?;
                assert_eq!(old, terminus);
                assert!(old_key.is_empty());
                let node = Loaded::read(txn, terminus)?;
                assert_eq!(node.forward(1), other);
                assert_eq!(node.record.next_keys[1], b"k".to_vec());
                assert!(matches!(
                    set_next(txn, terminus, 2, b"k", other),
                    Err(Error::Corruption(_))
                ));
                Ok(())
            })
            .unwrap();
    }
}
