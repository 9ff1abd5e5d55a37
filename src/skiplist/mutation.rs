use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::record::NodeRecord;
use crate::store::{Store, Txn};
use crate::types::{ObjectRef, FORWARD_BASE, LIST_SLOT, PREV_SLOT, VALUE_SLOT};

use super::capacity::ensure_capacity;
use super::descent::{find_predecessors, get_eq_or_less_than, Descent};
use super::{set_next, Loaded, Meta, SkipList};

impl<S: Store> SkipList<S> {
    /// Inserts `key` or, if it is already present, points its node at a new
    /// value object. Returns the node holding `key`.
    pub fn insert_in(&self, txn: &mut S::Txn, key: &[u8], value: &[u8]) -> Result<ObjectRef> {
        if key.is_empty() {
            return Err(Error::InvalidArgument("empty key".into()));
        }
        let mut meta = ensure_capacity(txn, self.obj)?;
        let terminus = meta.terminus();

        let path = match get_eq_or_less_than(txn, terminus, key)? {
            Descent::Found(obj) => {
                let value_obj = txn.create_object(value, &[])?;
                let mut node = Loaded::read(txn, obj)?;
                node.refs[VALUE_SLOT] = value_obj;
                node.store(txn)?;
                return Ok(obj);
            }
            Descent::NotFound { path, .. } => path,
        };
        let value_obj = txn.create_object(value, &[])?;

        let (height_rand, height) = self.choose_height(&meta.record);
        let height = height.min(path.len());

        // splice in before whatever each predecessor points at now
        let mut refs = Vec::with_capacity(FORWARD_BASE + height);
        refs.extend([self.obj, value_obj, path[0]]);
        let mut next_keys = Vec::with_capacity(height);
        for (level, pred) in path.iter().take(height).enumerate() {
            let pred = Loaded::read(txn, *pred)?;
            refs.push(pred.forward(level));
            next_keys.push(pred.record.next_keys[level].clone());
        }
        let record = NodeRecord::new(height_rand, key, next_keys);
        let obj = txn.create_object(&record.encode()?, &refs)?;

        let mut successor = Loaded::read(txn, refs[FORWARD_BASE])?;
        successor.refs[PREV_SLOT] = obj;
        successor.store(txn)?;

        for (level, pred) in path.iter().take(height).enumerate() {
            set_next(txn, *pred, level, key, obj)?;
        }

        meta.record.length += 1;
        meta.store(txn)?;
        trace!(node = %obj, height, length = meta.record.length, "inserted");
        Ok(obj)
    }

    /// Unlinks `node` from every level it is on. The node's key is resolved
    /// again first; if it now belongs to a different node the call is a no-op
    /// and returns `false`.
    pub fn remove_in(&self, txn: &mut S::Txn, node: ObjectRef) -> Result<bool> {
        let mut meta = Meta::read(txn, self.obj)?;
        let terminus = meta.terminus();
        if node == terminus {
            return Err(Error::InvalidArgument("the terminus cannot be removed".into()));
        }
        let target = Loaded::read(txn, node)?;
        if target.refs[LIST_SLOT] != self.obj {
            return Err(Error::InvalidArgument(format!(
                "{} does not belong to skip list {}",
                node, self.obj
            )));
        }
        let key = &target.record.key;

        match get_eq_or_less_than(txn, terminus, key)? {
            Descent::Found(found) if found == node => {}
            Descent::Found(found) => {
                debug!(node = %node, current = %found, "remove lost the key to another node");
                return Ok(false);
            }
            Descent::NotFound { .. } => {
                return Err(Error::NotFound(format!("key {:?}", key)));
            }
        }

        let path = find_predecessors(txn, terminus, key)?;
        if path.len() < target.height() {
            return Err(Error::Corruption(format!(
                "node {} is taller ({}) than its list ({})",
                node,
                target.height(),
                path.len()
            )));
        }

        let mut successor = Loaded::read(txn, target.forward(0))?;
        successor.refs[PREV_SLOT] = target.refs[PREV_SLOT];
        successor.store(txn)?;

        for (level, pred) in path.iter().take(target.height()).enumerate() {
            let (replaced, _) = set_next(
                txn,
                *pred,
                level,
                &target.record.next_keys[level],
                target.forward(level),
            )?;
            if replaced != node {
                return Err(Error::Corruption(format!(
                    "predecessor {} at level {} points at {}, not at {}",
                    pred, level, replaced, node
                )));
            }
        }

        meta.record.length -= 1;
        meta.store(txn)?;
        trace!(node = %node, length = meta.record.length, "removed");
        Ok(true)
    }
}
