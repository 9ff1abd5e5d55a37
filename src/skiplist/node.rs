use std::fmt;

use bytes::Bytes;

use crate::error::Result;
use crate::store::Store;
use crate::types::{forward_slot, ObjectRef, PREV_SLOT};

use super::SkipList;

/// Handle to a node of a skip list. Holds nothing but the node's identity;
/// every accessor runs its own transaction.
pub struct Node<'a, S: Store> {
    list: &'a SkipList<S>,
    obj: ObjectRef,
}

impl<'a, S: Store> Node<'a, S> {
    pub(crate) fn new(list: &'a SkipList<S>, obj: ObjectRef) -> Self {
        Node { list, obj }
    }

    pub fn id(&self) -> ObjectRef {
        self.obj
    }

    pub fn key(&self) -> Result<Vec<u8>> {
        self.list
            .store
            .run_transaction(|txn| self.list.key_in(txn, self.obj))
    }

    pub fn value(&self) -> Result<Bytes> {
        self.list
            .store
            .run_transaction(|txn| self.list.value_in(txn, self.obj))
    }

    pub fn next(&self) -> Result<Option<Node<'a, S>>> {
        self.neighbour(forward_slot(0))
    }

    pub fn prev(&self) -> Result<Option<Node<'a, S>>> {
        self.neighbour(PREV_SLOT)
    }

    pub fn remove(&self) -> Result<bool> {
        self.list.remove(self)
    }

    fn neighbour(&self, slot: usize) -> Result<Option<Node<'a, S>>> {
        let list = self.list;
        let obj = list
            .store
            .run_transaction(|txn| list.neighbour_in(txn, self.obj, slot))?;
        Ok(obj.map(|obj| Node::new(list, obj)))
    }
}

impl<'a, S: Store> Clone for Node<'a, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, S: Store> Copy for Node<'a, S> {}

impl<'a, S: Store> PartialEq for Node<'a, S> {
    fn eq(&self, other: &Self) -> bool {
        self.obj == other.obj && self.list.obj == other.list.obj
    }
}

impl<'a, S: Store> Eq for Node<'a, S> {}

impl<'a, S: Store> fmt::Debug for Node<'a, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("list", &self.list.obj)
            .field("obj", &self.obj)
            .finish()
    }
}
