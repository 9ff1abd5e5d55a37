use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::options::RetryPolicy;
use crate::types::{ObjectRef, Version};

use super::{Object, Store, Txn};

struct Stored {
    version: Version,
    value: Bytes,
    refs: Vec<ObjectRef>,
}

struct Inner {
    objects: HashMap<ObjectRef, Stored>,
    version: Version,
    next_id: u64,
    commits: u64,
    conflicts: u64,
}

impl Inner {
    fn alloc(&mut self) -> ObjectRef {
        self.next_id += 1;
        ObjectRef::new(self.next_id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub commits: u64,
    pub conflicts: u64,
}

/// In-process optimistic object store.
///
/// A transaction pins the store version it started at. Reading an object that
/// was committed after that point is a conflict, so an attempt only ever sees
/// one consistent snapshot. Commit re-checks the version of everything that was
/// read and installs all writes under a single new version.
#[derive(Clone)]
pub struct MemStore {
    inner: Arc<Mutex<Inner>>,
    policy: RetryPolicy,
    root: ObjectRef,
}

impl MemStore {
    pub fn new() -> Self {
        Self::with_policy(RetryPolicy::default())
    }

    pub fn with_policy(policy: RetryPolicy) -> Self {
        let mut inner = Inner {
            objects: HashMap::new(),
            version: 0,
            next_id: 0,
            commits: 0,
            conflicts: 0,
        };
        let root = inner.alloc();
        inner.objects.insert(
            root,
            Stored {
                version: 0,
                value: Bytes::new(),
                refs: Vec::new(),
            },
        );
        MemStore {
            inner: Arc::new(Mutex::new(inner)),
            policy,
            root,
        }
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            commits: inner.commits,
            conflicts: inner.conflicts,
        }
    }

    /// Number of committed objects, the root included.
    pub fn object_count(&self) -> usize {
        self.inner.lock().objects.len()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemStore {
    type Txn = MemTxn;

    fn begin(&self) -> MemTxn {
        let start = self.inner.lock().version;
        MemTxn {
            inner: self.inner.clone(),
            start,
            reads: HashMap::new(),
            writes: HashMap::new(),
            created: HashSet::new(),
        }
    }

    fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn root(&self) -> ObjectRef {
        self.root
    }
}

pub struct MemTxn {
    inner: Arc<Mutex<Inner>>,
    start: Version,
    reads: HashMap<ObjectRef, Version>,
    writes: HashMap<ObjectRef, Object>,
    created: HashSet<ObjectRef>,
}

impl Txn for MemTxn {
    fn create_object(&mut self, value: &[u8], refs: &[ObjectRef]) -> Result<ObjectRef> {
        let obj = self.inner.lock().alloc();
        self.created.insert(obj);
        self.writes.insert(
            obj,
            Object {
                value: Bytes::copy_from_slice(value),
                refs: refs.to_vec(),
            },
        );
        Ok(obj)
    }

    fn read_object(&mut self, obj: ObjectRef) -> Result<Object> {
        if let Some(written) = self.writes.get(&obj) {
            return Ok(written.clone());
        }
        let mut inner = self.inner.lock();
        let (version, object) = match inner.objects.get(&obj) {
            Some(stored) => (
                stored.version,
                Object {
                    value: stored.value.clone(),
                    refs: stored.refs.clone(),
                },
            ),
            None => return Err(Error::UnknownObject(obj)),
        };
        if version > self.start {
            inner.conflicts += 1;
            return Err(Error::Conflict);
        }
        self.reads.insert(obj, version);
        Ok(object)
    }

    fn write_object(&mut self, obj: ObjectRef, value: &[u8], refs: &[ObjectRef]) -> Result<()> {
        if !self.created.contains(&obj) && !self.writes.contains_key(&obj) {
            let mut inner = self.inner.lock();
            match inner.objects.get(&obj) {
                None => return Err(Error::UnknownObject(obj)),
                Some(stored) if stored.version > self.start => {
                    inner.conflicts += 1;
                    return Err(Error::Conflict);
                }
                Some(_) => {}
            }
        }
        self.writes.insert(
            obj,
            Object {
                value: Bytes::copy_from_slice(value),
                refs: refs.to_vec(),
            },
        );
        Ok(())
    }

    fn commit(self) -> Result<()> {
        let mut inner = self.inner.lock();
        let stale = self.reads.iter().any(|(obj, version)| {
            inner
                .objects
                .get(obj)
                .map_or(true, |stored| stored.version != *version)
        }) || self.writes.keys().any(|obj| {
            !self.created.contains(obj)
                && inner
                    .objects
                    .get(obj)
                    .map_or(false, |stored| stored.version > self.start)
        });
        if stale {
            inner.conflicts += 1;
            return Err(Error::Conflict);
        }
        if self.writes.is_empty() {
            return Ok(());
        }

        inner.version += 1;
        let version = inner.version;
        for (obj, object) in self.writes {
            inner.objects.insert(
                obj,
                Stored {
                    version,
                    value: object.value,
                    refs: object.refs,
                },
            );
        }
        inner.commits += 1;
        Ok(())
    }
}
