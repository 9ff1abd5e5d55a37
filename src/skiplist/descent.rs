use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::store::Txn;
use crate::types::ObjectRef;

use super::Loaded;

pub(crate) enum Descent {
    /// A predecessor's cached successor key equals the search key.
    Found(ObjectRef),
    /// `predecessor` is the last node before the search key on level 0 (the
    /// terminus if there is none); `path[i]` is the last node before it on level `i`.
    NotFound {
        predecessor: ObjectRef,
        path: Vec<ObjectRef>,
    },
}

/// Descends from the terminus, stopping as soon as a cached successor key
/// equals `key`. The matched node itself is never read.
pub(crate) fn get_eq_or_less_than<T: Txn>(
    txn: &mut T,
    terminus: ObjectRef,
    key: &[u8],
) -> Result<Descent> {
    let mut cur = Loaded::read(txn, terminus)?;
    let depth = cur.height();
    let mut path = vec![terminus; depth];
    for level in (0..depth).rev() {
        let (last, found) = advance(txn, terminus, cur, level, key)?;
        if let Some(found) = found {
            return Ok(Descent::Found(found));
        }
        path[level] = last.obj;
        cur = last;
    }
    Ok(Descent::NotFound {
        predecessor: cur.obj,
        path,
    })
}

/// Like `get_eq_or_less_than` but never stops early: `path[i]` is the last
/// node on level `i` whose key sorts strictly before `key`.
pub(crate) fn find_predecessors<T: Txn>(
    txn: &mut T,
    terminus: ObjectRef,
    key: &[u8],
) -> Result<Vec<ObjectRef>> {
    let mut cur = Loaded::read(txn, terminus)?;
    let depth = cur.height();
    let mut path = vec![terminus; depth];
    for level in (0..depth).rev() {
        let (last, _) = advance(txn, terminus, cur, level, key)?;
        path[level] = last.obj;
        cur = last;
    }
    Ok(path)
}

/// Moves right along `level` while the cached successor key sorts before
/// `key`. Returns the node it stopped at and, if the successor's cached key is
/// equal to `key`, that successor.
fn advance<T: Txn>(
    txn: &mut T,
    terminus: ObjectRef,
    mut cur: Loaded,
    level: usize,
    key: &[u8],
) -> Result<(Loaded, Option<ObjectRef>)> {
    loop {
        let next = cur.forward(level);
        if next == terminus {
            return Ok((cur, None));
        }
        let next_key = &cur.record.next_keys[level];
        if next_key.is_empty() {
            return Err(Error::Corruption(format!(
                "empty cached key at level {} of {} for non terminus {}",
                level, cur.obj, next
            )));
        }
        match next_key.as_slice().cmp(key) {
            Ordering::Less => cur = Loaded::read(txn, next)?,
            Ordering::Equal => return Ok((cur, Some(next))),
            Ordering::Greater => return Ok((cur, None)),
        }
    }
}
