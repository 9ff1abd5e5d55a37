pub mod mem;

use std::{thread, time::Duration};

use bytes::Bytes;
use rand::Rng;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::options::RetryPolicy;
use crate::types::ObjectRef;

/// Snapshot of one object as seen by a transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub value: Bytes,
    pub refs: Vec<ObjectRef>,
}

/// One attempt of an atomic multi-object read/write.
///
/// Every method may fail with `Error::Conflict`, after which the attempt is
/// worthless and must be thrown away. Reads observe the attempt's own writes.
pub trait Txn {
    fn create_object(&mut self, value: &[u8], refs: &[ObjectRef]) -> Result<ObjectRef>;
    fn read_object(&mut self, obj: ObjectRef) -> Result<Object>;
    /// Replaces both the value and the whole reference list of `obj`.
    fn write_object(&mut self, obj: ObjectRef, value: &[u8], refs: &[ObjectRef]) -> Result<()>;
    fn commit(self) -> Result<()>;
}

pub trait Store: Send + Sync + Clone + 'static {
    type Txn: Txn;

    fn begin(&self) -> Self::Txn;
    fn retry_policy(&self) -> &RetryPolicy;
    /// Well known object every client can reach.
    fn root(&self) -> ObjectRef;

    /// Runs `f` until an attempt commits. A conflict, raised either by `f` or
    /// by the commit, discards the attempt and starts over on a fresh
    /// transaction; any other error is returned as is.
    fn run_transaction<T, F>(&self, mut f: F) -> Result<T>
    where
        F: FnMut(&mut Self::Txn) -> Result<T>,
    {
        let policy = self.retry_policy();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut txn = self.begin();
            let outcome = match f(&mut txn) {
                Ok(v) => txn.commit().map(|_| v),
                Err(e) => Err(e),
            };
            match outcome {
                Err(Error::Conflict) => {}
                other => return other,
            }

            if let Some(max) = policy.max_attempts {
                if attempt >= max {
                    debug!(attempt, "transaction retries exhausted");
                    return Err(Error::RetriesExhausted(attempt));
                }
            }
            trace!(attempt, "transaction conflict, restarting");
            let limit = policy.backoff_limit(attempt).as_nanos() as u64;
            if limit > 0 {
                let nanos = rand::thread_rng().gen_range(0..=limit);
                thread::sleep(Duration::from_nanos(nanos));
            }
        }
    }
}
