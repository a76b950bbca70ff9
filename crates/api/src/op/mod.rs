// Copyright (C) Microsoft Corporation. All rights reserved.

//! Live cryptographic jobs and the process-wide operation table.
//!
//! Every job implements [`CipherOperation`]; the service façade drives it
//! through the begin/update/finish/abort state machine. The table is the
//! only shared mutable state in the service: a single mutex guards it,
//! and update/finish atomically remove the entry before touching the
//! operation, so a concurrent abort simply misses the handle.

mod aes;
mod ec;
mod hmac;
mod rsa;

use std::collections::HashMap;

pub(crate) use aes::*;
pub(crate) use ec::*;
pub(crate) use hmac::*;
use parking_lot::Mutex;
pub(crate) use rsa::*;

use crate::authset::AuthorizationSet;
use crate::error::ErrorCode;

/// Upper bound on concurrently live operations.
pub const MAX_OPERATIONS: usize = 16;

/// A primitive adapter driving one (algorithm, purpose, mode) triple.
pub(crate) trait CipherOperation: Send {
    /// Feeds AEAD associated data; non-AEAD operations reject it.
    fn update_aad(&mut self, _aad: &[u8]) -> Result<(), ErrorCode> {
        Err(ErrorCode::InvalidArgument)
    }

    /// Receives the AEAD tag parameter; operations that take no tag
    /// ignore it.
    fn supply_tag(&mut self, _tag: &[u8]) -> Result<(), ErrorCode> {
        Ok(())
    }

    /// Consumes a prefix of `input`, returning (bytes consumed, output).
    fn update(&mut self, input: &[u8]) -> Result<(usize, Vec<u8>), ErrorCode>;

    /// Produces the final output. `signature` is only meaningful for
    /// verify operations.
    fn finish(
        &mut self,
        signature: Option<&[u8]>,
        out_params: &mut AuthorizationSet,
    ) -> Result<Vec<u8>, ErrorCode>;
}

/// A live operation as stored in the table.
pub(crate) struct Operation {
    imp: Box<dyn CipherOperation>,
}

impl Operation {
    pub(crate) fn new(imp: Box<dyn CipherOperation>) -> Self {
        Self { imp }
    }

    pub(crate) fn imp(&mut self) -> &mut dyn CipherOperation {
        self.imp.as_mut()
    }
}

struct TableInner {
    ops: HashMap<u64, Operation>,
    live: usize,
    next_handle: u64,
}

/// Process-wide handle-to-operation map.
///
/// `live` counts allocated handles rather than map entries because
/// update/finish temporarily check an operation out of the map; a begin
/// racing that window must still see the slot as occupied.
pub(crate) struct OperationTable {
    inner: Mutex<TableInner>,
}

impl OperationTable {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(TableInner {
                ops: HashMap::new(),
                live: 0,
                next_handle: 1,
            }),
        }
    }

    /// Registers an operation under a fresh non-zero handle.
    pub(crate) fn insert(&self, op: Operation) -> Result<u64, ErrorCode> {
        let mut inner = self.inner.lock();
        if inner.live >= MAX_OPERATIONS {
            Err(ErrorCode::TooManyOperations)?;
        }
        let mut handle = inner.next_handle.max(1);
        while inner.ops.contains_key(&handle) {
            handle = handle.wrapping_add(1).max(1);
        }
        inner.next_handle = handle.wrapping_add(1).max(1);
        inner.live += 1;
        inner.ops.insert(handle, op);
        Ok(handle)
    }

    /// Checks an operation out of the table. The handle stays allocated
    /// until [`Self::put_back`] or [`Self::retire`].
    pub(crate) fn take(&self, handle: u64) -> Result<Operation, ErrorCode> {
        self.inner
            .lock()
            .ops
            .remove(&handle)
            .ok_or(ErrorCode::InvalidOperationHandle)
    }

    /// Returns a checked-out operation to the table.
    pub(crate) fn put_back(&self, handle: u64, op: Operation) {
        let mut inner = self.inner.lock();
        inner.ops.insert(handle, op);
    }

    /// Releases the slot of a checked-out operation.
    pub(crate) fn retire(&self) {
        let mut inner = self.inner.lock();
        debug_assert!(inner.live > 0);
        inner.live = inner.live.saturating_sub(1);
    }
}
