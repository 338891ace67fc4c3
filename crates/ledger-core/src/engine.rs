//! The aggregation engine: the single-writer event loop that owns the open
//! batch, the checkpoint file and the store, and hands closed roots to the
//! anchoring client (spec §4.5).

use crate::anchor::AnchorProvider;
use crate::checkpoint::{CheckpointStore, OpenBatch};
use crate::digest::{concat_hash, Digest};
use crate::mailbox::{Mailbox, Message};
use crate::model::{AnchorSpec, BranchRow, LeafRow, RootRow};
use crate::store;
use crate::timer::Timer;
use sqlx::{Pool, Sqlite};
use std::sync::Arc;

/// The non-core parts of a root's `spec` string (spec §6): everything except
/// the digest itself. `subsystem` is always `"ethereum"` for now (spec
/// §9/REDESIGN FLAGS item c — a narrow interface, no plugin registry).
#[derive(Debug, Clone)]
pub struct AnchorContext {
    pub subsystem: String,
    pub chain_id: String,
    pub contract: String,
    pub contract_address: String,
}

impl AnchorContext {
    fn spec_for(&self, root: Digest) -> String {
        let _ = root;
        AnchorSpec {
            subsystem: self.subsystem.clone(),
            chain_id: self.chain_id.clone(),
            contract: self.contract.clone(),
            contract_address: self.contract_address.clone(),
        }
        .format()
    }
}

/// Runs the event loop until the mailbox is closed (every sender dropped).
/// Owns `batch`, `timer` and all mutation of the store/checkpoint — the
/// single-writer discipline spec §5 requires.
pub async fn run(
    mut mailbox: Mailbox,
    pool: Pool<Sqlite>,
    checkpoint: CheckpointStore,
    anchor: Arc<dyn AnchorProvider>,
    capacity: u32,
    ctx: AnchorContext,
    mut timer: Timer,
) {
    let mut batch = checkpoint.load().unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to load checkpoint, starting from empty batch");
        OpenBatch::default()
    });
    // The engine's own view of enabled/disabled (spec §4.7), separate from
    // the facade's fast-path `AtomicBool`: it gates the engine-owned timer
    // and makes a late `Timer` firing a no-op rather than an anchored close.
    let mut enabled = true;
    timer.rearm();

    while let Some(msg) = mailbox.wait().await {
        match msg {
            Message::Submit(tx_id) => {
                handle_submit(&mut batch, tx_id, &pool, &checkpoint).await;
                if batch.count >= u64::from(capacity) {
                    close_tree(&mut batch, &pool, &checkpoint, anchor.as_ref(), &ctx, &mut timer).await;
                }
            }
            Message::Timer => {
                if enabled {
                    close_tree(&mut batch, &pool, &checkpoint, anchor.as_ref(), &ctx, &mut timer).await;
                } else {
                    // spec §4.2: "a late firing that arrives after disable is
                    // treated as a no-op by the engine when the subsystem is
                    // disabled".
                    tracing::debug!("timer fired while disabled; ignoring");
                }
            }
            Message::Verify(tx_id, reply) => {
                let result = crate::verify::verify(&pool, anchor.as_ref(), tx_id).await;
                // The caller may have given up waiting; a dropped receiver is
                // not this loop's problem.
                let _ = reply.send(result);
            }
            Message::Enable => {
                enabled = true;
                timer.rearm();
            }
            Message::Disable => {
                enabled = false;
                timer.cancel();
            }
        }
    }
}

/// Submit handling, spec §4.5: fill `left`, then `right` (writing the leaf
/// and clearing both), persisting the checkpoint after each mutation.
async fn handle_submit(
    batch: &mut OpenBatch,
    tx_id: Digest,
    pool: &Pool<Sqlite>,
    checkpoint: &CheckpointStore,
) {
    if batch.left.is_none() {
        batch.left = Some(tx_id);
        persist(checkpoint, batch);
        return;
    }

    let left = batch.left.expect("checked above");
    batch.right = Some(tx_id);
    let digest = concat_hash(&left, &tx_id);
    batch.digest = Some(digest);
    // Persist with left/right/digest all populated — matches the original's
    // "write the pending pair before the leaf row" ordering, so a crash here
    // recovers exactly at this point.
    persist(checkpoint, batch);

    if let Err(e) = store::insert_leaf(
        pool,
        &LeafRow {
            digest,
            left,
            right: tx_id,
            prev: batch.prev,
        },
    )
    .await
    {
        tracing::error!(error = %e, digest = %digest, "failed to write leaf row");
    }

    batch.prev = Some(digest);
    batch.digest = None;
    batch.left = None;
    batch.right = None;
    batch.count += 2;
    persist(checkpoint, batch);
}

fn persist(checkpoint: &CheckpointStore, batch: &OpenBatch) {
    if let Err(e) = checkpoint.store(batch) {
        tracing::error!(error = %e, "failed to persist checkpoint");
    }
}

/// Close procedure, spec §4.5. Always rearms the timer first; always leaves
/// the checkpoint empty on disk when it returns.
async fn close_tree(
    batch: &mut OpenBatch,
    pool: &Pool<Sqlite>,
    checkpoint: &CheckpointStore,
    anchor: &dyn AnchorProvider,
    ctx: &AnchorContext,
    timer: &mut Timer,
) {
    timer.rearm();

    let initial_digest = if let (Some(left), None) = (batch.left, batch.right) {
        // Odd tail: duplicate the lone pending transaction into a leaf.
        let digest = concat_hash(&left, &left);
        if let Err(e) = store::insert_leaf(
            pool,
            &LeafRow {
                digest,
                left,
                right: left,
                prev: batch.prev,
            },
        )
        .await
        {
            tracing::error!(error = %e, digest = %digest, "failed to write duplicated singleton leaf");
        }
        Some(digest)
    } else {
        batch.prev
    };

    // Checkpoint must read empty before any branch/root writes, so a crash
    // mid-close can never reopen a stale batch (spec §4.5 step 2).
    if let Err(e) = checkpoint.clear() {
        tracing::error!(error = %e, "failed to clear checkpoint on close");
    }
    *batch = OpenBatch::default();

    let Some(initial_digest) = initial_digest else {
        tracing::debug!("nothing to close");
        return;
    };

    let base = match leaf_chain(pool, initial_digest).await {
        Ok(base) => base,
        Err(e) => {
            tracing::error!(error = %e, "failed to walk leaf chain at close");
            return;
        }
    };

    let root = match fold(pool, base).await {
        Ok(root) => root,
        Err(e) => {
            tracing::error!(error = %e, "failed to fold Merkle tree at close");
            return;
        }
    };

    let spec = ctx.spec_for(root);
    if let Err(e) = store::insert_root(pool, &RootRow { root, spec }).await {
        tracing::error!(error = %e, root = %root, "failed to write root row");
        return;
    }

    if let Err(e) = anchor.anchor(root).await {
        tracing::error!(error = %e, root = %root, "failed to anchor root");
    }
}

/// Walk the leaf `prev` chain backward from `initial_digest`, producing the
/// batch's leaves in submission order (spec §4.5 step 3, I3).
async fn leaf_chain(pool: &Pool<Sqlite>, initial_digest: Digest) -> Result<Vec<Digest>, store::StoreError> {
    let mut base = Vec::new();
    let mut cursor = Some(initial_digest);
    while let Some(d) = cursor {
        match store::lookup_leaf_by_digest(pool, d).await? {
            Some(row) => {
                base.insert(0, row.digest);
                cursor = row.prev;
            }
            None => break,
        }
    }
    Ok(base)
}

/// Fold `base` up to a single root, writing a branch row per pairing. An odd
/// trailing element at any level is paired with itself (spec's folding
/// determinism rule). A single-element `base` is already the root — no
/// self-pairing is performed at the top, which is what makes a one-leaf
/// batch's root equal to that leaf's digest (see SPEC_FULL §10 / DESIGN.md
/// for why this departs from the original's per-level `count <= 2` loop).
async fn fold(pool: &Pool<Sqlite>, mut base: Vec<Digest>) -> Result<Digest, store::StoreError> {
    while base.len() > 1 {
        let mut next = Vec::with_capacity(base.len().div_ceil(2));
        let mut iter = base.into_iter();
        loop {
            match (iter.next(), iter.next()) {
                (Some(l), Some(r)) => {
                    let d = concat_hash(&l, &r);
                    store::insert_branch(pool, &BranchRow { digest: d, left: l, right: r }).await?;
                    next.push(d);
                }
                (Some(l), None) => {
                    let d = concat_hash(&l, &l);
                    store::insert_branch(pool, &BranchRow { digest: d, left: l, right: l }).await?;
                    next.push(d);
                }
                (None, None) => break,
            }
        }
        base = next;
    }
    Ok(base[0])
}
