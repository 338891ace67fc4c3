//! The verifier: walks a transaction ID up through leaf and branch rows to a
//! root, then confirms that root is actually anchored (spec §4.6).

use crate::anchor::AnchorProvider;
use crate::digest::Digest;
use crate::model::{AnchorSpec, Position, ProofStep, VerifiedSpec, VerifyResult};
use crate::store::{self, StoreError};
use sqlx::{Pool, Sqlite};

/// Verify that `tx_id` was registered, closed into a root, and that root is
/// anchored. Never returns `Err` for an ordinary "not found" outcome — those
/// are folded into [`VerifyResult::found`] per spec §7 (operational faults
/// live in the result, not the error channel).
pub async fn verify(
    pool: &Pool<Sqlite>,
    anchor: &dyn AnchorProvider,
    tx_id: Digest,
) -> VerifyResult {
    match verify_inner(pool, anchor, tx_id).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, tx_id = %tx_id, "store error during verification");
            VerifyResult::not_found_because("internal error")
        }
    }
}

async fn verify_inner(
    pool: &Pool<Sqlite>,
    anchor: &dyn AnchorProvider,
    tx_id: Digest,
) -> Result<VerifyResult, StoreError> {
    let Some(leaf) = store::lookup_leaf_by_child(pool, tx_id).await? else {
        return Ok(VerifyResult::not_found());
    };

    let mut path = Vec::new();
    path.push(step_for(tx_id, leaf.left, leaf.right));
    let mut current = leaf.digest;

    loop {
        match store::lookup_branch_by_child(pool, current).await? {
            Some(branch) => {
                path.push(step_for(current, branch.left, branch.right));
                current = branch.digest;
            }
            None => break,
        }
    }

    let Some(root_row) = store::lookup_root(pool, current).await? else {
        tracing::warn!(top = %current, tx_id = %tx_id, "merkle root not found");
        return Ok(VerifyResult::not_found_because("orphan path"));
    };

    let Some(spec) = AnchorSpec::parse(&root_row.spec) else {
        return Ok(VerifyResult::not_found_because("malformed anchor spec"));
    };

    let block = anchor
        .lookup(current)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, root = %current, "anchor lookup failed");
        })
        .unwrap_or(0);

    if block <= 0 {
        tracing::warn!(root = %current, block, "merkle root not anchored");
        return Ok(VerifyResult::not_found_because("not anchored"));
    }

    Ok(VerifyResult {
        found: true,
        spec: Some(VerifiedSpec {
            subsystem: spec.subsystem,
            chain_id: spec.chain_id,
            contract: spec.contract,
            contract_address: spec.contract_address,
            block,
        }),
        path: Some(path),
        reason: None,
    })
}

/// Given the child digest being proven and the two children of its parent,
/// work out which side it's on and return the proof step for the sibling.
fn step_for(child: Digest, left: Digest, right: Digest) -> ProofStep {
    if child == left {
        ProofStep {
            position: Position::Left,
            sibling_digest: right,
        }
    } else {
        ProofStep {
            position: Position::Right,
            sibling_digest: left,
        }
    }
}
