//! Apply one invocation's instructions to state.
//!
//! An invocation is all or nothing: every instruction runs against a shared
//! [Layer], and the resulting change set reaches the underlying state only
//! when every instruction succeeded.

use crate::{Caller, Invocation, Layer, LedgerError, State, Status};
use anyhow::Context as _;
use commonware_codec::Encode;
use commonware_cryptography::{sha256::Digest, Hasher, Sha256};
use tracing::{debug, warn};
use unspent_types::{Instruction, Receipt, TxId};

/// Result of a committed invocation.
#[derive(Debug)]
pub struct InvocationResult {
    /// One receipt per instruction, in order.
    pub receipts: Vec<Receipt>,
    /// Ordered write set applied to state.
    pub changes: Vec<(Vec<u8>, Status)>,
    /// Digest over the write set. Independent executors of the same invocation
    /// against the same state agree on it.
    pub digest: Digest,
}

/// Execute `instructions` as one invocation identified by `tx_id`.
///
/// `tx_id` must be unique per invocation; it seeds the ids of every output and
/// lock created here. On error nothing is written.
pub async fn execute_invocation<S: State>(
    state: &mut S,
    namespace: &[u8],
    max_batch_transfers: usize,
    tx_id: TxId,
    caller: &Caller,
    instructions: &[Instruction],
) -> Result<InvocationResult, LedgerError> {
    let mut layer = Layer::new(&*state, namespace, Invocation::new(tx_id))
        .with_max_batch_transfers(max_batch_transfers);

    let mut receipts = Vec::with_capacity(instructions.len());
    for (index, instruction) in instructions.iter().enumerate() {
        match layer.apply(caller, instruction).await {
            Ok(receipt) => receipts.push(receipt),
            Err(err) => {
                warn!(
                    %tx_id,
                    index,
                    operation = instruction.name(),
                    caller = %caller.address,
                    error = %err,
                    "instruction rejected; discarding invocation"
                );
                return Err(err);
            }
        }
    }

    let changes = layer.commit();
    let digest = digest_changes(&changes);
    state
        .apply(changes.clone())
        .await
        .with_context(|| format!("apply changes of {tx_id}"))?;
    debug!(
        %tx_id,
        instructions = instructions.len(),
        changes = changes.len(),
        "invocation committed"
    );

    Ok(InvocationResult {
        receipts,
        changes,
        digest,
    })
}

fn digest_changes(changes: &[(Vec<u8>, Status)]) -> Digest {
    let mut hasher = Sha256::new();
    for (key, status) in changes {
        hasher.update(&(key.len() as u64).to_be_bytes());
        hasher.update(key);
        hasher.update(&status.encode());
    }
    hasher.finalize()
}
