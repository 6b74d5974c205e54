//! The stream client: wires one [`StreamController`] to the note store, the
//! transition executor, and the proof backend, and enforces the
//! confirm-before-advance discipline.
//!
//! The client owns its controller; one client per stream, driven by one
//! logical thread of control. Suspension happens only at the collaborator
//! boundaries, and nothing here retries internally: every retryable step is
//! a public method the caller invokes again.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapters::{AdapterError, NoteStore, ProofBackend, TransactionId, TransitionExecutor};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::store::{NoteStatus, ProgramUtxoBalance, StatusTracker};
use serde::{Deserialize, Serialize};
use zkps_note::{Commitment, Note};
use zkps_stream::{
    build_deposit_witness, build_stream_witness, AdvanceOutcome, CollectAction, StreamController,
    StreamError, TransitionKind, TransitionRequest,
};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of one confirmed collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectOutcome {
    /// Ledger handle of the confirmed transition.
    pub transaction: TransactionId,
    /// The head note this collection consumed.
    pub consumed: Commitment,
    /// The continuation note now serving as head, if the stream continues.
    pub new_head: Option<Commitment>,
    /// The payout note created for the recipient, if any.
    pub payout: Option<Commitment>,
    /// Amount that left the stream's custody.
    pub collected: u64,
    /// Whether this was the terminal collection.
    pub closed: bool,
}

#[derive(Clone, Debug)]
struct PendingCollect {
    request: TransitionRequest,
    transaction: TransactionId,
}

// ═══════════════════════════════════════════════════════════════════════════════
// STREAM CLIENT
// ═══════════════════════════════════════════════════════════════════════════════

/// Async orchestration around one payment stream.
pub struct StreamClient {
    config: ClientConfig,
    controller: StreamController,
    store: Arc<dyn NoteStore>,
    executor: Arc<dyn TransitionExecutor>,
    prover: Arc<dyn ProofBackend>,
    tracker: StatusTracker,
    /// Submitted but not yet confirmed collection, if any.
    pending: Option<PendingCollect>,
    /// Set after a fatal sync inconsistency; never cleared.
    poisoned: bool,
}

impl fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamClient")
            .field("config", &self.config)
            .field("controller", &self.controller)
            .field("tracker", &self.tracker)
            .field("pending", &self.pending)
            .field("poisoned", &self.poisoned)
            .finish_non_exhaustive()
    }
}

impl StreamClient {
    /// A client with no stream yet.
    pub fn new(
        config: ClientConfig,
        store: Arc<dyn NoteStore>,
        executor: Arc<dyn TransitionExecutor>,
        prover: Arc<dyn ProofBackend>,
    ) -> Self {
        let controller = StreamController::new(config.asset, config.predicate);
        Self {
            config,
            controller,
            store,
            executor,
            prover,
            tracker: StatusTracker::default(),
            pending: None,
            poisoned: false,
        }
    }

    /// Rebuild a client around an existing stream from its origin note,
    /// locating the current head in the synced balance. Fails if the stream
    /// has no single `ready` continuation note.
    pub async fn resume(
        config: ClientConfig,
        store: Arc<dyn NoteStore>,
        executor: Arc<dyn TransitionExecutor>,
        prover: Arc<dyn ProofBackend>,
        origin: Note,
    ) -> Result<Self> {
        let origin_terms = match origin.stream_terms() {
            Some(terms) => *terms,
            None => {
                return Err(ClientError::Stream(StreamError::SchemaMismatch {
                    predicate: config.predicate,
                    detail: "origin note carries no stream terms".into(),
                }))
            }
        };
        let mut client = Self::new(config, store, executor, prover);
        let balance = client
            .store
            .sync(client.config.owner, client.config.predicate)
            .await?;
        client.observe_balance(&balance)?;

        let mut candidates: Vec<Note> = balance
            .token(&client.config.asset)
            .map(|token| {
                token
                    .records()
                    .filter(|record| {
                        record.status.is_spendable()
                            && record.note.stream_terms() == Some(&origin_terms)
                    })
                    .map(|record| record.note.clone())
                    .collect()
            })
            .unwrap_or_default();

        let head = match candidates.len() {
            0 => return Err(AdapterError::NotFound(origin.commitment()).into()),
            1 => candidates.remove(0),
            n => {
                return Err(AdapterError::Backend(format!(
                    "{} ready notes match the stream terms; cannot resume unambiguously",
                    n
                ))
                .into())
            }
        };
        client.controller = StreamController::restore(origin, head)?;
        info!(
            head = %client.controller.head_commitment()?.short(),
            "stream resumed from store"
        );
        Ok(client)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Lifecycle operations
    // ───────────────────────────────────────────────────────────────────────

    /// Create the stream and deposit its origin note, returning once the
    /// deposit is confirmed. On `ConfirmationTimeout` the stream stays
    /// active locally and [`deposit_origin`](Self::deposit_origin) retries
    /// the deposit.
    pub async fn setup_stream(&mut self, amount: u64, duration_slots: u64) -> Result<Note> {
        self.ensure_live()?;
        self.ensure_idle()?;
        let current_slot = self.store.current_slot().await?;
        self.controller
            .setup(amount, duration_slots, current_slot, self.config.owner)?;
        self.deposit_origin().await
    }

    /// Idempotent origin deposit: submits the origin note if the store has
    /// never seen it, then polls until it is `ready`. Safe to call again
    /// after a timeout; a commitment already on the ledger is not
    /// re-broadcast.
    pub async fn deposit_origin(&mut self) -> Result<Note> {
        self.ensure_live()?;
        let origin = self
            .controller
            .origin()
            .cloned()
            .ok_or(StreamError::NotInitialized)?;
        let commitment = origin.commitment();
        let status = self.store.status_of(commitment).await?;
        let status = self.observe(commitment, status)?;
        match status {
            // Already confirmed; nothing to broadcast or wait for.
            NoteStatus::Ready | NoteStatus::Spent => return Ok(origin),
            // Broadcast earlier; fall through to polling.
            NoteStatus::Pending => {}
            NoteStatus::Unknown => {
                let witness = build_deposit_witness(std::slice::from_ref(&origin));
                let proof = self.prover.prove(None, &witness).await?;
                let outputs = [origin.clone()];
                let transaction = self.executor.submit(&[], &outputs, &proof).await?;
                info!(
                    %transaction,
                    origin = %commitment.short(),
                    "origin deposit submitted"
                );
            }
        }
        self.await_deposit(commitment).await?;
        Ok(origin)
    }

    /// One full collection: stamp the transition with the ledger's current
    /// slot, prove, submit, poll to confirmation, and advance the head.
    ///
    /// A `ConfirmationTimeout` keeps the submitted transition as pending;
    /// resolve it with [`resolve_pending`](Self::resolve_pending). Failures
    /// before submission leave no trace.
    pub async fn collect_once(&mut self, action: CollectAction) -> Result<CollectOutcome> {
        self.ensure_live()?;
        self.ensure_idle()?;
        let current_slot = self.store.current_slot().await?;
        let request = self.controller.collect(current_slot, action)?;
        let witness = build_stream_witness(&request, self.config.predicate)?;
        let proof = self.prover.prove(Some(self.config.predicate), &witness).await?;
        let inputs = [request.input().clone()];
        let outputs = request.outputs();
        let transaction = self.executor.submit(&inputs, &outputs, &proof).await?;
        info!(
            %transaction,
            input = %request.input().commitment().short(),
            terminal = request.is_terminal(),
            "collection submitted"
        );
        self.pending = Some(PendingCollect {
            request: request.clone(),
            transaction: transaction.clone(),
        });
        self.confirm_and_advance(request, transaction).await
    }

    /// Resume confirmation of an earlier submitted collection. `Ok(None)`
    /// when nothing is pending.
    pub async fn resolve_pending(&mut self) -> Result<Option<CollectOutcome>> {
        self.ensure_live()?;
        let (request, transaction) = match &self.pending {
            Some(pending) => (pending.request.clone(), pending.transaction.clone()),
            None => return Ok(None),
        };
        let outcome = self.confirm_and_advance(request, transaction).await?;
        Ok(Some(outcome))
    }

    /// Re-derive the confirmed balance for the configured owner/predicate,
    /// feeding every observed status through the legality tracker.
    pub async fn sync_balance(&mut self) -> Result<ProgramUtxoBalance> {
        self.ensure_live()?;
        let balance = self
            .store
            .sync(self.config.owner, self.config.predicate)
            .await?;
        self.observe_balance(&balance)?;
        Ok(balance)
    }

    // ───────────────────────────────────────────────────────────────────────
    // Read access
    // ───────────────────────────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn controller(&self) -> &StreamController {
        &self.controller
    }

    /// Commitment of the current head note.
    pub fn head_commitment(&self) -> Result<Commitment> {
        Ok(self.controller.head_commitment()?)
    }

    /// Whether a submitted collection is still awaiting confirmation.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a fatal sync inconsistency has poisoned this client.
    pub fn is_abandoned(&self) -> bool {
        self.poisoned
    }

    // ───────────────────────────────────────────────────────────────────────
    // Internals
    // ───────────────────────────────────────────────────────────────────────

    fn ensure_live(&self) -> Result<()> {
        if self.poisoned {
            return Err(ClientError::Abandoned);
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.pending.is_some() {
            return Err(ClientError::TransitionInFlight);
        }
        Ok(())
    }

    /// Route one observation through the tracker, poisoning the client on a
    /// fatal fault.
    fn observe(&mut self, commitment: Commitment, status: NoteStatus) -> Result<NoteStatus> {
        match self.tracker.observe(commitment, status) {
            Ok(status) => Ok(status),
            Err(err) => {
                if err.is_fatal() {
                    self.poisoned = true;
                }
                Err(err)
            }
        }
    }

    fn observe_balance(&mut self, balance: &ProgramUtxoBalance) -> Result<()> {
        for record in balance.records() {
            self.observe(record.note.commitment(), record.status)?;
        }
        Ok(())
    }

    async fn confirm_and_advance(
        &mut self,
        request: TransitionRequest,
        transaction: TransactionId,
    ) -> Result<CollectOutcome> {
        self.await_confirmation(&request).await?;
        let advance = self.controller.advance(&request)?;
        self.pending = None;

        let payout = match request.kind() {
            TransitionKind::Terminal { payout } => payout.as_ref().map(Note::commitment),
            TransitionKind::Partial { .. } => None,
        };
        let (new_head, closed) = match advance {
            AdvanceOutcome::Continued { new_head } => (Some(new_head), false),
            AdvanceOutcome::Closed => (None, true),
        };
        let outcome = CollectOutcome {
            transaction,
            consumed: request.input().commitment(),
            new_head,
            payout,
            collected: request.collected(),
            closed,
        };
        info!(
            transaction = %outcome.transaction,
            collected = outcome.collected,
            closed = outcome.closed,
            "collection confirmed"
        );
        Ok(outcome)
    }

    /// Poll the store until the request's input is `spent` and every output
    /// is `ready`. The store, not this client, decides when that happens.
    async fn await_confirmation(&mut self, request: &TransitionRequest) -> Result<()> {
        let policy = self.config.confirmation.clone();
        let input = request.input().commitment();
        let outputs: Vec<Commitment> = request.outputs().iter().map(Note::commitment).collect();

        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(policy.poll_interval()).await;
            }
            let balance = self
                .store
                .sync(self.config.owner, self.config.predicate)
                .await?;
            self.observe_balance(&balance)?;

            let status = self.store.status_of(input).await?;
            let input_status = self.observe(input, status)?;
            let mut outputs_ready = true;
            for commitment in &outputs {
                let status = self.store.status_of(*commitment).await?;
                let status = self.observe(*commitment, status)?;
                outputs_ready &= status == NoteStatus::Ready;
            }
            if input_status == NoteStatus::Spent && outputs_ready {
                debug!(attempt, input = %input.short(), "transition confirmed");
                return Ok(());
            }
            debug!(attempt, input_status = %input_status, "transition not confirmed yet");
        }
        warn!(
            attempts = policy.max_attempts,
            input = %input.short(),
            "confirmation poll budget exhausted"
        );
        Err(ClientError::ConfirmationTimeout {
            attempts: policy.max_attempts,
        })
    }

    async fn await_deposit(&mut self, commitment: Commitment) -> Result<()> {
        let policy = self.config.confirmation.clone();
        for attempt in 0..policy.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(policy.poll_interval()).await;
            }
            let balance = self
                .store
                .sync(self.config.owner, self.config.predicate)
                .await?;
            self.observe_balance(&balance)?;
            let status = self.store.status_of(commitment).await?;
            if self.observe(commitment, status)?.is_spendable() {
                debug!(attempt, origin = %commitment.short(), "origin deposit confirmed");
                return Ok(());
            }
            debug!(attempt, %status, "origin deposit not confirmed yet");
        }
        warn!(
            attempts = policy.max_attempts,
            origin = %commitment.short(),
            "deposit confirmation budget exhausted"
        );
        Err(ClientError::ConfirmationTimeout {
            attempts: policy.max_attempts,
        })
    }
}
