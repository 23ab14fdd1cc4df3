//! Per-operation transaction lifecycle.
//!
//! Three slots (issue, purchase, trade) move independently through
//! `Idle -> Submitting -> Confirming -> Succeeded | Failed`. A slot accepts a
//! new submission only from `Idle` or a terminal state, and can only be reset
//! from a terminal state, so an in-flight transaction is never abandoned.
//!
//! Submission is two-phase ([`TransactionCoordinator::begin_submit`] and
//! [`TransactionCoordinator::finish_submit`]) so the provider call can run on
//! a background task while the slot shows `Submitting`.

use bevy::log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::address::AccountId;
use crate::call::{CallDescriptor, OperationKind};
use crate::error::{CoordinatorError, ProviderError};

// Consumed interfaces

/// Connected wallet, if any.
pub trait WalletSession: Send + Sync {
    fn current_address(&self) -> Option<AccountId>;

    fn is_connected(&self) -> bool {
        self.current_address().is_some()
    }
}

/// Hands a call to the wallet/node and returns its transaction handle.
/// Blocking; callers that must not block run it on a task.
pub trait SubmissionProvider: Send + Sync {
    fn send(&self, from: AccountId, call: &CallDescriptor) -> Result<TxHandle, ProviderError>;
}

/// Looks up whether a submitted transaction has settled yet.
pub trait ReceiptWatcher: Send + Sync {
    fn poll(&self, handle: &TxHandle) -> Result<Option<SettlementOutcome>, ProviderError>;
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: &Notice);
}

// Lifecycle types

/// Opaque reference to a submitted call (a transaction hash for JSON-RPC).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle(pub String);

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Success,
    /// Reason is passed through as-is; revert data is not decoded.
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    SubmissionRejected(String),
    Reverted(String),
    TimedOut,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SubmissionRejected(msg) => write!(f, "submission rejected: {}", msg),
            FailureReason::Reverted(msg) => write!(f, "reverted: {}", msg),
            FailureReason::TimedOut => write!(f, "timed out waiting for confirmation"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Submitting { attempt: u64 },
    Confirming { handle: TxHandle, since: Instant },
    Succeeded { handle: TxHandle },
    Failed { handle: Option<TxHandle>, reason: FailureReason },
}

impl LifecycleState {
    pub fn is_busy(&self) -> bool {
        matches!(self, LifecycleState::Submitting { .. } | LifecycleState::Confirming { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Succeeded { .. } | LifecycleState::Failed { .. })
    }

    /// The handle of the current attempt, if it produced one.
    pub fn handle(&self) -> Option<&TxHandle> {
        match self {
            LifecycleState::Confirming { handle, .. } | LifecycleState::Succeeded { handle } => Some(handle),
            LifecycleState::Failed { handle, .. } => handle.as_ref(),
            LifecycleState::Idle | LifecycleState::Submitting { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperationSlot {
    kind: OperationKind,
    state: LifecycleState,
}

impl OperationSlot {
    fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            state: LifecycleState::Idle,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }
}

/// Ticket for a submission between its two phases.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    pub kind: OperationKind,
    pub attempt: u64,
    pub from: AccountId,
    pub call: CallDescriptor,
}

// Notifications

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: OperationKind,
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(kind: OperationKind, message: String) -> Self {
        Self { kind, level: NoticeLevel::Success, message }
    }

    pub fn error(kind: OperationKind, message: String) -> Self {
        Self { kind, level: NoticeLevel::Error, message }
    }
}

fn submitted_message(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Issue => "Bond issuance transaction submitted!",
        OperationKind::Purchase => "Bond purchase transaction submitted!",
        OperationKind::Trade => "Trade execution transaction submitted!",
    }
}

fn rejected_message(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Issue => "Failed to issue bond",
        OperationKind::Purchase => "Failed to purchase bond",
        OperationKind::Trade => "Failed to execute trade",
    }
}

fn subject(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Issue => "Bond issuance",
        OperationKind::Purchase => "Bond purchase",
        OperationKind::Trade => "Trade execution",
    }
}

pub const NOT_CONNECTED_MESSAGE: &str = "Please connect your wallet first";

// Coordinator

pub struct TransactionCoordinator {
    slots: [OperationSlot; 3],
    session: Arc<dyn WalletSession>,
    notifier: Arc<dyn NotificationSink>,
    next_attempt: u64,
}

impl TransactionCoordinator {
    pub fn new(session: Arc<dyn WalletSession>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            slots: OperationKind::ALL.map(OperationSlot::new),
            session,
            notifier,
            next_attempt: 1,
        }
    }

    pub fn slot(&self, kind: OperationKind) -> &OperationSlot {
        &self.slots[kind.index()]
    }

    pub fn state(&self, kind: OperationKind) -> &LifecycleState {
        &self.slots[kind.index()].state
    }

    pub fn slots(&self) -> &[OperationSlot; 3] {
        &self.slots
    }

    pub fn is_confirming(&self, handle: &TxHandle) -> bool {
        self.slots
            .iter()
            .any(|slot| matches!(&slot.state, LifecycleState::Confirming { handle: h, .. } if h == handle))
    }

    /// Submit and wait for the provider's handle in one call.
    pub fn submit(
        &mut self,
        kind: OperationKind,
        call: CallDescriptor,
        provider: &dyn SubmissionProvider,
    ) -> Result<TxHandle, CoordinatorError> {
        let pending = self.begin_submit(kind, call)?;
        let result = provider.send(pending.from, &pending.call);
        self.finish_submit(&pending, result)
    }

    /// Phase one: claim the slot and move it to `Submitting`.
    pub fn begin_submit(&mut self, kind: OperationKind, call: CallDescriptor) -> Result<PendingSubmission, CoordinatorError> {
        let Some(from) = self.session.current_address() else {
            warn!("Refusing {} submission: no wallet connected", kind);
            self.notifier.notify(&Notice::error(kind, NOT_CONNECTED_MESSAGE.to_string()));
            return Err(CoordinatorError::NotConnected);
        };

        if self.state(kind).is_busy() {
            warn!("Refusing {} submission: slot already in flight", kind);
            let err = CoordinatorError::AlreadyInFlight(kind);
            self.notifier.notify(&Notice::error(kind, err.to_string()));
            return Err(err);
        }

        let attempt = self.next_attempt;
        self.next_attempt += 1;
        self.slots[kind.index()].state = LifecycleState::Submitting { attempt };
        info!("📤 {} attempt #{} submitting from {}", kind, attempt, from);

        Ok(PendingSubmission { kind, attempt, from, call })
    }

    /// Phase two: record the provider's answer for a pending submission.
    ///
    /// A handle that another slot is already confirming is refused; two slots
    /// can never wait on the same settlement.
    pub fn finish_submit(
        &mut self,
        pending: &PendingSubmission,
        result: Result<TxHandle, ProviderError>,
    ) -> Result<TxHandle, CoordinatorError> {
        let kind = pending.kind;

        match self.state(kind) {
            LifecycleState::Submitting { attempt } if *attempt == pending.attempt => {}
            _ => {
                // Reset is forbidden while Submitting, so this only happens on misuse.
                warn!("Dropping result of stale {} attempt #{}", kind, pending.attempt);
                return Err(CoordinatorError::SubmissionRejected("submission is no longer pending".to_string()));
            }
        }

        let result = match result {
            Ok(handle) if self.is_confirming(&handle) => {
                Err(format!("transaction handle {} is already being confirmed", handle))
            }
            Ok(handle) => Ok(handle),
            Err(e) => Err(e.to_string()),
        };

        let slot = &mut self.slots[kind.index()];
        match result {
            Ok(handle) => {
                slot.state = LifecycleState::Confirming {
                    handle: handle.clone(),
                    since: Instant::now(),
                };
                info!("⏳ {} submitted, confirming {}", kind, handle);
                self.notifier.notify(&Notice::success(kind, submitted_message(kind).to_string()));
                Ok(handle)
            }
            Err(reason) => {
                slot.state = LifecycleState::Failed {
                    handle: None,
                    reason: FailureReason::SubmissionRejected(reason.clone()),
                };
                warn!("❌ {} submission rejected: {}", kind, reason);
                self.notifier
                    .notify(&Notice::error(kind, format!("{}: {}", rejected_message(kind), reason)));
                Err(CoordinatorError::SubmissionRejected(reason))
            }
        }
    }

    /// Settle whichever slot is confirming `handle`. Returns the slot that
    /// changed, or `None` when no slot is waiting on that handle.
    pub fn on_handle_settled(&mut self, handle: &TxHandle, outcome: SettlementOutcome) -> Option<OperationKind> {
        let slot = self.slots.iter_mut().find(|slot| {
            matches!(&slot.state, LifecycleState::Confirming { handle: h, .. } if h == handle)
        });
        let Some(slot) = slot else {
            info!("Ignoring settlement for untracked handle {}", handle);
            return None;
        };
        let kind = slot.kind;

        match outcome {
            SettlementOutcome::Success => {
                slot.state = LifecycleState::Succeeded { handle: handle.clone() };
                info!("✅ {} confirmed: {}", kind, handle);
                self.notifier.notify(&Notice::success(kind, format!("{} confirmed", subject(kind))));
            }
            SettlementOutcome::Failure(reason) => {
                slot.state = LifecycleState::Failed {
                    handle: Some(handle.clone()),
                    reason: FailureReason::Reverted(reason.clone()),
                };
                warn!("❌ {} failed on-chain: {} ({})", kind, handle, reason);
                self.notifier
                    .notify(&Notice::error(kind, format!("{} failed on-chain: {}", subject(kind), reason)));
            }
        }
        Some(kind)
    }

    /// Fail every slot that has been confirming for longer than `timeout`.
    pub fn expire_overdue(&mut self, now: Instant, timeout: Duration) -> Vec<OperationKind> {
        let mut expired = Vec::new();

        for slot in self.slots.iter_mut() {
            let LifecycleState::Confirming { handle, since } = &slot.state else {
                continue;
            };
            if now.saturating_duration_since(*since) < timeout {
                continue;
            }

            let handle = handle.clone();
            warn!("⌛ {} timed out waiting for {}", slot.kind, handle);
            slot.state = LifecycleState::Failed {
                handle: Some(handle),
                reason: FailureReason::TimedOut,
            };
            self.notifier
                .notify(&Notice::error(slot.kind, format!("{} timed out", subject(slot.kind))));
            expired.push(slot.kind);
        }

        expired
    }

    pub fn reset(&mut self, kind: OperationKind) -> Result<(), CoordinatorError> {
        let slot = &mut self.slots[kind.index()];
        if !slot.state.is_terminal() {
            return Err(CoordinatorError::InvalidReset(kind));
        }
        slot.state = LifecycleState::Idle;
        info!("{} slot reset", kind);
        Ok(())
    }
}
