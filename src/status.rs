use serde::Serialize;

use crate::call::OperationKind;
use crate::coordinator::{LifecycleState, OperationSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Submitting,
    Confirming,
    Succeeded,
    Failed,
}

/// What the dashboard shows for one operation slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotStatus {
    pub kind: OperationKind,
    pub phase: Phase,
    pub label: &'static str,
    pub is_busy: bool,
    pub is_terminal: bool,
    pub handle: Option<String>,
    pub detail: Option<String>,
}

pub fn present(slot: &OperationSlot) -> SlotStatus {
    present_state(slot.kind(), slot.state())
}

pub fn present_state(kind: OperationKind, state: &LifecycleState) -> SlotStatus {
    let phase = match state {
        LifecycleState::Idle => Phase::Idle,
        LifecycleState::Submitting { .. } => Phase::Submitting,
        LifecycleState::Confirming { .. } => Phase::Confirming,
        LifecycleState::Succeeded { .. } => Phase::Succeeded,
        LifecycleState::Failed { .. } => Phase::Failed,
    };
    let detail = match state {
        LifecycleState::Failed { reason, .. } => Some(reason.to_string()),
        _ => None,
    };

    SlotStatus {
        kind,
        phase,
        label: label(kind, phase),
        is_busy: state.is_busy(),
        is_terminal: state.is_terminal(),
        handle: state.handle().map(|h| h.to_string()),
        detail,
    }
}

fn label(kind: OperationKind, phase: Phase) -> &'static str {
    match (kind, phase) {
        (OperationKind::Issue, Phase::Idle) => "Issue Bond",
        (OperationKind::Purchase, Phase::Idle) => "Purchase Bond",
        (OperationKind::Trade, Phase::Idle) => "Execute Trade",
        (OperationKind::Issue, Phase::Submitting) => "Issuing Bond...",
        (OperationKind::Purchase, Phase::Submitting) => "Purchasing...",
        (OperationKind::Trade, Phase::Submitting) => "Executing Trade...",
        (_, Phase::Confirming) => "Confirming...",
        (OperationKind::Issue, Phase::Succeeded) => "Bond Issued",
        (OperationKind::Purchase, Phase::Succeeded) => "Bond Purchased",
        (OperationKind::Trade, Phase::Succeeded) => "Trade Executed",
        (OperationKind::Issue, Phase::Failed) => "Issue Failed",
        (OperationKind::Purchase, Phase::Failed) => "Purchase Failed",
        (OperationKind::Trade, Phase::Failed) => "Trade Failed",
    }
}
