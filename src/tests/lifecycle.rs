//! Transaction lifecycle tests: submission guards, settlement, timeouts,
//! resets and the status projection of each state.

use super::test_utils::*;
use crate::call::OperationKind;
use crate::coordinator::{
    FailureReason, LifecycleState, NOT_CONNECTED_MESSAGE, NoticeLevel, PendingSubmission, SettlementOutcome,
};
use crate::error::{CoordinatorError, ProviderError};
use crate::status::{self, Phase};
use std::time::{Duration, Instant};

#[cfg(test)]
mod submission_tests {
    use super::*;

    #[test]
    fn test_successful_submission_moves_to_confirming() {
        let (mut coordinator, sink) = connected_coordinator();
        let provider = ScriptedProvider::with_script(vec![Ok(handle(1))]);

        let result = coordinator.submit(OperationKind::Purchase, sample_call(OperationKind::Purchase), &provider);

        assert_eq!(result, Ok(handle(1)));
        assert!(matches!(
            coordinator.state(OperationKind::Purchase),
            LifecycleState::Confirming { handle: h, .. } if *h == handle(1)
        ));
        assert!(coordinator.is_confirming(&handle(1)));

        let notice = sink.last().unwrap();
        assert_eq!(notice.kind, OperationKind::Purchase);
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "Bond purchase transaction submitted!");

        let sent = provider.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, account(TestVectors::WALLET));
        assert_eq!(sent[0].1.value.to_string(), "10000000000000000000");
    }

    #[test]
    fn test_not_connected_is_refused_before_the_provider() {
        let (mut coordinator, sink) = disconnected_coordinator();
        let provider = ScriptedProvider::default();

        let result = coordinator.submit(OperationKind::Issue, sample_call(OperationKind::Issue), &provider);

        assert_eq!(result, Err(CoordinatorError::NotConnected));
        assert_eq!(coordinator.state(OperationKind::Issue), &LifecycleState::Idle);
        assert!(provider.sent().is_empty(), "provider must not be called");
        assert_eq!(sink.last().unwrap().message, NOT_CONNECTED_MESSAGE);
    }

    #[test]
    fn test_double_submit_is_refused_while_submitting() {
        let (mut coordinator, sink) = connected_coordinator();

        let pending = coordinator
            .begin_submit(OperationKind::Trade, sample_call(OperationKind::Trade))
            .unwrap();
        let second = coordinator.begin_submit(OperationKind::Trade, sample_call(OperationKind::Trade));

        assert_eq!(second.unwrap_err(), CoordinatorError::AlreadyInFlight(OperationKind::Trade));
        assert_eq!(
            coordinator.state(OperationKind::Trade),
            &LifecycleState::Submitting { attempt: pending.attempt }
        );
        assert_eq!(sink.last().unwrap().level, NoticeLevel::Error);
    }

    #[test]
    fn test_submit_is_refused_while_confirming() {
        let (mut coordinator, _sink) = connected_coordinator();
        let provider = ScriptedProvider::default();

        coordinator
            .submit(OperationKind::Issue, sample_call(OperationKind::Issue), &provider)
            .unwrap();
        let again = coordinator.submit(OperationKind::Issue, sample_call(OperationKind::Issue), &provider);

        assert_eq!(again, Err(CoordinatorError::AlreadyInFlight(OperationKind::Issue)));
        assert_eq!(provider.sent().len(), 1);
    }

    #[test]
    fn test_provider_rejection_fails_the_slot() {
        let (mut coordinator, sink) = connected_coordinator();
        let provider = ScriptedProvider::with_script(vec![Err(ProviderError::UserRejected)]);

        let result = coordinator.submit(OperationKind::Purchase, sample_call(OperationKind::Purchase), &provider);

        assert!(matches!(result, Err(CoordinatorError::SubmissionRejected(_))));
        assert_eq!(
            coordinator.state(OperationKind::Purchase),
            &LifecycleState::Failed {
                handle: None,
                reason: FailureReason::SubmissionRejected("User rejected the request".to_string()),
            }
        );
        let notice = sink.last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Failed to purchase bond: User rejected the request");
    }

    #[test]
    fn test_slots_are_independent() {
        let (mut coordinator, _sink) = connected_coordinator();
        let provider = ScriptedProvider::default();

        coordinator
            .submit(OperationKind::Issue, sample_call(OperationKind::Issue), &provider)
            .unwrap();
        coordinator
            .begin_submit(OperationKind::Purchase, sample_call(OperationKind::Purchase))
            .unwrap();

        assert!(matches!(coordinator.state(OperationKind::Issue), LifecycleState::Confirming { .. }));
        assert!(matches!(coordinator.state(OperationKind::Purchase), LifecycleState::Submitting { .. }));
        assert_eq!(coordinator.state(OperationKind::Trade), &LifecycleState::Idle);
    }

    #[test]
    fn test_handle_already_confirming_elsewhere_is_refused() {
        let (mut coordinator, sink) = connected_coordinator();
        let provider = ScriptedProvider::with_script(vec![Ok(handle(1)), Ok(handle(1))]);

        coordinator
            .submit(OperationKind::Issue, sample_call(OperationKind::Issue), &provider)
            .unwrap();
        let second = coordinator.submit(OperationKind::Purchase, sample_call(OperationKind::Purchase), &provider);

        assert!(matches!(second, Err(CoordinatorError::SubmissionRejected(_))));
        assert!(matches!(
            coordinator.state(OperationKind::Purchase),
            LifecycleState::Failed {
                handle: None,
                reason: FailureReason::SubmissionRejected(_),
            }
        ));
        assert_eq!(sink.last().unwrap().level, NoticeLevel::Error);

        // Settlement reaches the slot that owns the handle, and nothing is left confirming
        assert_eq!(
            coordinator.on_handle_settled(&handle(1), SettlementOutcome::Success),
            Some(OperationKind::Issue)
        );
        assert!(!coordinator.is_confirming(&handle(1)));
        assert!(coordinator.slots().iter().all(|slot| !slot.state().is_busy()));
    }

    #[test]
    fn test_stale_result_is_dropped() {
        let (mut coordinator, _sink) = connected_coordinator();
        let pending = coordinator
            .begin_submit(OperationKind::Issue, sample_call(OperationKind::Issue))
            .unwrap();

        let stale = PendingSubmission {
            attempt: pending.attempt + 1,
            ..pending.clone()
        };
        assert!(coordinator.finish_submit(&stale, Ok(handle(9))).is_err());
        assert_eq!(
            coordinator.state(OperationKind::Issue),
            &LifecycleState::Submitting { attempt: pending.attempt }
        );

        assert_eq!(coordinator.finish_submit(&pending, Ok(handle(9))), Ok(handle(9)));
    }
}

#[cfg(test)]
mod settlement_tests {
    use super::*;

    #[test]
    fn test_success_settlement() {
        let (mut coordinator, sink) = connected_coordinator();
        let provider = ScriptedProvider::with_script(vec![Ok(handle(1))]);
        coordinator
            .submit(OperationKind::Issue, sample_call(OperationKind::Issue), &provider)
            .unwrap();

        let settled = coordinator.on_handle_settled(&handle(1), SettlementOutcome::Success);

        assert_eq!(settled, Some(OperationKind::Issue));
        assert_eq!(coordinator.state(OperationKind::Issue), &LifecycleState::Succeeded { handle: handle(1) });
        assert_eq!(sink.last().unwrap().message, "Bond issuance confirmed");
    }

    #[test]
    fn test_failure_settlement_then_repeat_is_ignored() {
        let (mut coordinator, sink) = connected_coordinator();
        let provider = ScriptedProvider::with_script(vec![Ok(handle(2))]);
        coordinator
            .submit(OperationKind::Trade, sample_call(OperationKind::Trade), &provider)
            .unwrap();

        let first = coordinator.on_handle_settled(&handle(2), SettlementOutcome::Failure("reverted".to_string()));
        let failed = coordinator.state(OperationKind::Trade).clone();
        let notices_after_first = sink.notices().len();

        let second = coordinator.on_handle_settled(&handle(2), SettlementOutcome::Success);

        assert_eq!(first, Some(OperationKind::Trade));
        assert_eq!(second, None);
        assert_eq!(coordinator.state(OperationKind::Trade), &failed);
        assert_eq!(sink.notices().len(), notices_after_first, "no notice for an ignored settlement");
        assert_eq!(
            failed,
            LifecycleState::Failed {
                handle: Some(handle(2)),
                reason: FailureReason::Reverted("reverted".to_string()),
            }
        );
    }

    #[test]
    fn test_unknown_handle_is_ignored() {
        let (mut coordinator, _sink) = connected_coordinator();
        let provider = ScriptedProvider::with_script(vec![Ok(handle(1))]);
        coordinator
            .submit(OperationKind::Purchase, sample_call(OperationKind::Purchase), &provider)
            .unwrap();

        assert_eq!(coordinator.on_handle_settled(&handle(7), SettlementOutcome::Success), None);
        assert!(matches!(coordinator.state(OperationKind::Purchase), LifecycleState::Confirming { .. }));
    }

    #[test]
    fn test_overdue_confirmation_times_out() {
        let (mut coordinator, sink) = connected_coordinator();
        let provider = ScriptedProvider::with_script(vec![Ok(handle(3))]);
        coordinator
            .submit(OperationKind::Purchase, sample_call(OperationKind::Purchase), &provider)
            .unwrap();
        let timeout = Duration::from_secs(300);

        assert!(coordinator.expire_overdue(Instant::now(), timeout).is_empty());

        let expired = coordinator.expire_overdue(Instant::now() + Duration::from_secs(301), timeout);
        assert_eq!(expired, vec![OperationKind::Purchase]);
        assert_eq!(
            coordinator.state(OperationKind::Purchase),
            &LifecycleState::Failed {
                handle: Some(handle(3)),
                reason: FailureReason::TimedOut,
            }
        );
        assert_eq!(sink.last().unwrap().message, "Bond purchase timed out");

        // A late receipt no longer matches anything
        assert_eq!(coordinator.on_handle_settled(&handle(3), SettlementOutcome::Success), None);
    }
}

#[cfg(test)]
mod reset_tests {
    use super::*;

    #[test]
    fn test_reset_while_busy_is_refused() {
        let (mut coordinator, _sink) = connected_coordinator();
        let provider = ScriptedProvider::default();
        coordinator
            .submit(OperationKind::Issue, sample_call(OperationKind::Issue), &provider)
            .unwrap();
        let before = coordinator.state(OperationKind::Issue).clone();

        assert_eq!(
            coordinator.reset(OperationKind::Issue),
            Err(CoordinatorError::InvalidReset(OperationKind::Issue))
        );
        assert_eq!(coordinator.state(OperationKind::Issue), &before);
    }

    #[test]
    fn test_reset_from_idle_is_refused() {
        let (mut coordinator, _sink) = connected_coordinator();
        assert!(coordinator.reset(OperationKind::Trade).is_err());
    }

    #[test]
    fn test_reset_and_resubmit_after_terminal() {
        let (mut coordinator, _sink) = connected_coordinator();
        let provider = ScriptedProvider::with_script(vec![Err(ProviderError::Network("down".to_string())), Ok(handle(4))]);

        assert!(coordinator
            .submit(OperationKind::Purchase, sample_call(OperationKind::Purchase), &provider)
            .is_err());

        // Terminal slots accept a new submission directly
        assert_eq!(
            coordinator.submit(OperationKind::Purchase, sample_call(OperationKind::Purchase), &provider),
            Ok(handle(4))
        );
        coordinator.on_handle_settled(&handle(4), SettlementOutcome::Success);

        assert_eq!(coordinator.reset(OperationKind::Purchase), Ok(()));
        assert_eq!(coordinator.state(OperationKind::Purchase), &LifecycleState::Idle);
    }
}

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn test_idle_labels() {
        let labels: Vec<&str> = OperationKind::ALL
            .iter()
            .map(|kind| status::present_state(*kind, &LifecycleState::Idle).label)
            .collect();
        assert_eq!(labels, vec!["Issue Bond", "Purchase Bond", "Execute Trade"]);
    }

    #[test]
    fn test_busy_labels() {
        let submitting = status::present_state(OperationKind::Trade, &LifecycleState::Submitting { attempt: 1 });
        assert_eq!(submitting.label, "Executing Trade...");
        assert!(submitting.is_busy);
        assert_eq!(submitting.handle, None);

        let confirming = status::present_state(
            OperationKind::Issue,
            &LifecycleState::Confirming {
                handle: handle(1),
                since: Instant::now(),
            },
        );
        assert_eq!(confirming.phase, Phase::Confirming);
        assert_eq!(confirming.label, "Confirming...");
        assert_eq!(confirming.handle, Some(handle(1).0));
    }

    #[test]
    fn test_terminal_labels() {
        let succeeded = status::present_state(OperationKind::Purchase, &LifecycleState::Succeeded { handle: handle(2) });
        assert_eq!(succeeded.label, "Bond Purchased");
        assert!(succeeded.is_terminal);
        assert!(!succeeded.is_busy);
        assert_eq!(succeeded.detail, None);

        let failed = status::present_state(
            OperationKind::Issue,
            &LifecycleState::Failed {
                handle: None,
                reason: FailureReason::TimedOut,
            },
        );
        assert_eq!(failed.label, "Issue Failed");
        assert_eq!(failed.detail.as_deref(), Some("timed out waiting for confirmation"));
    }

    #[test]
    fn test_present_follows_the_coordinator() {
        let (mut coordinator, _sink) = connected_coordinator();
        coordinator
            .begin_submit(OperationKind::Purchase, sample_call(OperationKind::Purchase))
            .unwrap();

        let slot = status::present(coordinator.slot(OperationKind::Purchase));
        assert_eq!(slot.kind, OperationKind::Purchase);
        assert_eq!(slot.label, "Purchasing...");
    }
}
