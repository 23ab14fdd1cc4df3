//! Bevy integration: the coordinator as an ECS resource driven by events.
//!
//! Provider calls run on the IO task pool and are polled once per frame,
//! so every state transition still happens on the schedule's thread.

use bevy::log::{debug, error, info, warn};
use bevy::prelude::*;
use bevy::tasks::{IoTaskPool, Task, TaskPool, block_on, poll_once};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::call::{CallBuilder, OperationKind};
use crate::config::DeskSettings;
use crate::coordinator::{
    LifecycleState, Notice, NoticeLevel, NotificationSink, PendingSubmission, ReceiptWatcher, SettlementOutcome,
    SubmissionProvider, TransactionCoordinator, TxHandle, WalletSession,
};
use crate::error::{ConfigError, PrepareError, ProviderError, ValidationErrors};
use crate::form::OperationForm;
use crate::status::{SlotStatus, present, present_state};

// Events

/// A filled-in form the user wants to send.
#[derive(Event, Debug, Clone)]
pub struct SubmitOperation(pub OperationForm);

#[derive(Event, Debug, Clone, Copy)]
pub struct ResetOperation(pub OperationKind);

/// Settlement of a submitted transaction, from the receipt poller or any
/// other watcher.
#[derive(Event, Debug, Clone)]
pub struct HandleSettled {
    pub handle: TxHandle,
    pub outcome: SettlementOutcome,
}

/// Inline validation failure; the coordinator never saw the form.
#[derive(Event, Debug, Clone)]
pub struct FormRejected {
    pub kind: OperationKind,
    pub errors: ValidationErrors,
}

#[derive(Event, Debug, Clone)]
pub struct DeskNotice(pub Notice);

// Resources

#[derive(Resource)]
pub struct Desk {
    pub coordinator: TransactionCoordinator,
    pub builder: CallBuilder,
}

#[derive(Resource, Clone)]
pub struct DeskBackend {
    pub provider: Arc<dyn SubmissionProvider>,
    pub watcher: Arc<dyn ReceiptWatcher>,
}

/// Notices raised by the coordinator, drained into [`DeskNotice`] events.
#[derive(Resource, Clone, Default)]
pub struct NoticeQueue(Arc<Mutex<VecDeque<Notice>>>);

impl NoticeQueue {
    pub fn push(&self, notice: Notice) {
        match self.0.lock() {
            Ok(mut queue) => queue.push_back(notice),
            Err(poisoned) => poisoned.into_inner().push_back(notice),
        }
    }

    fn drain(&self) -> Vec<Notice> {
        match self.0.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

impl NotificationSink for NoticeQueue {
    fn notify(&self, notice: &Notice) {
        self.push(notice.clone());
    }
}

/// Latest projection of every slot, in `OperationKind::ALL` order.
#[derive(Resource, Debug, Clone)]
pub struct DeskStatus {
    slots: Vec<SlotStatus>,
}

impl Default for DeskStatus {
    fn default() -> Self {
        Self {
            slots: OperationKind::ALL
                .iter()
                .map(|kind| present_state(*kind, &LifecycleState::Idle))
                .collect(),
        }
    }
}

impl DeskStatus {
    pub fn get(&self, kind: OperationKind) -> &SlotStatus {
        &self.slots[kind.index()]
    }

    pub fn all(&self) -> &[SlotStatus] {
        &self.slots
    }
}

struct ReceiptWatch {
    handle: TxHandle,
    last_poll: Option<Instant>,
    task: Option<Task<Result<Option<SettlementOutcome>, ProviderError>>>,
}

#[derive(Resource, Default)]
struct DeskTasks {
    submissions: Vec<(PendingSubmission, Task<Result<TxHandle, ProviderError>>)>,
    receipts: Vec<ReceiptWatch>,
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeskSystems;

// Plugin

pub struct BondDeskPlugin {
    settings: DeskSettings,
    builder: CallBuilder,
    session: Arc<dyn WalletSession>,
    backend: DeskBackend,
}

impl BondDeskPlugin {
    pub fn new(settings: DeskSettings, session: Arc<dyn WalletSession>, backend: DeskBackend) -> Result<Self, ConfigError> {
        settings.validate()?;
        let builder = CallBuilder::new(settings.contract()?, settings.amount_decimals)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            settings,
            builder,
            session,
            backend,
        })
    }
}

impl Plugin for BondDeskPlugin {
    fn build(&self, app: &mut App) {
        let notices = NoticeQueue::default();
        let coordinator = TransactionCoordinator::new(self.session.clone(), Arc::new(notices.clone()));

        app.insert_resource(self.settings.clone())
            .insert_resource(Desk {
                coordinator,
                builder: self.builder.clone(),
            })
            .insert_resource(self.backend.clone())
            .insert_resource(notices)
            .init_resource::<DeskTasks>()
            .init_resource::<DeskStatus>()
            .add_event::<SubmitOperation>()
            .add_event::<ResetOperation>()
            .add_event::<HandleSettled>()
            .add_event::<FormRejected>()
            .add_event::<DeskNotice>()
            .add_systems(
                Update,
                (
                    handle_reset_requests,
                    handle_submit_requests,
                    poll_submission_tasks,
                    poll_receipts,
                    apply_settlements,
                    expire_overdue_system,
                    refresh_status,
                    forward_notices,
                )
                    .chain()
                    .in_set(DeskSystems),
            );
    }
}

// Systems

fn handle_reset_requests(mut requests: EventReader<ResetOperation>, mut desk: ResMut<Desk>) {
    for ResetOperation(kind) in requests.read() {
        if let Err(e) = desk.coordinator.reset(*kind) {
            warn!("{}", e);
        }
    }
}

fn handle_submit_requests(
    mut requests: EventReader<SubmitOperation>,
    mut desk: ResMut<Desk>,
    mut tasks: ResMut<DeskTasks>,
    mut rejected: EventWriter<FormRejected>,
    backend: Res<DeskBackend>,
    notices: Res<NoticeQueue>,
) {
    for SubmitOperation(form) in requests.read() {
        let kind = form.kind();

        let call = match desk.builder.prepare(form) {
            Ok(call) => call,
            Err(PrepareError::Invalid(errors)) => {
                info!("📝 {} form rejected: {}", kind, errors);
                rejected.send(FormRejected { kind, errors });
                continue;
            }
            Err(PrepareError::Build(e)) => {
                error!("❌ Could not build {} call: {}", kind, e);
                notices.push(Notice::error(kind, e.to_string()));
                continue;
            }
        };

        // Refusals are already reported through the notice queue
        let Ok(pending) = desk.coordinator.begin_submit(kind, call) else {
            continue;
        };

        let provider = backend.provider.clone();
        let from = pending.from;
        let call = pending.call.clone();
        let task = IoTaskPool::get_or_init(TaskPool::default).spawn(async move { provider.send(from, &call) });
        tasks.submissions.push((pending, task));
    }
}

fn poll_submission_tasks(mut tasks: ResMut<DeskTasks>, mut desk: ResMut<Desk>) {
    let mut finished = Vec::new();
    tasks.submissions.retain_mut(|(pending, task)| match block_on(poll_once(task)) {
        Some(result) => {
            finished.push((pending.clone(), result));
            false
        }
        None => true,
    });

    for (pending, result) in finished {
        if let Ok(handle) = desk.coordinator.finish_submit(&pending, result) {
            tasks.receipts.push(ReceiptWatch {
                handle,
                last_poll: None,
                task: None,
            });
        }
    }
}

fn poll_receipts(
    mut tasks: ResMut<DeskTasks>,
    mut settled: EventWriter<HandleSettled>,
    desk: Res<Desk>,
    backend: Res<DeskBackend>,
    settings: Res<DeskSettings>,
) {
    let interval = settings.receipt_poll_interval();
    let now = Instant::now();

    // Stop watching handles whose slot has already moved on (e.g. timed out)
    tasks.receipts.retain(|watch| desk.coordinator.is_confirming(&watch.handle));

    let mut done = Vec::new();
    for (index, watch) in tasks.receipts.iter_mut().enumerate() {
        if let Some(task) = watch.task.as_mut() {
            let Some(result) = block_on(poll_once(task)) else {
                continue;
            };
            watch.task = None;
            watch.last_poll = Some(now);

            match result {
                Ok(Some(outcome)) => {
                    settled.send(HandleSettled {
                        handle: watch.handle.clone(),
                        outcome,
                    });
                    done.push(index);
                }
                Ok(None) => debug!("Receipt for {} not available yet", watch.handle),
                Err(e) => warn!("Receipt lookup for {} failed: {}", watch.handle, e),
            }
            continue;
        }

        let due = watch.last_poll.is_none_or(|last| now.duration_since(last) >= interval);
        if due {
            let watcher = backend.watcher.clone();
            let handle = watch.handle.clone();
            watch.task = Some(IoTaskPool::get_or_init(TaskPool::default).spawn(async move { watcher.poll(&handle) }));
        }
    }

    for index in done.into_iter().rev() {
        tasks.receipts.swap_remove(index);
    }
}

fn apply_settlements(mut events: EventReader<HandleSettled>, mut desk: ResMut<Desk>) {
    for event in events.read() {
        desk.coordinator.on_handle_settled(&event.handle, event.outcome.clone());
    }
}

fn expire_overdue_system(mut desk: ResMut<Desk>, settings: Res<DeskSettings>) {
    desk.coordinator
        .expire_overdue(Instant::now(), settings.confirmation_timeout());
}

fn refresh_status(desk: Res<Desk>, mut status: ResMut<DeskStatus>) {
    let latest: Vec<SlotStatus> = desk.coordinator.slots().iter().map(present).collect();
    if status.slots != latest {
        status.slots = latest;
    }
}

fn forward_notices(queue: Res<NoticeQueue>, mut writer: EventWriter<DeskNotice>) {
    for notice in queue.drain() {
        match notice.level {
            NoticeLevel::Success => info!("🔔 [{}] {}", notice.kind, notice.message),
            NoticeLevel::Error => warn!("🔔 [{}] {}", notice.kind, notice.message),
        }
        writer.send(DeskNotice(notice));
    }
}
