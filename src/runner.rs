//! Batch runner: feeds a list of orders through the desk one slot at a time.
//!
//! Each kind gets its own queue. An order is sent when its slot is idle, the
//! slot is reset once the order settles, and the app exits after the last
//! one with success only if every order succeeded.

use bevy::log::{error, info};
use bevy::prelude::*;
use std::collections::VecDeque;

use crate::call::OperationKind;
use crate::coordinator::NoticeLevel;
use crate::form::OperationForm;
use crate::plugin::{DeskNotice, DeskStatus, DeskSystems, FormRejected, ResetOperation, SubmitOperation};
use crate::status::Phase;

/// Orders waiting for their slot, plus which slots we are waiting on.
#[derive(Resource, Debug, Default)]
pub struct OrderBook {
    queued: [VecDeque<OperationForm>; 3],
    outstanding: [bool; 3],
    succeeded: usize,
    failed: usize,
}

impl OrderBook {
    pub fn new(orders: Vec<OperationForm>) -> Self {
        let mut book = Self::default();
        for order in orders {
            book.queued[order.kind().index()].push_back(order);
        }
        book
    }

    pub fn is_finished(&self) -> bool {
        self.queued.iter().all(|q| q.is_empty()) && self.outstanding.iter().all(|o| !o)
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn exit_code(&self) -> AppExit {
        if self.failed == 0 { AppExit::Success } else { AppExit::error() }
    }
}

/// Runs after [`DeskSystems`]; needs [`crate::BondDeskPlugin`] and an [`OrderBook`].
pub struct OrderRunnerPlugin;

impl Plugin for OrderRunnerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, (track_results, dispatch_orders).chain().after(DeskSystems));
    }
}

fn track_results(
    mut book: ResMut<OrderBook>,
    status: Res<DeskStatus>,
    mut rejected: EventReader<FormRejected>,
    mut notices: EventReader<DeskNotice>,
    mut resets: EventWriter<ResetOperation>,
) {
    for FormRejected { kind, errors } in rejected.read() {
        error!("❌ {} order skipped: {}", kind, errors);
        book.outstanding[kind.index()] = false;
        book.failed += 1;
    }

    for DeskNotice(notice) in notices.read() {
        // An error while the slot is still idle means the order never left
        let index = notice.kind.index();
        if notice.level == NoticeLevel::Error && book.outstanding[index] && status.get(notice.kind).phase == Phase::Idle {
            book.outstanding[index] = false;
            book.failed += 1;
        }
    }

    for kind in OperationKind::ALL {
        let slot = status.get(kind);
        if !book.outstanding[kind.index()] || !slot.is_terminal {
            continue;
        }
        match slot.phase {
            Phase::Succeeded => book.succeeded += 1,
            _ => book.failed += 1,
        }
        info!("{}: {} {}", kind, slot.label, slot.handle.as_deref().unwrap_or(""));
        book.outstanding[kind.index()] = false;
        resets.send(ResetOperation(kind));
    }
}

fn dispatch_orders(
    mut book: ResMut<OrderBook>,
    status: Res<DeskStatus>,
    mut submits: EventWriter<SubmitOperation>,
    mut exit: EventWriter<AppExit>,
) {
    if book.is_finished() {
        info!("Done: {} succeeded, {} failed", book.succeeded, book.failed);
        exit.send(book.exit_code());
        return;
    }

    for kind in OperationKind::ALL {
        let index = kind.index();
        if book.outstanding[index] || status.get(kind).phase != Phase::Idle {
            continue;
        }
        if let Some(order) = book.queued[index].pop_front() {
            book.outstanding[index] = true;
            submits.send(SubmitOperation(order));
        }
    }
}
