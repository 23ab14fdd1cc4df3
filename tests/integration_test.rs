//! End-to-end checks through the public API: form in, calldata out, lifecycle
//! driven by a stub provider, and the JSON-RPC client against a dead endpoint.

use std::sync::{Arc, Mutex};

use bond_desk::call::ContractFunction;
use bond_desk::coordinator::{
    Notice, NotificationSink, SettlementOutcome, SubmissionProvider, TxHandle,
};
use bond_desk::error::ProviderError;
use bond_desk::form::{IssuanceForm, OperationForm, TradeForm};
use bond_desk::rpc::RpcClient;
use bond_desk::session::FixedSession;
use bond_desk::status;
use bond_desk::{AccountId, CallBuilder, CallDescriptor, DeskSettings, LifecycleState, OperationKind, TransactionCoordinator};

const WALLET: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

struct EchoProvider;

impl SubmissionProvider for EchoProvider {
    fn send(&self, _from: AccountId, call: &CallDescriptor) -> Result<TxHandle, ProviderError> {
        // Derive a stable fake hash from the selector
        Ok(TxHandle(format!("0x{}{}", hex::encode(call.selector()), "0".repeat(56))))
    }
}

#[derive(Default)]
struct Inbox(Mutex<Vec<Notice>>);

impl NotificationSink for Inbox {
    fn notify(&self, notice: &Notice) {
        self.0.lock().unwrap().push(notice.clone());
    }
}

fn dead_endpoint_settings() -> DeskSettings {
    DeskSettings {
        // Discard port; nothing listens there
        rpc_url: "http://127.0.0.1:9".to_string(),
        max_retries: 0,
        request_timeout_secs: 5,
        ..DeskSettings::default()
    }
}

#[test]
fn test_purchase_order_end_to_end() {
    let settings = DeskSettings::default();
    let builder = CallBuilder::new(settings.contract().unwrap(), settings.amount_decimals).unwrap();

    let order: OperationForm = serde_json::from_str(
        r#"{"kind": "purchase", "bondId": "7", "quantity": "3", "price": "2.5"}"#,
    )
    .unwrap();
    let call = builder.prepare(&order).unwrap();
    assert_eq!(call.function(), ContractFunction::PurchaseBond);
    assert_eq!(call.value.to_string(), "7500000000000000000");

    let inbox = Arc::new(Inbox::default());
    let session = FixedSession(Some(WALLET.parse().unwrap()));
    let mut coordinator = TransactionCoordinator::new(Arc::new(session), inbox.clone());

    let handle = coordinator.submit(OperationKind::Purchase, call, &EchoProvider).unwrap();
    assert_eq!(status::present(coordinator.slot(OperationKind::Purchase)).label, "Confirming...");

    coordinator.on_handle_settled(&handle, SettlementOutcome::Success);
    let shown = status::present(coordinator.slot(OperationKind::Purchase));
    assert_eq!(shown.label, "Bond Purchased");
    assert_eq!(shown.handle, Some(handle.0.clone()));

    coordinator.reset(OperationKind::Purchase).unwrap();
    assert_eq!(coordinator.state(OperationKind::Purchase), &LifecycleState::Idle);

    let messages: Vec<String> = inbox.0.lock().unwrap().iter().map(|n| n.message.clone()).collect();
    assert_eq!(
        messages,
        vec!["Bond purchase transaction submitted!".to_string(), "Bond purchase confirmed".to_string()]
    );
}

#[test]
fn test_every_kind_builds_against_the_default_contract() {
    let settings = DeskSettings::default();
    let builder = CallBuilder::new(settings.contract().unwrap(), 18).unwrap();
    let seller = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    let trade = TradeForm {
        bond_id: "1".to_string(),
        quantity: "1".to_string(),
        price: "1".to_string(),
        seller: seller.to_string(),
    };
    let issue = IssuanceForm {
        name: "Corp24".to_string(),
        symbol: "CB24".to_string(),
        description: "test".to_string(),
        face_value: "1000".to_string(),
        coupon_rate: "5".to_string(),
        maturity_period: "365".to_string(),
        total_supply: "1000".to_string(),
    };
    let forms = [
        OperationForm::Issue(issue),
        OperationForm::Purchase(trade.clone()),
        OperationForm::Trade(trade),
    ];
    for form in forms {
        let call = builder.prepare(&form).unwrap();
        assert_eq!(call.kind, form.kind());
        assert_eq!(call.contract, settings.contract().unwrap());

        let calldata = call.calldata();
        assert_eq!(calldata[..4], call.function().selector());
        let expected_len = match call.kind {
            // seven head words plus a length word and one data word per short string
            OperationKind::Issue => 4 + 7 * 32 + 3 * 64,
            OperationKind::Purchase => 4 + 3 * 32,
            OperationKind::Trade => 4 + 4 * 32,
        };
        assert_eq!(calldata.len(), expected_len, "{} calldata", call.kind);
    }
}

#[test]
fn test_rpc_submission_against_dead_endpoint_is_a_network_error() {
    let client = RpcClient::new(&dead_endpoint_settings()).unwrap();
    let builder = CallBuilder::new(DeskSettings::default().contract().unwrap(), 18).unwrap();
    let call = builder
        .prepare(&OperationForm::Purchase(TradeForm {
            bond_id: "0".to_string(),
            quantity: "1".to_string(),
            price: "1".to_string(),
            seller: String::new(),
        }))
        .unwrap();

    let result = client.send(WALLET.parse().unwrap(), &call);
    assert!(matches!(result, Err(ProviderError::Network(_))), "got {:?}", result);
}

#[tokio::test]
async fn test_receipt_lookup_against_dead_endpoint_is_a_network_error() {
    let client = RpcClient::new(&dead_endpoint_settings()).unwrap();
    let handle = TxHandle(format!("0x{}", "ab".repeat(32)));

    let result = client.transaction_receipt(&handle).await;
    assert!(matches!(result, Err(ProviderError::Network(_))), "got {:?}", result.map(|r| r.is_some()));
}
