use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use bond_desk::coordinator::WalletSession;
use bond_desk::form::OperationForm;
use bond_desk::plugin::DeskBackend;
use bond_desk::rpc::RpcClient;
use bond_desk::runner::{OrderBook, OrderRunnerPlugin};
use bond_desk::session::{FixedSession, KeychainSession};
use bond_desk::{BondDeskPlugin, DeskSettings};

const USAGE: &str = "usage: bond-desk <orders.json> [settings.json]\n       bond-desk import-wallet [settings.json] < phrase.txt";

fn main() -> AppExit {
    let mut args = std::env::args().skip(1);
    let Some(orders_path) = args.next() else {
        eprintln!("{}", USAGE);
        return AppExit::error();
    };

    let settings = match args.next() {
        Some(path) => DeskSettings::load(&path),
        None => Ok(DeskSettings::default()),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("❌ {}", e);
            return AppExit::error();
        }
    };

    if orders_path == "import-wallet" {
        return import_wallet(&settings);
    }

    let orders: Vec<OperationForm> = match std::fs::read_to_string(&orders_path)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(orders) => orders,
        Err(e) => {
            eprintln!("❌ Failed to read orders from {}: {}", orders_path, e);
            return AppExit::error();
        }
    };

    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_millis(50))),
        LogPlugin::default(),
    ));

    let session: Arc<dyn WalletSession> = match settings.from_account() {
        Ok(Some(account)) => {
            info!("Using node-managed account {}", account);
            Arc::new(FixedSession(Some(account)))
        }
        _ => {
            let session = KeychainSession::from_settings(&settings);
            if let Err(e) = session.connect() {
                warn!("No wallet connected: {}", e);
            }
            Arc::new(session)
        }
    };

    let client = match RpcClient::new(&settings) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("❌ {}", e);
            return AppExit::error();
        }
    };
    info!("🔗 Using JSON-RPC endpoint {}", client.rpc_url());
    let backend = DeskBackend {
        provider: client.clone(),
        watcher: client,
    };

    let plugin = match BondDeskPlugin::new(settings, session, backend) {
        Ok(plugin) => plugin,
        Err(e) => {
            error!("❌ {}", e);
            return AppExit::error();
        }
    };

    app.add_plugins(plugin)
        .add_plugins(OrderRunnerPlugin)
        .insert_resource(OrderBook::new(orders))
        .run()
}

/// Store a mnemonic read from stdin in the OS keychain.
fn import_wallet(settings: &DeskSettings) -> AppExit {
    let mut phrase = String::new();
    if let Err(e) = std::io::stdin().read_line(&mut phrase) {
        eprintln!("❌ Failed to read mnemonic: {}", e);
        return AppExit::error();
    }

    let session = KeychainSession::from_settings(settings);
    match session.import_mnemonic(&phrase) {
        Ok(account) => {
            println!("✅ Wallet {} stored in keychain service {}", account, settings.keychain_service);
            AppExit::Success
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            AppExit::error()
        }
    }
}
