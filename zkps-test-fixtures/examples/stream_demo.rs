//! End-to-end stream walkthrough against the in-memory ledger.
//!
//! Run with `cargo run -p zkps-test-fixtures --example stream_demo`; set
//! `RUST_LOG=debug` to watch the confirmation polling.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zkps_client::NoteStore;
use zkps_stream::CollectAction;
use zkps_test_fixtures::{client_for, test_owner, MockLedger};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,zkps_client=debug,zkps_stream=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ledger = Arc::new(MockLedger::at_slot(0));
    let payer = test_owner("demo-payer");
    let payee = test_owner("demo-payee");
    let mut client = client_for(ledger.clone(), payer);

    // A 900M-unit stream vesting over three slots; the terminal transfer
    // must still cover the close fee.
    let origin = client.setup_stream(900_000_000, 3).await?;
    println!("origin deposited: {}", origin.commitment());

    for _ in 0..2 {
        ledger.advance_slots(1).await;
        let outcome = client.collect_once(CollectAction::Close).await?;
        println!(
            "slot {}: collected {} units, head is now {}",
            ledger.slot().await,
            outcome.collected,
            outcome.new_head.expect("stream continues")
        );
    }

    // Past the end slot; close into a payout note for the payee.
    ledger.advance_slots(1).await;
    let outcome = client
        .collect_once(CollectAction::Transfer { recipient: payee })
        .await?;
    let payout = outcome.payout.expect("transfer payout");
    let record = ledger.get(payout).await?;
    println!(
        "stream closed at slot {}: {} units paid out to {} ({})",
        ledger.slot().await,
        record.note.amount(),
        payout,
        record.status
    );
    Ok(())
}
