// demos/basic_run.rs
use anyhow::Result;
use stealth_console::{Console, PersonaMode, RecipientMode, RunConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Point this at a local dev node (anvil/hardhat) with funded keys.
    let rpc_lines = "http://127.0.0.1:8545,31337";
    let keys = "\
0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80
0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    let mut config = RunConfig::balanced();
    config.recipient_mode = RecipientMode::SelfInteract;
    config.persona_mode = PersonaMode::Random;
    config.min_delay_ms = 2_000;
    config.max_delay_ms = 6_000;
    config.rpc_switch_delay_ms = 0;
    config.wallet_switch_delay_ms = 0;

    let mut console = Console::new(config)?;
    let loaded = console.load_wallets(keys);
    println!("Loaded {} wallets", loaded);
    console.load_rpc_endpoints(rpc_lines);

    for report in console.test_connections().await {
        println!(
            "probe {} (chain {}): {}",
            report.url, report.chain_id, report.detail
        );
    }

    // Stop the campaign after a minute from a side task.
    let stop = console.stop_handle();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        stop.request_stop();
    });

    let summary = console.run().await?;
    println!(
        "Run finished: {} actions ({} ok, {} failed, {} skipped)",
        summary.stats.total_actions,
        summary.stats.successful_actions,
        summary.stats.failed_actions,
        summary.stats.counts.skipped
    );
    println!("{}", console.export_log_csv());

    Ok(())
}
