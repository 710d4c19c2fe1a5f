//! RPC verification tool
//!
//! For every configured chain, checks the read, sim and send endpoints
//! (chain id, block number, latency) and the operator wallet balance.
//!
//! Run with: cargo run --bin verify-rpcs

use color_eyre::eyre::Result;
use console::style;
use futures::future::join_all;
use rotor::chains::Chain;
use rotor::config::Config;
use rotor::executor::OperatorWallet;
use rotor::rpc::{check_endpoint, http_provider};

use alloy_primitives::{utils::format_ether, Address};
use alloy_provider::Provider;

async fn check_url(chain: Chain, role: &str, url: &str) -> bool {
    let provider = match http_provider(url) {
        Ok(p) => p,
        Err(e) => {
            println!("  {} {:<5} invalid URL: {}", style("✗").red(), role, e);
            return false;
        }
    };

    match check_endpoint(chain, &provider).await {
        Ok(check) => {
            println!(
                "  {} {:<5} chain {} | block {} | {}ms",
                style("✓").green(),
                role,
                check.chain_id,
                check.block_number,
                check.latency_ms
            );
            true
        }
        Err(e) => {
            println!("  {} {:<5} {}", style("✗").red(), role, e);
            false
        }
    }
}

async fn wallet_balance(chain: Chain, url: &str, wallet: Address) -> Option<String> {
    let provider = http_provider(url).ok()?;
    let balance = provider.get_balance(wallet).await.ok()?;
    Some(format!("{} {}", format_ether(balance), chain.info().native_currency))
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::from_env()?;
    let wallet = OperatorWallet::from_optional(config.private_key.as_deref())?;

    println!("{}", style("═══ RPC VERIFICATION ═══").cyan().bold());
    println!();

    let mut failures = 0;
    for &chain in &config.chains {
        let Some(endpoints) = config.endpoints_for(chain) else {
            println!("{} {}: no endpoints configured", style("✗").red(), chain);
            failures += 1;
            continue;
        };

        println!("{}", style(format!("{} ({})", chain, chain.info().chain_id)).bold());

        let roles = [
            ("read", endpoints.read.as_str()),
            ("sim", endpoints.sim.as_str()),
            ("send", endpoints.send.as_str()),
        ];
        let results = join_all(roles.iter().map(|(role, url)| check_url(chain, role, url))).await;
        failures += results.iter().filter(|ok| !**ok).count();

        if let Some(w) = &wallet {
            match wallet_balance(chain, &endpoints.read, w.address()).await {
                Some(balance) => println!("  💰 wallet {:#x}: {}", w.address(), balance),
                None => println!("  {} wallet balance unavailable", style("⚠").yellow()),
            }
        }
        println!();
    }

    if failures == 0 {
        println!("{}", style("✅ All endpoints verified").green().bold());
    } else {
        println!("{}", style(format!("❌ {} endpoint check(s) failed", failures)).red().bold());
        std::process::exit(1);
    }

    Ok(())
}
