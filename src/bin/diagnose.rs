//! Diagnostic tool - Print the effective configuration and mode
//!
//! Run with: cargo run --bin diagnose [-- path/to/rotor.toml] [--export out.toml]

use rotor::config::{Config, ExecutionMode};
use std::env;

fn main() {
    println!("🔍 ROTOR DIAGNOSTIC CHECK\n");

    dotenvy::dotenv().ok();

    let args = parse_args(env::args().skip(1));
    let config = match &args.config {
        Some(path) => Config::from_file(path),
        None => Config::from_env(),
    };
    let config = match config {
        Ok(c) => c,
        Err(e) => {
            println!("❌ Could not load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    println!("═══════════════════════════════════════════════════");
    println!("                  ENVIRONMENT                       ");
    println!("═══════════════════════════════════════════════════\n");

    let keys = [
        ("CHAINS", "Active chain set"),
        ("TICK_MS", "Delay between ticks"),
        ("DECISION_MS", "Bandit decision epoch"),
        ("MIN_PROFIT_USD", "Net profit floor"),
        ("GAS_MULT", "Net profit must cover gas this many times"),
        ("MAX_SLIPPAGE_BPS", "Allowed quote drift before sending"),
        ("TRADE_SIZES_USD", "Probed trade sizes"),
        ("DRY_RUN", "Never broadcast?"),
    ];

    for (key, desc) in keys {
        let marker = if env::var(key).is_ok() { "(from env)" } else { "(default)" };
        println!("  {} {}", key, marker);
        println!("    └─ {}\n", desc);
    }

    config.print_summary();
    println!();

    println!("═══════════════════════════════════════════════════");
    println!("                  EXECUTION MODE                    ");
    println!("═══════════════════════════════════════════════════\n");

    for &chain in &config.chains {
        let mode = config.execution_mode(chain);
        let icon = match mode {
            ExecutionMode::Live => "🚀",
            ExecutionMode::DryRun => "📋",
        };
        let endpoints = config.endpoints_for(chain);
        println!("  {} {:<10} {} ({})", icon, chain.key(), mode, chain.info().name);
        if let Some(e) = endpoints {
            println!("    ├─ read: {}", redact(&e.read));
            println!("    ├─ sim:  {}", redact(&e.sim));
            if let Some(ws) = &e.ws {
                println!("    ├─ ws:   {}", redact(ws));
            }
            println!("    └─ send: {}", redact(&e.send));
        }
    }
    println!();

    match config.validate() {
        Ok(()) => println!("✅ Configuration is valid"),
        Err(e) => {
            println!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }

    if let Some(path) = &args.export {
        match config.save_to_file(path) {
            Ok(()) => println!("💾 Effective configuration written to {} (private key omitted)", path),
            Err(e) => {
                println!("❌ Could not write {}: {:#}", path, e);
                std::process::exit(1);
            }
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<String>,
    export: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Args {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        if arg == "--export" {
            parsed.export = args.next();
        } else {
            parsed.config = Some(arg);
        }
    }
    parsed
}

/// Hide API keys embedded in RPC URLs
fn redact(url: &str) -> String {
    let chars: Vec<char> = url.chars().collect();
    if chars.len() > 50 {
        let head: String = chars[..30].iter().collect();
        let tail: String = chars[chars.len() - 8..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_long_url() {
        let url = "https://base-mainnet.g.alchemy.com/v2/abcdefghijklmnopqrstuvwxyz012345";
        assert_eq!(redact(url), "https://base-mainnet.g.alchemy...yz012345");
        assert_eq!(redact("https://mainnet.base.org"), "https://mainnet.base.org");
    }

    #[test]
    fn test_redact_multibyte_url() {
        let url = format!("https://{}/{}", "ä".repeat(30), "ü".repeat(20));
        let redacted = redact(&url);
        assert!(redacted.starts_with("https://ää"));
        assert!(redacted.ends_with("üüüüüüüü"));
        assert_eq!(redacted.chars().count(), 30 + 3 + 8);
    }

    #[test]
    fn test_parse_args() {
        let args = |v: &[&str]| parse_args(v.iter().map(|s| s.to_string()));

        assert_eq!(args(&[]), Args::default());
        assert_eq!(
            args(&["rotor.toml", "--export", "out.toml"]),
            Args { config: Some("rotor.toml".into()), export: Some("out.toml".into()) }
        );
        assert_eq!(args(&["--export", "out.toml"]).config, None);
    }
}
