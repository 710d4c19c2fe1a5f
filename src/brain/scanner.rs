//! Candidate Scanner
//!
//! Quotes every (route, size) pair on one chain, strictly in order and one
//! at a time, prices each quote net of gas, filters and ranks.

use std::cmp::Ordering;
use std::time::Instant;

use alloy_primitives::U256;
use eyre::Result;
use tracing::{debug, info};

use super::{to_usd, Candidate, ProfitFilter, QuickScanResult, StrategyResult};
use crate::chains::Chain;
use crate::gas_oracle::PriceOracle;
use crate::routes::Route;
use crate::simulator::SimulationClient;

/// Find the best candidate across all routes and sizes.
///
/// A failed quote only skips its pair. Failing to read the gas price or to
/// convert gas to USD fails the whole scan.
pub async fn find_candidate(
    chain: Chain,
    sim: &dyn SimulationClient,
    oracle: &dyn PriceOracle,
    routes: &[Route],
    sizes: &[U256],
    stable_decimals: u8,
    filter: &ProfitFilter,
) -> Result<StrategyResult> {
    let start = Instant::now();
    let mut candidates = Vec::new();
    let mut scanned_routes = 0;
    let mut scanned_sizes = 0;

    // Once per scan, not per quote
    let gas_price_wei = sim.gas_price_wei().await?;

    for route in routes {
        scanned_routes += 1;

        for &amount_in in sizes {
            scanned_sizes += 1;

            let quote = match sim.simulate(route, amount_in).await {
                Ok(q) => q,
                Err(e) => {
                    debug!(target: "strategy", "{} {} @ {}: route scan error: {}", chain, route.name, amount_in, e);
                    continue;
                }
            };

            if !quote.success || quote.amount_out <= amount_in {
                continue;
            }

            let in_usd = to_usd(amount_in, stable_decimals);
            let out_usd = to_usd(quote.amount_out, stable_decimals);
            let profit_usd = out_usd - in_usd;

            let gas_estimate = quote.gas_estimate.unwrap_or_else(|| chain.gas_proxy());
            let gas_usd = oracle.gas_to_usd(chain, gas_estimate, gas_price_wei).await?;
            let profit_net_usd = profit_usd - gas_usd;

            if !filter.accepts(profit_net_usd, gas_usd) {
                continue;
            }

            debug!(
                target: "strategy",
                "{} candidate {} @ ${:.2}: net ${:.4} ({} bps)",
                chain, route.name, in_usd, profit_net_usd, quote.profit_bps
            );

            candidates.push(Candidate {
                route_name: route.name.clone(),
                route: route.clone(),
                amount_in,
                amount_out: quote.amount_out,
                mid_amount: quote.mid_amount,
                profit_bps: quote.profit_bps,
                profit_usd,
                profit_net_usd,
                gas_usd,
                gas_estimate,
                score: ProfitFilter::score(profit_net_usd, quote.profit_bps),
            });
        }
    }

    let scan_time_ms = start.elapsed().as_millis() as u64;

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    let best = candidates.first().cloned();

    if let Some(ref c) = best {
        info!(
            target: "strategy",
            "{} best: {} @ ${:.2} | net ${:.4} | {} bps | gas ${:.4} | {} candidates in {}ms",
            chain,
            c.route_name,
            to_usd(c.amount_in, stable_decimals),
            c.profit_net_usd,
            c.profit_bps,
            c.gas_usd,
            candidates.len(),
            scan_time_ms
        );
    }

    Ok(StrategyResult {
        found: best.is_some(),
        candidate: best,
        candidates,
        scanned_routes,
        scanned_sizes,
        scan_time_ms,
    })
}

/// Probe each route once at `size` and return the first with any positive
/// edge. No gas, no ranking: a liveness check, not an execution decision.
pub async fn quick_scan(sim: &dyn SimulationClient, routes: &[Route], size: U256) -> QuickScanResult {
    for route in routes {
        match sim.simulate(route, size).await {
            Ok(q) if q.success && q.profit_bps > 0 => {
                return QuickScanResult {
                    found: true,
                    route_name: Some(route.name.clone()),
                    profit_bps: Some(q.profit_bps),
                };
            }
            _ => continue,
        }
    }

    QuickScanResult::default()
}
