//! The Controller
//!
//! Single cooperative loop over the per-chain workers:
//! - Every decision epoch the bandit may switch the active chain
//! - Every tick runs exactly one worker tick on the active chain
//! - The tick outcome is fed back to the bandit as a reward
//!
//! Only one worker is ever mid-tick, so the bandit and the workers need no
//! locking.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use eyre::{eyre, Result};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::brain::Bandit;
use crate::chains::Chain;
use crate::config::Config;
use crate::store::{ChainStats, MetricStore};
use crate::worker::{TickResult, Worker};

/// Loop cadence and reward settings
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub tick: Duration,
    pub decision: Duration,
    pub min_profit_usd: f64,

    /// Profitable ticks slower than this are not rewarded
    pub reward_latency_ms: u64,

    /// Applied to the bandit at every decision epoch (1.0 = off)
    pub bandit_decay: f64,

    /// Stop after this many ticks
    pub max_ticks: Option<u64>,
}

impl ControllerSettings {
    pub fn from_config(config: &Config, max_ticks: Option<u64>) -> Self {
        Self {
            tick: Duration::from_millis(config.tick_ms),
            decision: Duration::from_millis(config.decision_ms),
            min_profit_usd: config.min_profit_usd,
            reward_latency_ms: config.reward_latency_ms,
            bandit_decay: config.bandit_decay,
            max_ticks,
        }
    }
}

pub struct Controller {
    settings: ControllerSettings,
    bandit: Bandit,
    workers: BTreeMap<Chain, Worker>,
    store: Arc<dyn MetricStore>,
    current: Chain,
    next_decision: Instant,
    ticks: u64,
    started: Instant,
}

impl Controller {
    /// Every bandit arm needs a worker. Saved arm state is restored before
    /// the first chain is chosen.
    pub fn new(
        settings: ControllerSettings,
        mut bandit: Bandit,
        workers: Vec<Worker>,
        store: Arc<dyn MetricStore>,
    ) -> Result<Self> {
        let workers: BTreeMap<Chain, Worker> = workers.into_iter().map(|w| (w.chain(), w)).collect();

        for chain in bandit.chains() {
            if !workers.contains_key(&chain) {
                return Err(eyre!("No worker for bandit arm {}", chain));
            }
        }

        let saved = store.load_bandit_state();
        if !saved.is_empty() {
            bandit.restore(&saved);
            info!(target: "bandit", "Restored {} saved arms", saved.len());
        }

        let current = bandit.choose_chain();
        let now = Instant::now();
        info!(target: "bandit", "🎯 Starting on {}", current);

        Ok(Self {
            next_decision: now + settings.decision,
            settings,
            bandit,
            workers,
            store,
            current,
            ticks: 0,
            started: now,
        })
    }

    pub fn current_chain(&self) -> Chain {
        self.current
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn bandit(&self) -> &Bandit {
        &self.bandit
    }

    /// One loop iteration without the trailing sleep
    pub async fn step(&mut self) -> Result<TickResult> {
        if Instant::now() >= self.next_decision {
            if self.settings.bandit_decay < 1.0 {
                self.bandit.decay(self.settings.bandit_decay);
            }

            let next = self.bandit.choose_chain();
            if next != self.current {
                info!(target: "bandit", "🔀 Switching {} → {}", self.current, next);
            }
            self.current = next;
            self.next_decision = Instant::now() + self.settings.decision;
        }

        let chain = self.current;
        let worker = self
            .workers
            .get_mut(&chain)
            .ok_or_else(|| eyre!("No worker for {}", chain))?;

        let result = worker.tick().await;

        let reward = result.profit_net_usd > 0.0 && result.latency_ms < self.settings.reward_latency_ms;
        self.bandit.update(chain, reward);
        if let Err(e) = self.store.save_bandit_state(&self.bandit.snapshot()) {
            warn!(target: "bandit", "Could not persist arm state: {}", e);
        }

        self.ticks += 1;

        if result.profit_net_usd > self.settings.min_profit_usd {
            info!(
                target: "worker",
                "💰 {} profitable opportunity: {} net ${:.4} in {}ms",
                chain,
                result.route_name.as_deref().unwrap_or("?"),
                result.profit_net_usd,
                result.latency_ms
            );
        }

        if self.ticks % 10 == 0 {
            self.print_status();
        }

        Ok(result)
    }

    /// Run until SIGINT/SIGTERM or `max_ticks`
    pub async fn run(&mut self) -> Result<Vec<ChainStats>> {
        let shutdown = shutdown_signal()?;
        self.run_until(shutdown).await
    }

    /// Run until `shutdown` resolves or `max_ticks` is reached, then report
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<Vec<ChainStats>>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            self.step().await?;

            if let Some(max) = self.settings.max_ticks {
                if self.ticks >= max {
                    info!("Reached {} ticks", max);
                    break;
                }
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("🛑 Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(self.settings.tick) => {}
            }
        }

        self.final_report()
    }

    /// Net profit over every recorded tick, gas on rejected ticks included
    fn total_net_profit_usd(&self) -> f64 {
        let chains = self.bandit.chains();
        self.store
            .all_chain_stats()
            .iter()
            .filter(|s| chains.contains(&s.chain))
            .map(|s| s.net_profit_usd)
            .sum()
    }

    fn print_status(&self) {
        let time = chrono::Local::now().format("%H:%M:%S");
        let net = self.total_net_profit_usd();
        println!(
            "{} {} {} {} {}",
            style(format!("[{}]", time)).dim(),
            style(format!("{:<9}", self.current.key())).cyan(),
            style(format!("ticks {:>6}", self.ticks)).white(),
            style("net").dim(),
            if net >= 0.0 {
                style(format!("${:.4}", net)).green()
            } else {
                style(format!("${:.4}", net)).red()
            }
        );
    }

    /// Print the final statistics, persist bandit state and flush the store
    pub fn final_report(&self) -> Result<Vec<ChainStats>> {
        let chains = self.bandit.chains();
        let stats: Vec<ChainStats> = self
            .store
            .all_chain_stats()
            .into_iter()
            .filter(|s| chains.contains(&s.chain))
            .collect();

        let uptime = self.started.elapsed().as_secs();
        let net: f64 = stats.iter().map(|s| s.net_profit_usd).sum();

        println!();
        println!("{}", style("╔════════════════════════════════════════════════════════════╗").cyan());
        println!("{}", style("║                     FINAL STATISTICS                       ║").cyan().bold());
        println!("{}", style("╠════════════════════════════════════════════════════════════╣").cyan());
        println!("║ Uptime: {:>8}s   Ticks: {:>8}   Net: ${:>14.4} ║", uptime, self.ticks, net);
        println!("{}", style("╠════════════════════════════════════════════════════════════╣").cyan());
        println!("║ {:<10} {:>8} {:>8} {:>9} {:>12} {:>7} ║", "CHAIN", "TRADES", "WINS", "WIN %", "NET $", "AVG ms");
        for s in &stats {
            println!(
                "║ {:<10} {:>8} {:>8} {:>8.1}% {:>12.4} {:>7.0} ║",
                s.chain.key(),
                s.total_trades,
                s.successful_trades,
                s.win_rate,
                s.net_profit_usd,
                s.avg_latency_ms
            );
        }
        println!("{}", style("╠════════════════════════════════════════════════════════════╣").cyan());
        for arm in self.bandit.state() {
            let worker = self.workers.get(&arm.chain).map(|w| w.stats());
            println!(
                "║ {:<10} α {:>7.2}  β {:>7.2}  p̂ {:>5.1}%  worker {:>5.1}%      ║",
                arm.chain.key(),
                arm.alpha,
                arm.beta,
                arm.estimated_win_rate * 100.0,
                worker.map(|w| w.success_rate).unwrap_or(0.0)
            );
        }
        println!("║ Best arm: {:<48} ║", self.bandit.best_chain().key());
        println!("{}", style("╚════════════════════════════════════════════════════════════╝").cyan());
        println!();

        self.store.save_bandit_state(&self.bandit.snapshot())?;
        self.store.flush()?;

        Ok(stats)
    }
}

/// Resolves on SIGINT or SIGTERM. Both handlers are installed before this
/// returns, so a signal arriving mid-tick is not lost.
#[cfg(unix)]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("Received SIGINT"),
            _ = terminate.recv() => info!("Received SIGTERM"),
        }
    })
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{BanditArm, ProfitFilter};
    use crate::test_support::{route, usd, FixedOracle, RecordingExecutor, RecordingStore, ScriptedSimulator};
    use crate::worker::WorkerConfig;

    fn worker(chain: Chain, sim: ScriptedSimulator, store: Arc<RecordingStore>) -> Worker {
        let config = WorkerConfig {
            chain,
            routes: vec![route("A")],
            sizes: vec![usd(100)],
            stable_decimals: 6,
            filter: ProfitFilter::new(0.05, 1.7),
            max_slippage_bps: 50,
        };
        Worker::new(
            config,
            Arc::new(sim),
            Arc::new(FixedOracle::new(0.10)),
            Arc::new(RecordingExecutor::succeeding(chain)),
            store,
        )
    }

    fn settings(max_ticks: u64) -> ControllerSettings {
        ControllerSettings {
            tick: Duration::from_millis(700),
            decision: Duration::from_millis(5_000),
            min_profit_usd: 0.05,
            reward_latency_ms: 1_500,
            bandit_decay: 1.0,
            max_ticks: Some(max_ticks),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_tick_is_a_failed_reward() {
        let store = Arc::new(RecordingStore::new());
        let bandit = Bandit::with_seed(&[Chain::Base], 2.0, 7).unwrap();
        let workers = vec![worker(Chain::Base, ScriptedSimulator::new(), store.clone())];
        let mut controller = Controller::new(settings(1), bandit, workers, store.clone()).unwrap();

        let result = controller.step().await.unwrap();

        assert!(result.success);
        assert!(!result.found);
        assert!(!result.executed);
        assert_eq!(result.profit_net_usd, 0.0);

        let arm = &controller.bandit().state()[0];
        assert_eq!(arm.alpha, 2.0);
        assert_eq!(arm.beta, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_profitable_fast_tick_is_rewarded() {
        let store = Arc::new(RecordingStore::new());
        let sim = ScriptedSimulator::new().quote("A", usd(100), 101_000_000, Some(200_000));
        let bandit = Bandit::with_seed(&[Chain::Base], 2.0, 7).unwrap();
        let workers = vec![worker(Chain::Base, sim, store.clone())];
        let mut controller = Controller::new(settings(1), bandit, workers, store.clone()).unwrap();

        let result = controller.step().await.unwrap();
        assert!(result.success);

        let arm = &controller.bandit().state()[0];
        assert_eq!(arm.alpha, 3.0);
        assert_eq!(arm.beta, 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chain_only_rechosen_each_decision_epoch() {
        let store = Arc::new(RecordingStore::new());
        let bandit = Bandit::with_seed(&[Chain::Base, Chain::Arbitrum], 2.0, 11).unwrap();
        let workers = vec![
            worker(Chain::Base, ScriptedSimulator::new(), store.clone()),
            worker(Chain::Arbitrum, ScriptedSimulator::new(), store.clone()),
        ];
        let mut controller = Controller::new(settings(10), bandit, workers, store.clone()).unwrap();

        controller.run_until(std::future::pending()).await.unwrap();

        // t = 0 .. 6.3s at 700ms: one choice at start, one after 5s
        assert_eq!(controller.ticks(), 10);
        assert_eq!(controller.bandit().history().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stats_match_recorded_metrics() {
        let store = Arc::new(RecordingStore::new());
        let base_sim = ScriptedSimulator::new().quote("A", usd(100), 100_800_000, Some(200_000));
        let arb_sim = ScriptedSimulator::new().quote("A", usd(100), 100_300_000, Some(200_000));
        let bandit = Bandit::with_seed(&[Chain::Base, Chain::Arbitrum], 2.0, 3).unwrap();
        let workers = vec![
            worker(Chain::Base, base_sim, store.clone()),
            worker(Chain::Arbitrum, arb_sim, store.clone()),
        ];
        let mut s = settings(40);
        s.decision = Duration::from_millis(1_000);
        let mut controller = Controller::new(s, bandit, workers, store.clone()).unwrap();

        let stats = controller.run_until(std::future::pending()).await.unwrap();

        assert_eq!(stats.len(), 2);
        let metrics = store.inner().metrics();
        assert_eq!(metrics.len(), 40);

        for s in &stats {
            let recorded: Vec<_> = metrics.iter().filter(|m| m.chain == s.chain).collect();
            let net: f64 = recorded.iter().map(|m| m.profit_usd - m.gas_usd).sum();
            assert_eq!(s.total_trades, recorded.len() as u64);
            assert!((s.net_profit_usd - net).abs() < 1e-9);
        }
        assert_eq!(stats.iter().map(|s| s.total_trades).sum::<u64>(), 40);

        let events = store.events();
        assert_eq!(events[events.len() - 2], "bandit:save");
        assert_eq!(events[events.len() - 1], "flush");
        assert_eq!(store.load_bandit_state().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_saved_arms_restored_at_startup() {
        let store = Arc::new(RecordingStore::new());
        store
            .save_bandit_state(&[BanditArm { chain: Chain::Base, alpha: 9.0, beta: 4.0 }])
            .unwrap();
        let bandit = Bandit::with_seed(&[Chain::Base], 2.0, 1).unwrap();
        let workers = vec![worker(Chain::Base, ScriptedSimulator::new(), store.clone())];

        let controller = Controller::new(settings(1), bandit, workers, store.clone()).unwrap();
        let arm = &controller.bandit().state()[0];
        assert_eq!(arm.alpha, 9.0);
        assert_eq!(arm.beta, 4.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_profitable_tick_is_not_rewarded() {
        let store = Arc::new(RecordingStore::new());
        let sim = ScriptedSimulator::new().quote("A", usd(100), 101_000_000, Some(200_000));
        let bandit = Bandit::with_seed(&[Chain::Base], 2.0, 7).unwrap();
        let workers = vec![worker(Chain::Base, sim, store.clone())];
        let mut s = settings(1);
        s.reward_latency_ms = 0;
        let mut controller = Controller::new(s, bandit, workers, store.clone()).unwrap();

        let result = controller.step().await.unwrap();
        assert!(result.success);
        assert!(result.profit_net_usd > 0.0);

        let arm = &controller.bandit().state()[0];
        assert_eq!(arm.alpha, 2.0);
        assert_eq!(arm.beta, 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decay_applied_at_decision_epoch() {
        let store = Arc::new(RecordingStore::new());
        let bandit = Bandit::with_seed(&[Chain::Base], 2.0, 7).unwrap();
        let workers = vec![worker(Chain::Base, ScriptedSimulator::new(), store.clone())];
        let mut s = settings(3);
        s.bandit_decay = 0.5;
        let mut controller = Controller::new(s, bandit, workers, store.clone()).unwrap();

        // Before the first epoch: no decay, beta 2 → 3 → 4
        controller.step().await.unwrap();
        controller.step().await.unwrap();
        assert_eq!(controller.bandit().state()[0].beta, 4.0);

        // At the epoch beta decays to 2 + (4 - 2) * 0.5 = 3, then the tick adds 1
        tokio::time::advance(Duration::from_millis(5_000)).await;
        controller.step().await.unwrap();
        let arm = &controller.bandit().state()[0];
        assert_eq!(arm.alpha, 2.0);
        assert_eq!(arm.beta, 4.0);
        assert_eq!(controller.bandit().history().count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_arm_state_persisted_every_tick() {
        let store = Arc::new(RecordingStore::new());
        let sim = ScriptedSimulator::new().quote("A", usd(100), 101_000_000, Some(200_000));
        let bandit = Bandit::with_seed(&[Chain::Base], 2.0, 7).unwrap();
        let workers = vec![worker(Chain::Base, sim, store.clone())];
        let mut controller = Controller::new(settings(100), bandit, workers, store.clone()).unwrap();

        for _ in 0..5 {
            controller.step().await.unwrap();
        }

        let saved = store.load_bandit_state();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].chain, Chain::Base);
        assert_eq!(saved[0].alpha, 7.0);
        assert!(!store.events().contains(&"flush".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_total_includes_rejected_gas() {
        let store = Arc::new(RecordingStore::new());
        let sim = ScriptedSimulator::new()
            .quote("A", usd(100), 100_500_000, Some(200_000))
            .quote("A", usd(100), 100_000_000, Some(200_000));
        let bandit = Bandit::with_seed(&[Chain::Base], 2.0, 7).unwrap();
        let workers = vec![worker(Chain::Base, sim, store.clone())];
        let mut controller = Controller::new(settings(1), bandit, workers, store.clone()).unwrap();

        let result = controller.step().await.unwrap();
        assert_eq!(result.profit_net_usd, 0.0);
        assert!((controller.total_net_profit_usd() + 0.10).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_during_first_tick_still_reports() {
        let store = Arc::new(RecordingStore::new());
        let bandit = Bandit::with_seed(&[Chain::Base], 2.0, 7).unwrap();
        let workers = vec![worker(Chain::Base, ScriptedSimulator::new(), store.clone())];
        let mut controller = Controller::new(settings(100), bandit, workers, store.clone()).unwrap();

        let stats = controller.run_until(std::future::ready(())).await.unwrap();

        assert_eq!(controller.ticks(), 1);
        assert_eq!(stats[0].total_trades, 1);
        let events = store.events();
        assert_eq!(events[events.len() - 1], "flush");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_resolves_shutdown_signal() {
        let shutdown = shutdown_signal().unwrap();

        let status = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("kill -TERM {}", std::process::id()))
            .status()
            .unwrap();
        assert!(status.success());

        tokio_test::assert_ok!(tokio::time::timeout(Duration::from_secs(5), shutdown).await);
    }

    #[test]
    fn test_missing_worker_rejected() {
        let store = Arc::new(RecordingStore::new());
        let bandit = Bandit::with_seed(&[Chain::Base, Chain::Polygon], 2.0, 1).unwrap();
        let workers = vec![worker(Chain::Base, ScriptedSimulator::new(), store.clone())];
        assert!(Controller::new(settings(1), bandit, workers, store).is_err());
    }
}
