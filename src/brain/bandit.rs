//! Chain Selector - Thompson Sampling
//!
//! A Beta-Bernoulli multi-armed bandit with one arm per chain. Each arm
//! holds (alpha, beta) pseudo-counts; choosing samples every posterior and
//! takes the largest sample, so under-tried chains still get explored
//! without a separate exploration rate.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::chains::Chain;

/// Decisions kept for diagnostics
const MAX_HISTORY: usize = 1000;

/// Persistable arm state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BanditArm {
    pub chain: Chain,
    pub alpha: f64,
    pub beta: f64,
}

impl BanditArm {
    pub fn win_rate(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    /// Normal-approximation 95% half width of the posterior
    pub fn confidence_width(&self) -> f64 {
        let n = self.alpha + self.beta;
        let variance = (self.alpha * self.beta) / (n * n * (n + 1.0));
        1.96 * variance.sqrt()
    }
}

/// Reported state of one arm
#[derive(Debug, Clone, Serialize)]
pub struct ArmReport {
    pub chain: Chain,
    pub alpha: f64,
    pub beta: f64,
    pub estimated_win_rate: f64,
    pub confidence: f64,
}

/// One `choose_chain` outcome
#[derive(Debug, Clone, Serialize)]
pub struct BanditDecision {
    pub chain: Chain,
    pub sampled_value: f64,
    pub confidence: f64,
    pub exploration_ratio: f64,
    pub at: DateTime<Utc>,
}

pub struct Bandit {
    arms: Vec<BanditArm>,
    prior: f64,
    rng: StdRng,
    history: VecDeque<BanditDecision>,
}

impl Bandit {
    /// Bandit over `chains`, every arm starting at Beta(prior, prior)
    pub fn new(chains: &[Chain], prior: f64) -> Result<Self> {
        Self::with_rng(chains, prior, StdRng::from_entropy())
    }

    /// Deterministic bandit for reproducible runs
    pub fn with_seed(chains: &[Chain], prior: f64, seed: u64) -> Result<Self> {
        Self::with_rng(chains, prior, StdRng::seed_from_u64(seed))
    }

    fn with_rng(chains: &[Chain], prior: f64, rng: StdRng) -> Result<Self> {
        if chains.is_empty() {
            return Err(eyre!("Bandit needs at least one chain"));
        }
        if !(prior > 0.0) {
            return Err(eyre!("Bandit prior must be positive, got {}", prior));
        }

        let mut arms: Vec<BanditArm> = Vec::with_capacity(chains.len());
        for &chain in chains {
            if !arms.iter().any(|a| a.chain == chain) {
                arms.push(BanditArm { chain, alpha: prior, beta: prior });
            }
        }

        info!(target: "bandit", "🎰 Bandit initialized over {:?} (prior {})", chains, prior);

        Ok(Self {
            arms,
            prior,
            rng,
            history: VecDeque::new(),
        })
    }

    // ============================================
    // SELECTION
    // ============================================

    /// Thompson Sampling: draw once from every arm's posterior and return
    /// the chain with the largest draw. Ties go to the earliest arm.
    pub fn choose_chain(&mut self) -> Chain {
        let mut best = self.arms[0].chain;
        let mut best_sample = f64::NEG_INFINITY;
        let mut samples = Vec::with_capacity(self.arms.len());

        for arm in &self.arms {
            let sample = match Beta::new(arm.alpha, arm.beta) {
                Ok(dist) => dist.sample(&mut self.rng),
                Err(_) => arm.win_rate(),
            };
            samples.push(format!("{}:{:.3}", arm.chain, sample));

            if sample > best_sample {
                best_sample = sample;
                best = arm.chain;
            }
        }

        let avg_confidence = self
            .arms
            .iter()
            .map(|a| 1.0 - a.confidence_width())
            .sum::<f64>()
            / self.arms.len() as f64;

        if self.history.len() == MAX_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(BanditDecision {
            chain: best,
            sampled_value: best_sample,
            confidence: avg_confidence,
            exploration_ratio: 1.0 - avg_confidence,
            at: Utc::now(),
        });

        debug!(
            target: "bandit",
            "Chain selected: {} [{}] confidence {:.3}",
            best, samples.join(", "), avg_confidence
        );

        best
    }

    /// Pure exploitation: chain with the highest estimated win rate
    pub fn best_chain(&self) -> Chain {
        let mut best = &self.arms[0];
        for arm in &self.arms {
            if arm.win_rate() > best.win_rate() {
                best = arm;
            }
        }
        best.chain
    }

    // ============================================
    // FEEDBACK
    // ============================================

    /// Standard Beta-Bernoulli update
    pub fn update(&mut self, chain: Chain, success: bool) {
        self.update_weighted(chain, success, 0.0);
    }

    /// Update with an extra success pseudo-count of `min(reward / 10, 0.5)`
    /// for a positive reward
    pub fn update_weighted(&mut self, chain: Chain, success: bool, reward: f64) {
        let Some(arm) = self.arms.iter_mut().find(|a| a.chain == chain) else {
            warn!(target: "bandit", "Update for unknown chain {}", chain);
            return;
        };

        if success {
            arm.alpha += 1.0;
        } else {
            arm.beta += 1.0;
        }
        if reward > 0.0 {
            arm.alpha += (reward / 10.0).min(0.5);
        }

        debug!(
            target: "bandit",
            "{} {} → α={:.2} β={:.2} win rate {:.1}%",
            chain,
            if success { "success" } else { "failure" },
            arm.alpha,
            arm.beta,
            arm.win_rate() * 100.0
        );
    }

    /// Pull every arm back toward the prior: `x ← prior + (x − prior) · factor`
    pub fn decay(&mut self, factor: f64) {
        let factor = factor.clamp(0.0, 1.0);
        for arm in &mut self.arms {
            arm.alpha = self.prior + (arm.alpha - self.prior) * factor;
            arm.beta = self.prior + (arm.beta - self.prior) * factor;
        }
    }

    pub fn reset_chain(&mut self, chain: Chain) {
        if let Some(arm) = self.arms.iter_mut().find(|a| a.chain == chain) {
            arm.alpha = self.prior;
            arm.beta = self.prior;
            info!(target: "bandit", "{} reset", chain);
        }
    }

    pub fn reset_all(&mut self) {
        for arm in &mut self.arms {
            arm.alpha = self.prior;
            arm.beta = self.prior;
        }
        self.history.clear();
        info!(target: "bandit", "All arms reset");
    }

    // ============================================
    // STATE
    // ============================================

    pub fn state(&self) -> Vec<ArmReport> {
        self.arms
            .iter()
            .map(|a| ArmReport {
                chain: a.chain,
                alpha: a.alpha,
                beta: a.beta,
                estimated_win_rate: a.win_rate(),
                confidence: 1.0 - a.confidence_width(),
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<BanditArm> {
        self.arms.clone()
    }

    /// Restore saved arms. Chains not configured now are ignored and
    /// non-positive counts are discarded.
    pub fn restore(&mut self, saved: &[BanditArm]) {
        for s in saved {
            if s.alpha <= 0.0 || s.beta <= 0.0 {
                continue;
            }
            if let Some(arm) = self.arms.iter_mut().find(|a| a.chain == s.chain) {
                arm.alpha = s.alpha;
                arm.beta = s.beta;
            }
        }
    }

    pub fn chains(&self) -> Vec<Chain> {
        self.arms.iter().map(|a| a.chain).collect()
    }

    pub fn history(&self) -> impl Iterator<Item = &BanditDecision> {
        self.history.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAINS: [Chain; 3] = [Chain::Base, Chain::Arbitrum, Chain::Optimism];

    fn selection_share(bandit: &mut Bandit, chain: Chain, trials: usize) -> f64 {
        let hits = (0..trials).filter(|_| bandit.choose_chain() == chain).count();
        hits as f64 / trials as f64
    }

    #[test]
    fn test_rejects_empty_chain_set() {
        assert!(Bandit::new(&[], 2.0).is_err());
        assert!(Bandit::new(&CHAINS, 0.0).is_err());
    }

    #[test]
    fn test_repeated_success_converges() {
        let mut bandit = Bandit::with_seed(&CHAINS, 2.0, 7).unwrap();
        for _ in 0..200 {
            bandit.update(Chain::Arbitrum, true);
        }

        let share = selection_share(&mut bandit, Chain::Arbitrum, 2000);
        assert!(share > 0.95, "share was {}", share);
        assert_eq!(bandit.best_chain(), Chain::Arbitrum);
    }

    #[test]
    fn test_failures_lower_selection_share() {
        let mut bandit = Bandit::with_seed(&[Chain::Base, Chain::Polygon], 1.0, 42).unwrap();
        for _ in 0..10 {
            bandit.update(Chain::Base, true);
        }

        let mut shares = Vec::new();
        for failures in [0, 5, 15] {
            while bandit.snapshot()[0].beta < 1.0 + failures as f64 {
                bandit.update(Chain::Base, false);
            }
            shares.push(selection_share(&mut bandit, Chain::Base, 3000));
        }

        assert!(shares[0] > shares[1], "{:?}", shares);
        assert!(shares[1] > shares[2], "{:?}", shares);
    }

    #[test]
    fn test_fresh_arms_roughly_uniform() {
        let mut bandit = Bandit::with_seed(&CHAINS, 2.0, 3).unwrap();
        for chain in CHAINS {
            let share = selection_share(&mut bandit, chain, 3000);
            assert!((share - 1.0 / 3.0).abs() < 0.05, "{} share {}", chain, share);
        }
    }

    #[test]
    fn test_weighted_update_caps_bonus() {
        let mut bandit = Bandit::with_seed(&CHAINS, 2.0, 1).unwrap();
        bandit.update_weighted(Chain::Base, true, 2.0);
        bandit.update_weighted(Chain::Optimism, true, 100.0);

        let arms = bandit.snapshot();
        assert!((arms[0].alpha - 3.2).abs() < 1e-12);
        assert!((arms[2].alpha - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_decay_pulls_toward_prior() {
        let mut bandit = Bandit::with_seed(&CHAINS, 2.0, 1).unwrap();
        for _ in 0..10 {
            bandit.update(Chain::Base, true);
        }
        bandit.decay(0.5);
        let arms = bandit.snapshot();
        assert_eq!(arms[0].alpha, 7.0);
        assert_eq!(arms[0].beta, 2.0);

        bandit.decay(1.0);
        assert_eq!(bandit.snapshot()[0].alpha, 7.0);
    }

    #[test]
    fn test_state_and_reset() {
        let mut bandit = Bandit::with_seed(&CHAINS, 2.0, 1).unwrap();
        bandit.update(Chain::Base, false);
        bandit.choose_chain();

        let state = bandit.state();
        assert!((state[0].estimated_win_rate - 0.4).abs() < 1e-12);
        // α=2, β=3: var = 6 / (25 · 6) = 0.04 → width 0.392
        assert!((state[0].confidence - (1.0 - 0.392)).abs() < 1e-9);
        assert_eq!(bandit.history().count(), 1);

        bandit.reset_chain(Chain::Base);
        assert_eq!(bandit.snapshot()[0].beta, 2.0);

        bandit.update(Chain::Arbitrum, true);
        bandit.reset_all();
        assert!(bandit.snapshot().iter().all(|a| a.alpha == 2.0 && a.beta == 2.0));
        assert_eq!(bandit.history().count(), 0);
    }

    #[test]
    fn test_restore_ignores_unknown_and_invalid() {
        let mut bandit = Bandit::with_seed(&CHAINS, 2.0, 1).unwrap();
        bandit.restore(&[
            BanditArm { chain: Chain::Base, alpha: 9.0, beta: 4.0 },
            BanditArm { chain: Chain::Polygon, alpha: 9.0, beta: 4.0 },
            BanditArm { chain: Chain::Optimism, alpha: -1.0, beta: 4.0 },
        ]);

        let arms = bandit.snapshot();
        assert_eq!(arms.len(), 3);
        assert_eq!((arms[0].alpha, arms[0].beta), (9.0, 4.0));
        assert_eq!((arms[2].alpha, arms[2].beta), (2.0, 2.0));
    }

    #[test]
    fn test_update_unknown_chain_is_ignored() {
        let mut bandit = Bandit::with_seed(&CHAINS, 2.0, 1).unwrap();
        bandit.update(Chain::Polygon, true);
        assert!(bandit.snapshot().iter().all(|a| a.alpha == 2.0));
    }
}
