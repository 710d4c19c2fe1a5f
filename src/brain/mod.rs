//! The Brain
//!
//! Responsible for:
//! - Choosing which chain to work on (Thompson Sampling bandit)
//! - Turning raw route quotes into a ranked, profit-filtered candidate list
//! - Re-checking the chosen candidate right before execution

mod bandit;
mod candidate;
mod filter;
mod scanner;
mod validator;

pub use bandit::{ArmReport, Bandit, BanditArm, BanditDecision};
pub use candidate::{to_usd, Candidate, QuickScanResult, StrategyResult};
pub use filter::ProfitFilter;
pub use scanner::{find_candidate, quick_scan};
pub use validator::{slippage_bps, validate_candidate, RejectReason, Validation};
