//! Per-wallet action odds: jittered off a base distribution at load
//! time, then consumed by a cumulative draw for every action.

use crate::stealth;
use crate::types::ActionKind;
use serde::{Deserialize, Serialize};

/// Base action distribution from configuration, integer percent.
/// Must sum to exactly 100; validation rejects anything else.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActionProbabilities {
    pub send: u32,
    pub idle: u32,
    pub balance_check: u32,
}

impl ActionProbabilities {
    pub fn sum(&self) -> u32 {
        self.send + self.idle + self.balance_check
    }
}

impl Default for ActionProbabilities {
    fn default() -> Self {
        Self {
            send: 60,
            idle: 20,
            balance_check: 20,
        }
    }
}

/// A wallet's personal session distribution, percent, summing to 100.
/// Fixed for the wallet's lifetime until reload or persona-mode change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionProbabilities {
    pub send: f64,
    pub idle: f64,
    pub balance_check: f64,
}

/// Apply bounded random jitter to the base distribution and renormalize
/// so the three probabilities sum to 100 again.
///
/// For each base percentage p: p' = max(0, p + uniform(-j, j) * p) with
/// j = jitter_factor_pct / 100.
pub fn compute_session_probabilities(
    base: &ActionProbabilities,
    jitter_factor_pct: u32,
) -> SessionProbabilities {
    let jitter = f64::from(jitter_factor_pct) / 100.0;

    let jittered = |p: u32| -> f64 {
        let p = f64::from(p);
        (p + stealth::uniform(-jitter, jitter) * p).max(0.0)
    };

    let send = jittered(base.send);
    let idle = jittered(base.idle);
    let balance_check = jittered(base.balance_check);

    let sum = send + idle + balance_check;
    if sum <= 0.0 {
        // All-zero base triples are rejected by validation; keep a sane
        // fallback anyway so a draw can never divide by zero.
        return SessionProbabilities {
            send: 0.0,
            idle: 100.0,
            balance_check: 0.0,
        };
    }

    SessionProbabilities {
        send: send / sum * 100.0,
        idle: idle / sum * 100.0,
        balance_check: balance_check / sum * 100.0,
    }
}

/// Cumulative-probability draw over the wallet's session distribution.
/// Floating-point drift that leaves the draw unmatched falls back to idle.
pub fn choose_action(probs: &SessionProbabilities) -> ActionKind {
    let roll = stealth::uniform(0.0, 100.0);
    let mut cumulative = 0.0;

    cumulative += probs.send;
    if roll < cumulative {
        return ActionKind::Send;
    }
    cumulative += probs.idle;
    if roll < cumulative {
        return ActionKind::Idle;
    }
    cumulative += probs.balance_check;
    if roll < cumulative {
        return ActionKind::BalanceCheck;
    }
    ActionKind::Idle
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sums_to_100(probs: &SessionProbabilities) {
        let sum = probs.send + probs.idle + probs.balance_check;
        assert!((sum - 100.0).abs() < 1e-9, "sum was {}", sum);
    }

    #[test]
    fn test_zero_jitter_preserves_base_exactly() {
        let base = ActionProbabilities {
            send: 60,
            idle: 20,
            balance_check: 20,
        };
        for _ in 0..50 {
            let probs = compute_session_probabilities(&base, 0);
            assert_eq!(probs.send, 60.0);
            assert_eq!(probs.idle, 20.0);
            assert_eq!(probs.balance_check, 20.0);
        }
    }

    #[test]
    fn test_jittered_probabilities_renormalize() {
        let base = ActionProbabilities {
            send: 70,
            idle: 10,
            balance_check: 20,
        };
        for jitter in [0, 1, 5, 25, 50, 100] {
            for _ in 0..200 {
                let probs = compute_session_probabilities(&base, jitter);
                assert_sums_to_100(&probs);
                assert!(probs.send >= 0.0);
                assert!(probs.idle >= 0.0);
                assert!(probs.balance_check >= 0.0);
            }
        }
    }

    #[test]
    fn test_lopsided_base_survives_jitter() {
        let base = ActionProbabilities {
            send: 100,
            idle: 0,
            balance_check: 0,
        };
        let probs = compute_session_probabilities(&base, 100);
        assert_sums_to_100(&probs);
        assert_eq!(probs.idle, 0.0);
        assert_eq!(probs.balance_check, 0.0);
    }

    #[test]
    fn test_choose_action_respects_certainty() {
        let all_send = SessionProbabilities {
            send: 100.0,
            idle: 0.0,
            balance_check: 0.0,
        };
        let all_check = SessionProbabilities {
            send: 0.0,
            idle: 0.0,
            balance_check: 100.0,
        };
        for _ in 0..100 {
            assert_eq!(choose_action(&all_send), ActionKind::Send);
            assert_eq!(choose_action(&all_check), ActionKind::BalanceCheck);
        }
    }

    #[test]
    fn test_choose_action_falls_back_to_idle() {
        // Degenerate distribution that no roll can match.
        let none = SessionProbabilities {
            send: 0.0,
            idle: 0.0,
            balance_check: 0.0,
        };
        assert_eq!(choose_action(&none), ActionKind::Idle);
    }
}
