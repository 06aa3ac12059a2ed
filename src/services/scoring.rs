//! Speed-based point computation and leaderboard ranking.

use crate::dao::models::PlayerEntity;

/// Points granted for any correct answer, however late.
pub const BASE_POINTS: u32 = 100;
/// Extra points available for an instantaneous correct answer.
pub const SPEED_BONUS_POINTS: u32 = 100;

/// Points for a correct answer submitted `latency_ms` after the question started.
///
/// The result always lies in `[100, 200]`: a zero latency earns the full bonus, a latency at or
/// beyond the budget earns the base points only.
pub fn speed_points(latency_ms: u64, budget_ms: u64) -> u32 {
    let factor = if budget_ms == 0 {
        0.0
    } else {
        let remaining = budget_ms.saturating_sub(latency_ms) as f64;
        (remaining / budget_ms as f64).clamp(0.0, 1.0)
    };
    (BASE_POINTS as f64 + factor * SPEED_BONUS_POINTS as f64).round() as u32
}

/// Points awarded to one graded answer.
pub fn points(is_correct: bool, latency_ms: u64, budget_ms: u64) -> u32 {
    if is_correct {
        speed_points(latency_ms, budget_ms)
    } else {
        0
    }
}

/// A player together with their 1-based leaderboard position.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPlayer {
    /// 1-based position, ties broken by join order.
    pub rank: u32,
    /// Ranked player record.
    pub player: PlayerEntity,
}

/// Rank players by total score, highest first.
///
/// `players` is expected in join order; the sort is stable so ties keep that order.
pub fn leaderboard(mut players: Vec<PlayerEntity>) -> Vec<RankedPlayer> {
    players.sort_by(|a, b| b.total_score.cmp(&a.total_score));
    players
        .into_iter()
        .enumerate()
        .map(|(index, player)| RankedPlayer {
            rank: index as u32 + 1,
            player,
        })
        .collect()
}
