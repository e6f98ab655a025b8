//! Economic update steps of a turn.
//!
//! Each function mutates one slice of the state document and is called by
//! the resolution pipeline in a fixed order: swing clamps, floor guidance,
//! the single market move with floor defense, then the private capital
//! reaction. [`sanitize`] and [`enforce_invariants`] bracket the sequence so
//! no NaN or out-of-range value survives a turn.

use club_types::{FloorDecision, GameState, ObservedIndicators, StatField};
use tracing::{debug, info, warn};

use crate::config::{CapitalConfig, ClampConfig, GuidanceConfig, MarketConfig};

/// Indicator values a swing clamp is measured against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    /// Sentiment.
    pub sentiment: f64,
    /// Private share.
    pub private_share: f64,
    /// Inflation.
    pub inflation: f64,
}

impl Baseline {
    /// Capture the server's current values.
    pub const fn capture(state: &GameState) -> Self {
        Self {
            sentiment: state.sentiment,
            private_share: state.private_share,
            inflation: state.inflation,
        }
    }

    /// Prefer the client's observed values, falling back to `server` for
    /// anything missing or non-finite.
    pub fn resolve(observed: &ObservedIndicators, server: Self) -> Self {
        let pick = |value: Option<f64>, fallback: f64| {
            value.filter(|v| v.is_finite()).unwrap_or(fallback)
        };
        Self {
            sentiment: pick(observed.sentiment, server.sentiment),
            private_share: pick(observed.private_share, server.private_share),
            inflation: pick(observed.inflation, server.inflation),
        }
    }
}

/// Bound this turn's visible swings relative to `baseline`.
///
/// Sentiment and private share move at most their step either way;
/// inflation is only limited on the way up.
pub fn clamp_to_baseline(state: &mut GameState, baseline: &Baseline, clamps: &ClampConfig) {
    state.sentiment = state.sentiment.clamp(
        baseline.sentiment - clamps.sentiment_step,
        baseline.sentiment + clamps.sentiment_step,
    );
    state.private_share = state.private_share.clamp(
        baseline.private_share - clamps.private_share_step,
        baseline.private_share + clamps.private_share_step,
    );
    state.inflation = state.inflation.min(baseline.inflation + clamps.inflation_step);
}

/// What forward guidance did with the resolved floor decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceOutcome {
    /// The decision was `hold`; nothing changed.
    Held,
    /// The change was honored.
    Honored(FloorDecision),
    /// The change came too soon after the last one and was rejected.
    Broken(FloorDecision),
}

impl GuidanceOutcome {
    /// Whether guidance was broken.
    pub const fn is_broken(self) -> bool {
        matches!(self, Self::Broken(_))
    }
}

/// Apply the floor forward-guidance rule.
///
/// A non-hold decision is honored when at least `cooldown_turns` turns
/// passed since the last change, or when the drawn event is justified.
/// A rejected change costs credibility and private share.
pub fn apply_floor_guidance(
    state: &mut GameState,
    decision: FloorDecision,
    event_justified: bool,
    guidance: &GuidanceConfig,
) -> GuidanceOutcome {
    if !decision.is_change() {
        return GuidanceOutcome::Held;
    }
    let turns_since = state.turn.saturating_sub(state.last_floor_change_turn);
    if turns_since >= guidance.cooldown_turns || event_justified {
        match decision {
            FloorDecision::Raise => state.floor += state.floor_step,
            FloorDecision::Lower => {
                state.floor = (state.floor - state.floor_step).max(guidance.min_floor);
            }
            FloorDecision::Hold => {}
        }
        state.last_floor_change_turn = state.turn;
        info!(
            turn = state.turn,
            %decision,
            floor = state.floor,
            justified = event_justified,
            "Floor change honored"
        );
        GuidanceOutcome::Honored(decision)
    } else {
        state.credibility = (state.credibility - guidance.credibility_penalty).max(0.0);
        state.private_share = (state.private_share - guidance.private_share_penalty).max(0.0);
        warn!(
            turn = state.turn,
            %decision,
            turns_since,
            credibility = state.credibility,
            "Forward guidance broken"
        );
        GuidanceOutcome::Broken(decision)
    }
}

/// Optional scaling of the market move by coordination effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketModifiers {
    /// Multiplier on the sentiment/supply drift.
    pub volatility_multiplier: f64,
    /// Multiplier on the CQE purchase.
    pub intervention_multiplier: f64,
}

impl Default for MarketModifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl MarketModifiers {
    /// Modifiers that leave the move unchanged.
    pub const NEUTRAL: Self = Self {
        volatility_multiplier: 1.0,
        intervention_multiplier: 1.0,
    };

    /// Modifiers derived from the state's coordination index and dividend.
    ///
    /// Neutral when `enabled` is false or no index has been computed.
    pub fn from_state(state: &GameState, enabled: bool) -> Self {
        if !enabled {
            return Self::NEUTRAL;
        }
        let Some(index) = state.coordination_index.as_ref() else {
            return Self::NEUTRAL;
        };
        let dividend = &state.supermajority_dividend;
        let dividend_multiplier = if dividend.active && dividend.intervention_multiplier > 0.0 {
            dividend.intervention_multiplier
        } else {
            1.0
        };
        Self {
            volatility_multiplier: index.effects.volatility_multiplier,
            intervention_multiplier: index.effects.intervention_prob_multiplier
                * dividend_multiplier,
        }
    }
}

/// Outcome of the market move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketMove {
    /// Market price before any intervention.
    pub pre_intervention: f64,
    /// Central-bank purchase (0 when no intervention).
    pub cqe_buy: f64,
    /// Whether the floor had to be defended.
    pub intervened: bool,
}

/// Move the market once and defend the floor.
///
/// `market += sentiment * k_s - min(supply, cap) * k_q`, scaled by the
/// volatility modifier. Below the floor, CQE buys the gap scaled by the
/// public share, the market is pinned to the floor, and inflation rises
/// with the purchase.
pub fn move_market(
    state: &mut GameState,
    market: &MarketConfig,
    modifiers: MarketModifiers,
) -> MarketMove {
    let supply = state.incoming_supply.min(market.supply_cap);
    let drift = state
        .sentiment
        .mul_add(market.sentiment_coefficient, -(supply * market.supply_coefficient));
    let pre_intervention = drift.mul_add(modifiers.volatility_multiplier, state.market);

    state.cqe_buy = 0.0;
    if pre_intervention < state.floor {
        let gap = state.floor - pre_intervention;
        let raw = gap * (1.0 - state.private_share) * modifiers.intervention_multiplier;
        state.cqe_buy = raw.max(0.0);
        state.market = state.floor;
        state.inflation = state
            .cqe_buy
            .mul_add(market.cqe_inflation_coefficient, state.inflation);
        info!(
            turn = state.turn,
            gap,
            cqe_buy = state.cqe_buy,
            floor = state.floor,
            "CQE intervention defended the floor"
        );
        MarketMove {
            pre_intervention,
            cqe_buy: state.cqe_buy,
            intervened: true,
        }
    } else {
        state.market = pre_intervention;
        debug!(turn = state.turn, market = state.market, "Market moved");
        MarketMove {
            pre_intervention,
            cqe_buy: 0.0,
            intervened: false,
        }
    }
}

/// Let private capital react to sentiment, inflation and credibility.
pub fn react_private_capital(state: &mut GameState, capital: &CapitalConfig) {
    let delta = capital.sentiment_coefficient * state.sentiment
        - capital.inflation_coefficient * state.inflation
        + capital.credibility_coefficient * (state.credibility - capital.credibility_pivot);
    state.private_share = (state.private_share + delta).clamp(0.0, 1.0);
}

/// Replace NaN and infinite numeric fields with 0. Returns the keys that
/// were coerced.
pub fn sanitize(state: &mut GameState) -> Vec<&'static str> {
    let mut coerced = Vec::new();
    for field in StatField::ALL {
        if !state.stat_value(field).is_finite() {
            state.set_stat_value(field, 0.0);
            coerced.push(field.key());
        }
    }
    state.custom_stats.retain(|_, v| v.is_finite());
    if !coerced.is_empty() {
        warn!(turn = state.turn, fields = ?coerced, "Non-finite values coerced to 0");
    }
    coerced
}

/// Restore the document invariants: private share in `[0, 1]`, credibility
/// in `[0, credibility_max]`, floor at or above the minimum, a positive floor
/// step, and no negative CQE purchase.
pub fn enforce_invariants(state: &mut GameState, guidance: &GuidanceConfig, clamps: &ClampConfig) {
    sanitize(state);
    state.private_share = state.private_share.clamp(0.0, 1.0);
    state.credibility = state.credibility.clamp(0.0, clamps.credibility_max);
    state.floor = state.floor.max(guidance.min_floor);
    state.cqe_buy = state.cqe_buy.max(0.0);
    if state.floor_step <= 0.0 {
        warn!(floor_step = state.floor_step, "Non-positive floor step reset to default");
        state.floor_step = club_types::state::DEFAULT_FLOOR_STEP;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn baseline_prefers_observed_values() {
        let server = Baseline {
            sentiment: 0.2,
            private_share: 0.7,
            inflation: 1.1,
        };
        let observed = ObservedIndicators {
            sentiment: Some(0.5),
            private_share: None,
            inflation: Some(f64::NAN),
        };
        let b = Baseline::resolve(&observed, server);
        assert!((b.sentiment - 0.5).abs() < f64::EPSILON);
        assert!((b.private_share - 0.7).abs() < f64::EPSILON);
        assert!((b.inflation - 1.1).abs() < f64::EPSILON);
    }

    #[test]
    fn clamps_are_asymmetric_for_inflation() {
        let mut state = GameState {
            sentiment: 1.0,
            private_share: 0.1,
            inflation: 0.2,
            ..GameState::default()
        };
        let baseline = Baseline {
            sentiment: 0.2,
            private_share: 0.7,
            inflation: 1.1,
        };
        clamp_to_baseline(&mut state, &baseline, &ClampConfig::default());
        assert!((state.sentiment - 0.24).abs() < 1e-12);
        assert!((state.private_share - 0.67).abs() < 1e-12);
        // downward inflation moves are not clamped
        assert!((state.inflation - 0.2).abs() < 1e-12);

        state.inflation = 5.0;
        clamp_to_baseline(&mut state, &baseline, &ClampConfig::default());
        assert!((state.inflation - 1.12).abs() < 1e-12);
    }

    #[test]
    fn guidance_rejects_early_change() {
        let mut state = GameState {
            turn: 3,
            last_floor_change_turn: 1,
            credibility: 1.0,
            private_share: 0.7,
            ..GameState::default()
        };
        let outcome =
            apply_floor_guidance(&mut state, FloorDecision::Raise, false, &GuidanceConfig::default());
        assert_eq!(outcome, GuidanceOutcome::Broken(FloorDecision::Raise));
        assert!((state.floor - 80.0).abs() < f64::EPSILON);
        assert!((state.credibility - 0.9).abs() < 1e-12);
        assert!((state.private_share - 0.65).abs() < 1e-12);
        assert_eq!(state.last_floor_change_turn, 1);
    }

    #[test]
    fn guidance_penalties_floor_at_zero() {
        let mut state = GameState {
            turn: 2,
            last_floor_change_turn: 1,
            credibility: 0.05,
            private_share: 0.01,
            ..GameState::default()
        };
        apply_floor_guidance(&mut state, FloorDecision::Lower, false, &GuidanceConfig::default());
        assert!(state.credibility.abs() < f64::EPSILON);
        assert!(state.private_share.abs() < f64::EPSILON);
    }

    #[test]
    fn justified_event_bypasses_cooldown() {
        let mut state = GameState::default();
        let outcome =
            apply_floor_guidance(&mut state, FloorDecision::Raise, true, &GuidanceConfig::default());
        assert_eq!(outcome, GuidanceOutcome::Honored(FloorDecision::Raise));
        assert!((state.floor - 85.0).abs() < f64::EPSILON);
        assert_eq!(state.last_floor_change_turn, 1);
    }

    #[test]
    fn lower_never_goes_below_minimum() {
        let mut state = GameState {
            turn: 10,
            floor: 12.0,
            ..GameState::default()
        };
        apply_floor_guidance(&mut state, FloorDecision::Lower, false, &GuidanceConfig::default());
        assert!((state.floor - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn hold_changes_nothing() {
        let mut state = GameState::default();
        let before = state.clone();
        let outcome =
            apply_floor_guidance(&mut state, FloorDecision::Hold, false, &GuidanceConfig::default());
        assert_eq!(outcome, GuidanceOutcome::Held);
        assert_eq!(state, before);
    }

    #[test]
    fn cqe_pins_market_to_floor() {
        let mut state = GameState {
            market: 70.0,
            floor: 80.0,
            sentiment: -1.0,
            private_share: 0.7,
            inflation: 1.0,
            ..GameState::default()
        };
        let mv = move_market(&mut state, &MarketConfig::default(), MarketModifiers::NEUTRAL);
        assert!(mv.intervened);
        assert!((mv.pre_intervention - 65.0).abs() < 1e-9);
        assert!((state.market - state.floor).abs() < f64::EPSILON);
        assert!((state.cqe_buy - 4.5).abs() < 1e-9);
        assert!((state.inflation - 1.0045).abs() < 1e-9);
    }

    #[test]
    fn supply_shock_is_capped() {
        let mut state = GameState {
            market: 100.0,
            floor: 10.0,
            sentiment: 0.0,
            incoming_supply: 2_000_000.0,
            ..GameState::default()
        };
        let mv = move_market(&mut state, &MarketConfig::default(), MarketModifiers::NEUTRAL);
        assert!(!mv.intervened);
        assert!((state.market - 95.0).abs() < 1e-9);
        assert!(state.cqe_buy.abs() < f64::EPSILON);
    }

    #[test]
    fn negative_supply_lifts_market() {
        let mut state = GameState {
            market: 100.0,
            floor: 10.0,
            sentiment: 0.0,
            incoming_supply: -100_000.0,
            ..GameState::default()
        };
        let mv = move_market(&mut state, &MarketConfig::default(), MarketModifiers::NEUTRAL);
        assert!(!mv.intervened);
        assert!((state.market - 101.0).abs() < 1e-9);
    }

    #[test]
    fn modifiers_scale_move_and_purchase() {
        let mut state = GameState {
            market: 80.0,
            floor: 80.0,
            sentiment: -1.0,
            private_share: 0.5,
            ..GameState::default()
        };
        let modifiers = MarketModifiers {
            volatility_multiplier: 0.5,
            intervention_multiplier: 0.5,
        };
        let mv = move_market(&mut state, &MarketConfig::default(), modifiers);
        assert!((mv.pre_intervention - 77.5).abs() < 1e-9);
        assert!((state.cqe_buy - 0.625).abs() < 1e-9);
        assert!((state.market - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn modifiers_are_neutral_when_disabled() {
        let state = GameState::default();
        assert_eq!(MarketModifiers::from_state(&state, false), MarketModifiers::NEUTRAL);
        assert_eq!(MarketModifiers::from_state(&state, true), MarketModifiers::NEUTRAL);
    }

    #[test]
    fn private_capital_is_clamped() {
        let mut state = GameState {
            private_share: 0.99,
            sentiment: 1.0,
            inflation: 0.0,
            credibility: 50.0,
            ..GameState::default()
        };
        react_private_capital(&mut state, &CapitalConfig::default());
        assert!((state.private_share - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sanitize_coerces_non_finite() {
        let mut state = GameState {
            market: f64::NAN,
            sentiment: f64::INFINITY,
            ..GameState::default()
        };
        let coerced = sanitize(&mut state);
        assert_eq!(coerced, vec!["market", "sentiment"]);
        assert!(state.market.abs() < f64::EPSILON);
    }

    #[test]
    fn invariants_are_restored() {
        let mut state = GameState {
            private_share: 1.4,
            credibility: 150.0,
            floor: 2.0,
            floor_step: -1.0,
            ..GameState::default()
        };
        enforce_invariants(&mut state, &GuidanceConfig::default(), &ClampConfig::default());
        assert!((state.private_share - 1.0).abs() < f64::EPSILON);
        assert!((state.credibility - 100.0).abs() < f64::EPSILON);
        assert!((state.floor - 10.0).abs() < f64::EPSILON);
        assert!((state.floor_step - 5.0).abs() < f64::EPSILON);
    }
}
