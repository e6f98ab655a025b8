//! Coordination index: a 0-100 score of how deeply the club cooperates,
//! and the market-effect multipliers derived from it.
//!
//! | Component            | Max | Source                                  |
//! |----------------------|-----|-----------------------------------------|
//! | Coalition size       | 40  | 8 points per member                     |
//! | Supermajority rate   | 30  | passed votes among the last 4 turns     |
//! | Standards alignment  | 20  | joint MRV in force                      |
//! | Reciprocity          | 10  | delivered / promised across the escrow  |

use club_types::{
    CoalitionType, CoordinationComponents, CoordinationEffects, CoordinationIndex, GameState,
};

/// Ceiling of the coalition size component.
pub const COALITION_SIZE_MAX: f64 = 40.0;

/// Ceiling of the supermajority rate component.
pub const SUPERMAJORITY_RATE_MAX: f64 = 30.0;

/// Ceiling of the standards alignment component.
pub const STANDARDS_ALIGNMENT_MAX: f64 = 20.0;

/// Ceiling of the reciprocity component.
pub const RECIPROCITY_MAX: f64 = 10.0;

/// Ceiling of the index.
pub const INDEX_MAX: f64 = 100.0;

/// Points per seated member.
const POINTS_PER_MEMBER: f64 = 8.0;

/// History entries considered for the supermajority rate.
const SUPERMAJORITY_WINDOW: usize = 4;

/// Compute the index for `state`.
pub fn compute(state: &GameState) -> CoordinationIndex {
    let components = CoordinationComponents {
        coalition_size: coalition_size(state),
        supermajority_rate: supermajority_rate(state),
        standards_alignment: standards_alignment(state),
        reciprocity: reciprocity(state),
    };
    let sum = components.coalition_size
        + components.supermajority_rate
        + components.standards_alignment
        + components.reciprocity;
    let value = sanitize(sum).min(INDEX_MAX);
    CoordinationIndex {
        value,
        components,
        effects: effects(value, state.floor),
    }
}

/// Coalition size component, `min(40, 8 * members)`.
#[allow(clippy::cast_precision_loss)] // member counts are tiny
pub fn coalition_size(state: &GameState) -> f64 {
    (state.members.len() as f64 * POINTS_PER_MEMBER).min(COALITION_SIZE_MAX)
}

/// Supermajority rate component: passed votes among the newest four
/// history entries, scaled to 30.
#[allow(clippy::cast_precision_loss)]
pub fn supermajority_rate(state: &GameState) -> f64 {
    let passed = state
        .history
        .iter()
        .take(SUPERMAJORITY_WINDOW)
        .filter(|h| h.supermajority_passed)
        .count();
    passed as f64 / SUPERMAJORITY_WINDOW as f64 * SUPERMAJORITY_RATE_MAX
}

/// Standards alignment component: 20 while joint MRV (or an active MRV
/// coalition record) is in force.
pub fn standards_alignment(state: &GameState) -> f64 {
    let mrv_record = state
        .coalitions
        .iter()
        .any(|c| c.kind == CoalitionType::Mrv && c.active);
    if state.joint_mrv_active || mrv_record {
        STANDARDS_ALIGNMENT_MAX
    } else {
        0.0
    }
}

/// Reciprocity component, `min(10, 10 * delivered / promised)` over the
/// whole escrow; 0 when nothing was promised.
pub fn reciprocity(state: &GameState) -> f64 {
    let (promised, delivered) = state
        .reciprocity_escrow
        .values()
        .fold((0.0, 0.0), |(p, d), e| (p + sanitize(e.promised), d + sanitize(e.delivered)));
    if promised <= 0.0 {
        return 0.0;
    }
    (delivered / promised * RECIPROCITY_MAX).clamp(0.0, RECIPROCITY_MAX)
}

/// Market effects of index `index` at floor `floor`.
pub fn effects(index: f64, floor: f64) -> CoordinationEffects {
    let index = sanitize(index).clamp(0.0, INDEX_MAX);
    CoordinationEffects {
        private_demand_multiplier: 0.01f64.mul_add(index.sqrt(), 1.0),
        trust_premium_usd: 0.05 * (index / INDEX_MAX) * sanitize(floor),
        volatility_multiplier: 0.003f64.mul_add(-index, 1.0).max(0.05),
        intervention_prob_multiplier: 1.0 - (0.0035 * index).min(0.35),
    }
}

/// Lower `index` by `rate`, floored at 0.
pub fn decay(index: f64, rate: f64) -> f64 {
    (sanitize(index) - sanitize(rate)).max(0.0)
}

/// Qualitative label for `index`.
pub fn describe(index: f64) -> &'static str {
    if index >= 80.0 {
        "Excellent"
    } else if index >= 60.0 {
        "Strong"
    } else if index >= 40.0 {
        "Moderate"
    } else if index >= 20.0 {
        "Weak"
    } else {
        "Minimal"
    }
}

/// One component line of a [`Breakdown`].
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLine {
    /// Display name.
    pub name: &'static str,
    /// Current value.
    pub value: f64,
    /// Ceiling.
    pub max: f64,
    /// Short explanation.
    pub description: String,
}

/// One effect line of a [`Breakdown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectLine {
    /// Display name.
    pub name: &'static str,
    /// Formatted value.
    pub value: String,
    /// Short explanation.
    pub description: &'static str,
}

/// Display-ready view of the index.
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    /// Index value.
    pub total: f64,
    /// Qualitative label.
    pub description: &'static str,
    /// Component lines with their ceilings.
    pub components: Vec<ComponentLine>,
    /// Formatted effect lines.
    pub effects: Vec<EffectLine>,
}

/// Build a [`Breakdown`] of the index for `state`.
pub fn breakdown(state: &GameState) -> Breakdown {
    let index = compute(state);
    let c = index.components;
    let e = index.effects;
    Breakdown {
        total: index.value,
        description: describe(index.value),
        components: vec![
            ComponentLine {
                name: "Coalition Size",
                value: c.coalition_size,
                max: COALITION_SIZE_MAX,
                description: format!("{} members", state.members.len()),
            },
            ComponentLine {
                name: "Supermajority Rate",
                value: c.supermajority_rate,
                max: SUPERMAJORITY_RATE_MAX,
                description: "Last 4 turns".to_owned(),
            },
            ComponentLine {
                name: "Standards Alignment",
                value: c.standards_alignment,
                max: STANDARDS_ALIGNMENT_MAX,
                description: if state.joint_mrv_active {
                    "Joint MRV active".to_owned()
                } else {
                    "No joint MRV".to_owned()
                },
            },
            ComponentLine {
                name: "Reciprocity",
                value: c.reciprocity,
                max: RECIPROCITY_MAX,
                description: "Promises delivered".to_owned(),
            },
        ],
        effects: vec![
            EffectLine {
                name: "Private Demand",
                value: format!("{:.1}%", (e.private_demand_multiplier - 1.0) * 100.0),
                description: "Boost to private capital participation",
            },
            EffectLine {
                name: "Trust Premium",
                value: format!("${:.2}/t", e.trust_premium_usd),
                description: "Market premium from credible commitment",
            },
            EffectLine {
                name: "Volatility",
                value: format!("{:.1}%", (1.0 - e.volatility_multiplier) * 100.0),
                description: "Reduction in market volatility",
            },
            EffectLine {
                name: "Intervention Risk",
                value: format!("{:.1}%", (1.0 - e.intervention_prob_multiplier) * 100.0),
                description: "Reduction in CQE intervention probability",
            },
        ],
    }
}

/// Base market parameters before coordination effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketParams {
    /// Private demand before the multiplier.
    pub base_private_demand: f64,
    /// Volatility before the multiplier.
    pub base_volatility: f64,
    /// Intervention probability before the multiplier.
    pub base_intervention_prob: f64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            base_private_demand: 0.0,
            base_volatility: 1.0,
            base_intervention_prob: 0.2,
        }
    }
}

/// Market parameters after coordination effects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjustedMarketParams {
    /// Adjusted private demand.
    pub private_demand: f64,
    /// Adjusted volatility.
    pub volatility: f64,
    /// Adjusted intervention probability.
    pub intervention_prob: f64,
    /// Trust premium in US dollars per tonne.
    pub trust_premium: f64,
}

/// Map `params` through the last computed index, or pass them through
/// unchanged when no index has been computed yet.
pub fn apply_effects(index: Option<&CoordinationIndex>, params: MarketParams) -> AdjustedMarketParams {
    match index {
        Some(idx) => AdjustedMarketParams {
            private_demand: params.base_private_demand * idx.effects.private_demand_multiplier,
            volatility: params.base_volatility * idx.effects.volatility_multiplier,
            intervention_prob: params.base_intervention_prob
                * idx.effects.intervention_prob_multiplier,
            trust_premium: idx.effects.trust_premium_usd,
        },
        None => AdjustedMarketParams {
            private_demand: params.base_private_demand,
            volatility: params.base_volatility,
            intervention_prob: params.base_intervention_prob,
            trust_premium: 0.0,
        },
    }
}

const fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
