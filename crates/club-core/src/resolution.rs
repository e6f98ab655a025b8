//! Turn resolution: the ordered pipeline that closes one turn.
//!
//! Every resolved turn runs these steps, in this order:
//!
//! 1. **Admission** -- reset incoming supply, admit the resolving player.
//! 2. **Ballots** -- GDP-weighted floor tally, uniform project draw.
//! 3. **Project** -- apply the funded project and its consensus reward.
//! 4. **Event** -- draw one catalog event and apply its operations.
//! 5. **Clamps** -- bound visible swings against the client's last view.
//! 6. **Guidance** -- honor or reject the floor change.
//! 7. **Coalitions** -- dividend, decay, coordination index.
//! 8. **Market** -- the single market move with floor defense.
//! 9. **Capital** -- private share reaction.
//! 10. **History** -- record the turn, newest first.
//! 11. **Advance** -- next period, fresh offers, cleared ballots.
//!
//! Reordering the steps changes outcomes. The pipeline never fails: bad
//! data degrades to a zero effect and is logged.

use std::collections::BTreeMap;

use chrono::Utc;
use club_types::{
    CountryCode, EventDefinition, EventOperation, EventSnapshot, FloorDecision, GameState,
    HistoryEntry, ObservedIndicators, StatOperation, StatOperator,
};
use tracing::{debug, info, warn};

use crate::catalog::{self, CatalogStore};
use crate::coalition::CoalitionManager;
use crate::config::ClubConfig;
use crate::coordination;
use crate::market::{self, Baseline, GuidanceOutcome, MarketModifiers, MarketMove};
use crate::weighting::{self, FloorTally, GdpSource};

/// History placeholder when a turn had no event or funded no project.
pub const NO_ENTRY: &str = "none";

/// Collaborators borrowed for one resolution.
pub struct ResolutionContext<'a, R: rand::Rng> {
    /// Engine configuration.
    pub config: &'a ClubConfig,
    /// Project and event catalog; upgrades are written through it.
    pub catalog: &'a mut dyn CatalogStore,
    /// GDP lookup for admissions.
    pub gdp: &'a dyn GdpSource,
    /// Randomness for draws.
    pub rng: &'a mut R,
}

/// Caller-supplied inputs of a resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveInput {
    /// Indicators the resolving client last displayed.
    pub observed: ObservedIndicators,
    /// Country of the resolving client, admitted if new.
    pub player_country: Option<CountryCode>,
}

/// Summary of one resolved turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// The turn that was closed.
    pub turn: u32,
    /// Year of the closed turn.
    pub year: u32,
    /// Quarter of the closed turn.
    pub quarter: u8,
    /// Floor vote tally.
    pub floor_tally: FloorTally,
    /// What guidance did with the decision.
    pub guidance: GuidanceOutcome,
    /// Funded project id, if any.
    pub project: Option<String>,
    /// Mitigation added this turn.
    pub mitigation: f64,
    /// Reward multiplier applied.
    pub r_multiplier: f64,
    /// XCR awarded this turn.
    pub xcr_awarded: f64,
    /// The drawn event.
    pub event: Option<EventSnapshot>,
    /// Whether a supermajority dividend was armed.
    pub dividend_applied: bool,
    /// Surges that expired this turn.
    pub expired_surges: Vec<String>,
    /// Coordination index after the coalition step.
    pub coordination_index: f64,
    /// The market move.
    pub market: MarketMove,
    /// Fields coerced from non-finite values before the pipeline ran.
    pub coerced: Vec<&'static str>,
}

/// Effects of the funded project.
struct ProjectEffect {
    /// Funded project id.
    id: Option<String>,
    /// Mitigation added.
    mitigation: f64,
    /// Reward multiplier.
    r_multiplier: f64,
    /// XCR awarded.
    reward: f64,
}

impl ProjectEffect {
    const NONE: Self = Self {
        id: None,
        mitigation: 0.0,
        r_multiplier: 1.0,
        reward: 0.0,
    };
}

/// Resolve the live turn of `state` in place.
pub fn resolve<R: rand::Rng>(
    state: &mut GameState,
    ctx: &mut ResolutionContext<'_, R>,
    input: &ResolveInput,
) -> TurnReport {
    let config = ctx.config;
    let calendar = config.calendar();
    calendar.sync_period(state);
    let coerced = market::sanitize(state);
    let baseline = Baseline::resolve(&input.observed, Baseline::capture(state));

    let turn = state.turn;
    let year = state.year;
    let quarter = state.quarter;
    info!(turn, year, quarter, "Turn resolution started");

    // --- Step 1: Admission ---
    state.incoming_supply = 0.0;
    if let Some(country) = &input.player_country {
        if weighting::admit_member(&mut state.members, country, ctx.gdp) {
            info!(turn, %country, "Resolving player admitted to the club");
        }
    }

    // --- Step 2: Ballots ---
    let ballots: Vec<(CountryCode, FloorDecision)> = state
        .current_submissions()
        .map(|s| (s.country.clone(), s.floor_decision))
        .collect();
    let floor_tally = weighting::aggregate_floor(&ballots, &state.members, &config.voting);
    info!(
        turn,
        decision = %floor_tally.decision,
        share = floor_tally.share,
        passed = floor_tally.passed,
        ballots = ballots.len(),
        "Floor vote tallied"
    );
    let chosen = weighting::draw_project(
        state
            .current_submissions()
            .filter_map(|s| s.chosen_project_id.as_deref()),
        ctx.rng,
    );

    // --- Step 3: Project ---
    let project = apply_project(state, &*ctx.catalog, chosen);

    // --- Step 4: Event ---
    let event = catalog::random_event(&*ctx.catalog, ctx.rng);
    let justified = event.as_ref().is_some_and(|e| e.justified);
    if let Some(event) = &event {
        apply_event(state, ctx.catalog, event);
    }
    state.last_event = event.as_ref().map(EventSnapshot::of);

    // --- Step 5: Clamps ---
    market::clamp_to_baseline(state, &baseline, &config.clamps);

    // --- Step 6: Guidance ---
    let guidance =
        market::apply_floor_guidance(state, floor_tally.decision, justified, &config.guidance);

    // --- Step 7: Coalitions ---
    let (dividend_applied, expired_surges) = {
        let mut coalitions = CoalitionManager::new(
            state,
            &config.coalition,
            config.clamps.credibility_max,
        );
        let armed = floor_tally.passed && floor_tally.decision.is_change();
        if armed {
            coalitions.apply_supermajority_dividend();
        }
        let expired = coalitions.decay_all();
        (armed, expired)
    };
    let index = coordination::compute(state);
    let coordination_index = index.value;
    debug!(turn, index = coordination_index, "Coordination index computed");
    state.coordination_index = Some(index);

    // --- Step 8: Market ---
    market::enforce_invariants(state, &config.guidance, &config.clamps);
    let modifiers = MarketModifiers::from_state(state, config.market.apply_coordination_effects);
    let market_move = market::move_market(state, &config.market, modifiers);

    // --- Step 9: Capital ---
    market::react_private_capital(state, &config.capital);
    market::enforce_invariants(state, &config.guidance, &config.clamps);

    // --- Step 10: History ---
    state.history.insert(
        0,
        HistoryEntry {
            turn,
            year,
            quarter,
            event: state
                .last_event
                .as_ref()
                .map_or_else(|| NO_ENTRY.to_owned(), |e| e.title.clone()),
            project: project.id.clone().unwrap_or_else(|| NO_ENTRY.to_owned()),
            floor: state.floor,
            market: state.market,
            mitigation: project.mitigation,
            xcr_awarded: project.reward,
            r_multiplier: project.r_multiplier,
            inflation: state.inflation,
            guidance_broken: guidance.is_broken(),
            supermajority_passed: floor_tally.passed,
            time: Utc::now(),
        },
    );
    state.history.truncate(config.game.history_limit);

    // --- Step 11: Advance ---
    calendar.advance(state, turn);
    state.projects = catalog::draw_projects(&*ctx.catalog, config.game.projects_per_round, ctx.rng);
    state.turn_submissions.retain(|s| s.turn > turn);
    state.project_r_adjustments.clear();

    info!(
        turn,
        next_turn = state.turn,
        floor = state.floor,
        market = state.market,
        credibility = state.credibility,
        private_share = state.private_share,
        "Turn committed"
    );

    TurnReport {
        turn,
        year,
        quarter,
        floor_tally,
        guidance,
        project: project.id,
        mitigation: project.mitigation,
        r_multiplier: project.r_multiplier,
        xcr_awarded: project.reward,
        event: state.last_event.clone(),
        dividend_applied,
        expired_surges,
        coordination_index,
        market: market_move,
        coerced,
    }
}

/// Step 3: apply the funded project's mitigation, sentiment and supply, and
/// award its reward.
fn apply_project(
    state: &mut GameState,
    catalog: &dyn CatalogStore,
    chosen: Option<String>,
) -> ProjectEffect {
    let Some(id) = chosen else {
        debug!(turn = state.turn, "No project nominated");
        return ProjectEffect::NONE;
    };
    let offer = state
        .projects
        .iter()
        .find(|p| p.id == id)
        .cloned()
        .or_else(|| catalog.project_by_id(&id));
    let Some(project) = offer else {
        warn!(turn = state.turn, project = %id, "Unknown project id, no project effect");
        return ProjectEffect::NONE;
    };

    let mitigation = finite_or_zero(project.co2e_mitigation).max(0.0);
    state.total_mitigation += mitigation;
    state.sentiment += finite_or_zero(project.sentiment_effect);
    state.incoming_supply += finite_or_zero(project.supply_pressure);

    let r_multiplier = consensus_multiplier(state.project_r_adjustments.get(&id));
    let reward = finite_or_zero(project.xcr_bid) * r_multiplier;
    state.cumulative_xcr += reward;

    info!(
        turn = state.turn,
        project = %id,
        mitigation,
        r_multiplier,
        reward,
        "Project funded"
    );
    ProjectEffect {
        id: Some(id),
        mitigation,
        r_multiplier,
        reward,
    }
}

/// The agreed reward multiplier: the common value when every proposal is
/// equal, otherwise 1.0.
pub fn consensus_multiplier(proposals: Option<&BTreeMap<CountryCode, f64>>) -> f64 {
    let mut values = proposals
        .into_iter()
        .flat_map(BTreeMap::values)
        .copied()
        .filter(|v| v.is_finite());
    let Some(first) = values.next() else {
        return 1.0;
    };
    if values.all(|v| (v - first).abs() <= f64::EPSILON) {
        first
    } else {
        1.0
    }
}

/// Step 4: apply every operation of `event`.
fn apply_event(state: &mut GameState, catalog: &mut dyn CatalogStore, event: &EventDefinition) {
    info!(
        turn = state.turn,
        event = %event.id,
        justified = event.justified,
        "Event drawn"
    );
    for op in &event.operations {
        match op {
            EventOperation::Stat(stat) => apply_stat(state, stat),
            EventOperation::ProjectUpgrade(upgrade) => {
                if catalog.mutate_project(upgrade) {
                    debug!(project = %upgrade.project_id, "Project upgraded in catalog");
                } else {
                    warn!(project = %upgrade.project_id, "Upgrade targets unknown project");
                }
            }
        }
    }
}

/// Apply a single stat operation. Non-finite operands are skipped.
pub fn apply_stat(state: &mut GameState, op: &StatOperation) {
    if op.target.is_empty() {
        warn!("Stat operation without a target skipped");
        return;
    }
    if !op.value.is_finite() {
        warn!(target = %op.target, "Non-finite stat operand skipped");
        return;
    }
    let current = finite_or_zero(state.stat(&op.target));
    let next = StatOperator::parse(&op.operation).apply(current, op.value);
    if next.is_finite() {
        state.set_stat(&op.target, next);
    } else {
        warn!(target = %op.target, "Stat operation produced a non-finite value, skipped");
    }
}

const fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
