//! Coalition mechanics: supermajority dividends, joint MRV, sector R&D
//! surges, and reciprocity escrows.
//!
//! [`CoalitionManager`] borrows the state document mutably for the duration
//! of one operation. All coalition state lives on [`GameState`]; the manager
//! owns no data of its own.
//!
//! Per resolved turn the orchestrator calls, in order:
//! [`apply_supermajority_dividend`](CoalitionManager::apply_supermajority_dividend)
//! (only when a non-hold vote passed), then
//! [`decay_all`](CoalitionManager::decay_all), then recomputes the
//! coordination index.

use std::collections::BTreeSet;

use club_types::{
    Coalition, CoalitionType, CountryCode, FloorDecision, GameState, JointMrvEffects,
    ReciprocityEntry, RndSurge, SupermajorityDividend,
};
use tracing::{debug, info};

use crate::config::{CoalitionConfig, VotingConfig};
use crate::weighting::{FloorTally, aggregate_floor};

/// Effectiveness of a dividend armed while another is still active.
const CONSECUTIVE_EFFECTIVENESS: f64 = 0.5;

/// Penalty factor for a solo surge or a repeated sector.
const SURGE_PENALTY: f64 = 0.5;

/// Joint MRV effects while an agreement is in force.
const ACTIVE_MRV_EFFECTS: JointMrvEffects = JointMrvEffects {
    channel1_lag_reduction: 0.5,
    channel2_lag_reduction: 0.25,
    channel3_lag_reduction: 0.5,
    fraud_multiplier: 0.5,
    private_demand_boost: 0.075,
};

/// Joint MRV effects with no agreement in force.
const INACTIVE_MRV_EFFECTS: JointMrvEffects = JointMrvEffects {
    channel1_lag_reduction: 0.0,
    channel2_lag_reduction: 0.0,
    channel3_lag_reduction: 0.0,
    fraud_multiplier: 1.0,
    private_demand_boost: 0.0,
};

/// Stateless coalition operations over a borrowed [`GameState`].
pub struct CoalitionManager<'a> {
    state: &'a mut GameState,
    config: &'a CoalitionConfig,
    credibility_max: f64,
}

impl<'a> CoalitionManager<'a> {
    /// Borrow `state` for coalition operations.
    pub const fn new(
        state: &'a mut GameState,
        config: &'a CoalitionConfig,
        credibility_max: f64,
    ) -> Self {
        Self {
            state,
            config,
            credibility_max,
        }
    }

    /// Aggregate floor ballots against the current members.
    pub fn check_supermajority_vote(
        &self,
        ballots: &[(CountryCode, FloorDecision)],
        voting: &VotingConfig,
    ) -> FloorTally {
        aggregate_floor(ballots, &self.state.members, voting)
    }

    // -----------------------------------------------------------------------
    // Supermajority dividend
    // -----------------------------------------------------------------------

    /// Arm the dividend and grant its credibility boost.
    ///
    /// Re-arming while a dividend is still active halves its effectiveness.
    /// Returns the effectiveness used.
    pub fn apply_supermajority_dividend(&mut self) -> f64 {
        let cfg = &self.config.dividend;
        let was_consecutive = self.state.supermajority_dividend.active;
        let effectiveness = if was_consecutive {
            CONSECUTIVE_EFFECTIVENESS
        } else {
            1.0
        };
        let boost = cfg.credibility_boost * effectiveness;

        self.state.supermajority_dividend = SupermajorityDividend {
            active: true,
            credibility_boost: boost,
            intervention_multiplier: 1.0 - (1.0 - cfg.intervention_multiplier) * effectiveness,
            milestone_bonus_pct: cfg.milestone_bonus_pct * effectiveness,
            turns_remaining: cfg.duration_turns,
            was_consecutive,
        };
        self.state.credibility = (self.state.credibility + boost).min(self.credibility_max);

        info!(
            turn = self.state.turn,
            effectiveness,
            boost,
            was_consecutive,
            credibility = self.state.credibility,
            "Supermajority dividend applied"
        );
        effectiveness
    }

    /// Count down the dividend, clearing it when it runs out.
    pub fn decay_supermajority_dividend(&mut self) {
        let dividend = &mut self.state.supermajority_dividend;
        if !dividend.active {
            return;
        }
        dividend.turns_remaining = dividend.turns_remaining.saturating_sub(1);
        if dividend.turns_remaining == 0 {
            *dividend = SupermajorityDividend::default();
            info!(turn = self.state.turn, "Supermajority dividend expired");
        }
    }

    /// Intervention multiplier from the dividend (1.0 when inactive).
    pub fn intervention_multiplier(&self) -> f64 {
        let dividend = &self.state.supermajority_dividend;
        if dividend.active && dividend.intervention_multiplier > 0.0 {
            dividend.intervention_multiplier
        } else {
            1.0
        }
    }

    /// Milestone bonus from the dividend in percent (0 when inactive).
    pub fn milestone_bonus(&self) -> f64 {
        let dividend = &self.state.supermajority_dividend;
        if dividend.active {
            dividend.milestone_bonus_pct
        } else {
            0.0
        }
    }

    // -----------------------------------------------------------------------
    // Joint MRV
    // -----------------------------------------------------------------------

    /// Form a joint MRV agreement.
    ///
    /// Requires at least `mrv_min_members` distinct countries; otherwise
    /// returns `false` and leaves the state untouched.
    pub fn create_joint_mrv(&mut self, members: &[CountryCode]) -> bool {
        let distinct = distinct_members(members);
        if distinct.len() < self.config.mrv_min_members {
            debug!(
                members = distinct.len(),
                required = self.config.mrv_min_members,
                "Joint MRV rejected: not enough distinct members"
            );
            return false;
        }

        let turn = self.state.turn;
        self.state.joint_mrv_active = true;
        self.state.joint_mrv_members.clone_from(&distinct);
        self.state.joint_mrv_start_turn = Some(turn);
        let id = format!("mrv-coalition-{}", self.state.year);
        upsert_coalition(
            &mut self.state.coalitions,
            Coalition {
                id: id.clone(),
                kind: CoalitionType::Mrv,
                members: distinct,
                created_turn: turn,
                active: true,
                auto_renew: true,
                sector: None,
            },
        );
        info!(turn, %id, "Joint MRV formed");
        true
    }

    /// Dissolve the joint MRV agreement.
    pub fn deactivate_joint_mrv(&mut self) {
        self.state.joint_mrv_active = false;
        self.state.joint_mrv_members.clear();
        self.state.joint_mrv_start_turn = None;
        if let Some(record) = self
            .state
            .coalitions
            .iter_mut()
            .find(|c| c.kind == CoalitionType::Mrv && c.active)
        {
            record.active = false;
            info!(turn = self.state.turn, id = %record.id, "Joint MRV dissolved");
        }
    }

    /// Verification, fraud and demand effects of joint MRV.
    pub const fn joint_mrv_effects(&self) -> JointMrvEffects {
        if self.state.joint_mrv_active {
            ACTIVE_MRV_EFFECTS
        } else {
            INACTIVE_MRV_EFFECTS
        }
    }

    // -----------------------------------------------------------------------
    // R&D surges
    // -----------------------------------------------------------------------

    /// Launch a sector R&D surge.
    ///
    /// The base cost reduction (`cost_override` or the configured value) is
    /// halved for a solo surge and halved again when the sector already has
    /// an unexpired surge. Returns `None` when the sector or member list is
    /// empty.
    pub fn create_rnd_surge(
        &mut self,
        sector: &str,
        members: &[CountryCode],
        cost_override: Option<f64>,
    ) -> Option<RndSurge> {
        let sector = sector.trim();
        let members = distinct_members(members);
        if sector.is_empty() || members.is_empty() {
            return None;
        }

        let mut cost_reduction_pct = cost_override
            .filter(|c| c.is_finite() && *c > 0.0)
            .unwrap_or(self.config.rnd.cost_reduction_pct);
        if members.len() < self.config.rnd.min_members {
            cost_reduction_pct *= SURGE_PENALTY;
        }
        let was_repeated = self.active_surge(sector).is_some();
        if was_repeated {
            cost_reduction_pct *= SURGE_PENALTY;
        }

        let turn = self.state.turn;
        let surge = RndSurge {
            id: format!("rnd-{sector}-{turn}"),
            sector: sector.to_owned(),
            members: members.clone(),
            start_turn: turn,
            turns_remaining: self.config.rnd.duration_turns,
            cost_reduction_pct,
            was_repeated,
        };
        self.state.rnd_surges.push(surge.clone());
        upsert_coalition(
            &mut self.state.coalitions,
            Coalition {
                id: surge.id.clone(),
                kind: CoalitionType::Rnd,
                members,
                created_turn: turn,
                active: true,
                auto_renew: false,
                sector: Some(surge.sector.clone()),
            },
        );
        info!(
            turn,
            id = %surge.id,
            cost_reduction_pct,
            was_repeated,
            "R&D surge launched"
        );
        Some(surge)
    }

    /// Count down every surge, removing expired ones and retiring their
    /// coalition records. Returns the ids that expired.
    pub fn decay_rnd_surges(&mut self) -> Vec<String> {
        for surge in &mut self.state.rnd_surges {
            surge.turns_remaining = surge.turns_remaining.saturating_sub(1);
        }
        let expired: Vec<String> = self
            .state
            .rnd_surges
            .iter()
            .filter(|s| s.turns_remaining == 0)
            .map(|s| s.id.clone())
            .collect();
        self.state.rnd_surges.retain(|s| s.turns_remaining > 0);
        for id in &expired {
            if let Some(record) = self.state.coalitions.iter_mut().find(|c| &c.id == id) {
                record.active = false;
            }
            info!(turn = self.state.turn, %id, "R&D surge expired");
        }
        expired
    }

    /// The unexpired surge for `sector`, if any.
    pub fn active_surge(&self, sector: &str) -> Option<&RndSurge> {
        self.state
            .rnd_surges
            .iter()
            .find(|s| s.sector == sector && s.turns_remaining > 0)
    }

    /// Cost reduction in percent from the sector's active surge (0 if none).
    pub fn cost_reduction(&self, sector: &str) -> f64 {
        self.active_surge(sector)
            .map_or(0.0, |s| s.cost_reduction_pct)
    }

    // -----------------------------------------------------------------------
    // Reciprocity
    // -----------------------------------------------------------------------

    /// Add to a country's promised and delivered counters. Non-finite
    /// amounts count as 0.
    pub fn update_reciprocity(&mut self, country: &CountryCode, promised: f64, delivered: f64) {
        let entry = self
            .state
            .reciprocity_escrow
            .entry(country.clone())
            .or_default();
        entry.promised += finite_or_zero(promised);
        entry.delivered += finite_or_zero(delivered);
        debug!(%country, promised = entry.promised, delivered = entry.delivered, "Reciprocity updated");
    }

    /// Delivered over promised for `country` (1.0 when nothing promised).
    pub fn reciprocity_ratio(&self, country: &CountryCode) -> f64 {
        self.state
            .reciprocity_escrow
            .get(country)
            .map_or(1.0, ReciprocityEntry::ratio)
    }

    // -----------------------------------------------------------------------
    // Per-turn decay
    // -----------------------------------------------------------------------

    /// Run dividend and surge decay. Call exactly once per resolved turn.
    ///
    /// Returns the ids of surges that expired.
    pub fn decay_all(&mut self) -> Vec<String> {
        self.decay_supermajority_dividend();
        self.decay_rnd_surges()
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Members deduplicated, first occurrence order kept.
fn distinct_members(members: &[CountryCode]) -> Vec<CountryCode> {
    let mut seen = BTreeSet::new();
    members
        .iter()
        .filter(|c| seen.insert((*c).clone()))
        .cloned()
        .collect()
}

/// Insert a coalition record, replacing any record with the same id.
fn upsert_coalition(coalitions: &mut Vec<Coalition>, record: Coalition) {
    match coalitions.iter_mut().find(|c| c.id == record.id) {
        Some(existing) => *existing = record,
        None => coalitions.push(record),
    }
}
