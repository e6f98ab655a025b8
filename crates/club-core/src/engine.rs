//! Concurrency-safe engine facade.
//!
//! [`ClubEngine`] owns the live state document, the catalog, and the RNG
//! behind one async [`RwLock`]. Every mutating operation takes the write
//! lock for its whole check-and-mutate, works on a staged copy, and swaps
//! the copy in only after the [`StateStore`] accepted it. A failed save
//! therefore leaves the live document untouched. Status reads take the read
//! lock and return owned snapshots.

use std::fmt;

use chrono::Utc;
use club_types::{
    CountryCode, FloorDecision, GameState, Member, ObservedIndicators, RndSurge, TurnChoice,
    TurnSubmission, VoteEntry,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::catalog::{self, CatalogStore, InMemoryCatalog};
use crate::coalition::CoalitionManager;
use crate::config::ClubConfig;
use crate::coordination::{self, Breakdown};
use crate::error::ClubError;
use crate::market;
use crate::resolution::{self, ResolutionContext, ResolveInput, TurnReport};
use crate::store::StateStore;
use crate::weighting::{self, GdpSource};

/// Readiness of the live turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnStatus {
    /// The live turn.
    pub turn: u32,
    /// Whether every member has submitted.
    pub all_ready: bool,
    /// Members that have not submitted yet.
    pub waiting_for: Vec<CountryCode>,
    /// Submissions received for the live turn.
    pub submissions_count: usize,
    /// Club size.
    pub total_players: usize,
}

/// Result of a turn submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The ballot was stored.
    Accepted(TurnStatus),
    /// The ballot was refused; state is unchanged.
    Rejected {
        /// Why it was refused.
        reason: String,
    },
}

/// A resolution request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveRequest {
    /// Resolve even if some members have not submitted.
    pub force_advance: bool,
    /// Indicators the resolving client last displayed.
    pub observed: ObservedIndicators,
    /// Raw country code of the resolving client.
    pub player_country: Option<String>,
}

/// A committed resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// What happened during the turn.
    pub report: TurnReport,
    /// The committed state document.
    pub state: GameState,
}

/// Result of a resolution request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// Not every member has submitted; nothing changed.
    Waiting {
        /// Members that still have to submit.
        waiting_for: Vec<CountryCode>,
    },
    /// The turn was resolved and committed.
    Resolved(Box<Resolution>),
}

/// State guarded by the engine lock.
struct Inner<C> {
    state: GameState,
    catalog: C,
    rng: StdRng,
}

/// The turn-resolution engine for one game.
pub struct ClubEngine<C = InMemoryCatalog> {
    config: ClubConfig,
    gdp: Box<dyn GdpSource>,
    store: Box<dyn StateStore>,
    inner: RwLock<Inner<C>>,
}

impl<C> fmt::Debug for ClubEngine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClubEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<C: CatalogStore + Clone> ClubEngine<C> {
    /// Open the engine over `store`.
    ///
    /// A missing or unreadable document falls back to the default state.
    /// Partial documents are completed from defaults, the period is synced
    /// to the turn, and an empty offer list is redrawn.
    pub fn open(
        config: ClubConfig,
        catalog: C,
        gdp: impl GdpSource + 'static,
        store: impl StateStore + 'static,
    ) -> Self {
        let mut rng = config
            .game
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

        let mut state = match store.load() {
            Ok(Some(state)) => {
                info!(turn = state.turn, "State document loaded");
                state
            }
            Ok(None) => {
                info!("No stored state, starting from defaults");
                config.initial_state()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load state, starting from defaults");
                config.initial_state()
            }
        };
        config.calendar().sync_period(&mut state);
        market::enforce_invariants(&mut state, &config.guidance, &config.clamps);
        if state.projects.is_empty() {
            state.projects =
                catalog::draw_projects(&catalog, config.game.projects_per_round, &mut rng);
        }

        Self {
            config,
            gdp: Box::new(gdp),
            store: Box::new(store),
            inner: RwLock::new(Inner {
                state,
                catalog,
                rng,
            }),
        }
    }

    /// The engine configuration.
    pub const fn config(&self) -> &ClubConfig {
        &self.config
    }

    /// An owned copy of the live state document.
    pub async fn snapshot(&self) -> GameState {
        self.inner.read().await.state.clone()
    }

    /// Readiness of the live turn.
    pub async fn status(&self) -> TurnStatus {
        turn_status(&self.inner.read().await.state)
    }

    /// Coordination index with per-component maxima and effects.
    pub async fn coordination_breakdown(&self) -> Breakdown {
        coordination::breakdown(&self.inner.read().await.state)
    }

    /// Store a member's ballot for the live turn.
    ///
    /// Unknown countries are admitted first. A ballot tagged with another
    /// turn is rejected. Resubmitting replaces the earlier ballot and its
    /// reward proposals.
    pub async fn submit_turn(
        &self,
        country: &str,
        choice: TurnChoice,
    ) -> Result<SubmitOutcome, ClubError> {
        let country = parse_country(country)?;
        let mut inner = self.inner.write().await;
        let turn = inner.state.turn;
        if let Some(claimed) = choice.turn.filter(|t| *t != turn) {
            warn!(%country, claimed, turn, "Stale submission rejected");
            return Ok(SubmitOutcome::Rejected {
                reason: format!("submission is for turn {claimed}, live turn is {turn}"),
            });
        }

        let mut staged = inner.state.clone();
        if weighting::admit_member(&mut staged.members, &country, self.gdp.as_ref()) {
            info!(%country, "Submitting country admitted to the club");
        }
        let decision = choice.floor_decision.unwrap_or_default();
        let before = staged.turn_submissions.len();
        staged
            .turn_submissions
            .retain(|s| !(s.country == country && s.turn == turn));
        let replaced = staged.turn_submissions.len() < before;
        staged.turn_submissions.push(TurnSubmission {
            country: country.clone(),
            turn,
            chosen_project_id: choice.chosen_project_id.filter(|id| !id.is_empty()),
            floor_decision: decision,
            r_adjustments: choice.r_adjustments.clone(),
            submitted_at: Utc::now(),
        });

        for proposals in staged.project_r_adjustments.values_mut() {
            proposals.remove(&country);
        }
        staged.project_r_adjustments.retain(|_, p| !p.is_empty());
        for (project, value) in choice.r_adjustments {
            if value.is_finite() {
                staged
                    .project_r_adjustments
                    .entry(project)
                    .or_default()
                    .insert(country.clone(), value);
            } else {
                warn!(%country, %project, "Non-finite reward proposal dropped");
            }
        }
        upsert_vote(&mut staged, &country, decision, turn);

        self.persist(&staged)?;
        inner.state = staged;
        let status = turn_status(&inner.state);
        info!(
            %country,
            turn,
            %decision,
            replaced,
            submissions = status.submissions_count,
            members = status.total_players,
            "Submission accepted"
        );
        Ok(SubmitOutcome::Accepted(status))
    }

    /// Resolve the live turn when every member has submitted, or when
    /// `force_advance` is set.
    ///
    /// Readiness check and resolution happen under one write lock.
    pub async fn resolve_turn(&self, request: ResolveRequest) -> Result<ResolveOutcome, ClubError> {
        let player_country = request
            .player_country
            .as_deref()
            .map(parse_country)
            .transpose()?;

        let mut guard = self.inner.write().await;
        let status = turn_status(&guard.state);
        if !status.all_ready && !request.force_advance {
            debug!(
                turn = status.turn,
                waiting = status.waiting_for.len(),
                "Resolution waiting for submissions"
            );
            return Ok(ResolveOutcome::Waiting {
                waiting_for: status.waiting_for,
            });
        }

        let inner = &mut *guard;
        let mut staged = inner.state.clone();
        let mut staged_catalog = inner.catalog.clone();
        let report = {
            let mut ctx = ResolutionContext {
                config: &self.config,
                catalog: &mut staged_catalog,
                gdp: self.gdp.as_ref(),
                rng: &mut inner.rng,
            };
            let input = ResolveInput {
                observed: request.observed,
                player_country,
            };
            resolution::resolve(&mut staged, &mut ctx, &input)
        };

        self.persist(&staged)?;
        inner.state = staged;
        inner.catalog = staged_catalog;
        Ok(ResolveOutcome::Resolved(Box::new(Resolution {
            report,
            state: inner.state.clone(),
        })))
    }

    /// Admit `country` to the club. Joining twice is a no-op.
    pub async fn join_club(&self, country: &str) -> Result<Member, ClubError> {
        let country = parse_country(country)?;
        self.mutate(|state| {
            if weighting::admit_member(&mut state.members, &country, self.gdp.as_ref()) {
                info!(%country, members = state.members.len(), "Country joined the club");
            }
            state
                .member(&country)
                .cloned()
                .ok_or_else(|| ClubError::InvalidCountry {
                    code: country.to_string(),
                    reason: "member missing after admission".to_owned(),
                })
        })
        .await
    }

    /// Record a standing floor vote.
    ///
    /// Without an explicit turn the vote refers to the last resolved turn.
    pub async fn cast_vote(
        &self,
        country: &str,
        vote: &str,
        turn: Option<u32>,
    ) -> Result<VoteEntry, ClubError> {
        let country = parse_country(country)?;
        let decision = FloorDecision::parse(vote).ok_or_else(|| ClubError::InvalidVote {
            value: vote.to_owned(),
        })?;
        self.mutate(|state| {
            let turn = turn.unwrap_or_else(|| state.turn.saturating_sub(1).max(1));
            let entry = upsert_vote(state, &country, decision, turn);
            debug!(%country, %decision, turn, "Standing vote recorded");
            Ok(entry)
        })
        .await
    }

    /// Set the floor, bypassing forward guidance.
    ///
    /// The market is lifted to the new floor if it sits below it.
    pub async fn set_floor_directly(&self, value: f64) -> Result<GameState, ClubError> {
        if !value.is_finite() {
            return Err(ClubError::NonFiniteValue {
                field: "floor".to_owned(),
            });
        }
        let min = self.config.guidance.min_floor;
        if value < min {
            return Err(ClubError::FloorTooLow { value, min });
        }
        self.mutate(|state| {
            state.floor = value;
            state.last_floor_change_turn = state.turn;
            state.market = state.market.max(value);
            info!(turn = state.turn, floor = value, "Floor set directly");
            Ok(state.clone())
        })
        .await
    }

    /// Replace the live document with a fresh default state.
    pub async fn reset_to_default(&self) -> Result<GameState, ClubError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let mut fresh = self.config.initial_state();
        fresh.projects = catalog::draw_projects(
            &inner.catalog,
            self.config.game.projects_per_round,
            &mut inner.rng,
        );
        self.persist(&fresh)?;
        inner.state = fresh;
        info!("State reset to defaults");
        Ok(inner.state.clone())
    }

    /// Form a joint MRV coalition.
    pub async fn form_joint_mrv(&self, members: &[&str]) -> Result<(), ClubError> {
        let members = parse_countries(members)?;
        let min = self.config.coalition.mrv_min_members;
        self.mutate(|state| {
            let mut coalitions = self.coalitions(state);
            if coalitions.create_joint_mrv(&members) {
                Ok(())
            } else {
                Err(ClubError::InvalidCoalition {
                    reason: format!("joint MRV needs at least {min} distinct members"),
                })
            }
        })
        .await
    }

    /// Dissolve the joint MRV coalition.
    pub async fn dissolve_joint_mrv(&self) -> Result<(), ClubError> {
        self.mutate(|state| {
            self.coalitions(state).deactivate_joint_mrv();
            Ok(())
        })
        .await
    }

    /// Launch a coordinated R&D surge in `sector`.
    pub async fn launch_rnd_surge(
        &self,
        sector: &str,
        members: &[&str],
        cost_reduction_pct: Option<f64>,
    ) -> Result<RndSurge, ClubError> {
        let members = parse_countries(members)?;
        self.mutate(|state| {
            self.coalitions(state)
                .create_rnd_surge(sector, &members, cost_reduction_pct)
                .ok_or_else(|| ClubError::InvalidCoalition {
                    reason: "R&D surge needs a sector and at least one member".to_owned(),
                })
        })
        .await
    }

    /// Add to a country's reciprocity escrow. Returns the updated ratio.
    pub async fn record_reciprocity(
        &self,
        country: &str,
        promised: f64,
        delivered: f64,
    ) -> Result<f64, ClubError> {
        let country = parse_country(country)?;
        for (field, value) in [("promised", promised), ("delivered", delivered)] {
            if !value.is_finite() {
                return Err(ClubError::NonFiniteValue {
                    field: field.to_owned(),
                });
            }
        }
        self.mutate(|state| {
            let mut coalitions = self.coalitions(state);
            coalitions.update_reciprocity(&country, promised, delivered);
            Ok(coalitions.reciprocity_ratio(&country))
        })
        .await
    }

    /// Apply `f` to a staged copy of the state and commit it once saved.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut GameState) -> Result<T, ClubError>,
    ) -> Result<T, ClubError> {
        let mut inner = self.inner.write().await;
        let mut staged = inner.state.clone();
        let out = f(&mut staged)?;
        self.persist(&staged)?;
        inner.state = staged;
        Ok(out)
    }

    fn persist(&self, state: &GameState) -> Result<(), ClubError> {
        self.store
            .save(state)
            .inspect_err(|e| warn!(turn = state.turn, error = %e, "Failed to persist state"))?;
        Ok(())
    }

    fn coalitions<'a>(&'a self, state: &'a mut GameState) -> CoalitionManager<'a> {
        CoalitionManager::new(
            state,
            &self.config.coalition,
            self.config.clamps.credibility_max,
        )
    }
}

fn turn_status(state: &GameState) -> TurnStatus {
    let submissions_count = state.current_submissions().count();
    let total_players = state.members.len();
    TurnStatus {
        turn: state.turn,
        all_ready: total_players > 0 && submissions_count >= total_players,
        waiting_for: state.waiting_for(),
        submissions_count,
        total_players,
    }
}

fn upsert_vote(
    state: &mut GameState,
    country: &CountryCode,
    decision: FloorDecision,
    turn: u32,
) -> VoteEntry {
    let entry = VoteEntry {
        country: country.clone(),
        vote: decision,
        turn,
        updated_at: Utc::now(),
    };
    match state.votes.iter_mut().find(|v| &v.country == country) {
        Some(existing) => *existing = entry.clone(),
        None => state.votes.push(entry.clone()),
    }
    entry
}

fn parse_country(raw: &str) -> Result<CountryCode, ClubError> {
    CountryCode::parse(raw).ok_or_else(|| ClubError::InvalidCountry {
        code: raw.to_owned(),
        reason: "expected 2-3 ASCII letters".to_owned(),
    })
}

fn parse_countries(raw: &[&str]) -> Result<Vec<CountryCode>, ClubError> {
    raw.iter().map(|c| parse_country(c)).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use crate::weighting::GdpTable;

    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn load(&self) -> Result<Option<GameState>, StoreError> {
            Err(StoreError::Unavailable("offline".to_owned()))
        }

        fn save(&self, _state: &GameState) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".to_owned()))
        }
    }

    fn seeded_config() -> ClubConfig {
        let mut config = ClubConfig::default();
        config.game.seed = Some(42);
        config
    }

    fn engine() -> ClubEngine {
        ClubEngine::open(
            seeded_config(),
            InMemoryCatalog::default(),
            GdpTable::new(),
            MemoryStore::new(),
        )
    }

    fn choice(decision: FloorDecision) -> TurnChoice {
        TurnChoice {
            floor_decision: Some(decision),
            ..TurnChoice::default()
        }
    }

    #[tokio::test]
    async fn unreadable_store_falls_back_to_defaults() {
        let engine = ClubEngine::open(
            seeded_config(),
            InMemoryCatalog::default(),
            GdpTable::new(),
            BrokenStore,
        );
        let state = engine.snapshot().await;
        assert_eq!(state.turn, 1);
        assert!((state.floor - 80.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_save_leaves_state_unchanged() {
        let engine = ClubEngine::open(
            seeded_config(),
            InMemoryCatalog::default(),
            GdpTable::new(),
            BrokenStore,
        );
        let err = engine.join_club("usa").await.unwrap_err();
        assert!(matches!(err, ClubError::Persistence { .. }));
        assert!(engine.snapshot().await.members.is_empty());
    }

    #[tokio::test]
    async fn submission_replaces_earlier_ballot() {
        let engine = engine();
        engine.submit_turn("usa", choice(FloorDecision::Raise)).await.unwrap();
        let outcome = engine.submit_turn("USA", choice(FloorDecision::Lower)).await.unwrap();
        let SubmitOutcome::Accepted(status) = outcome else {
            panic!("Expected Accepted, got {outcome:?}");
        };
        assert_eq!(status.submissions_count, 1);
        assert!(status.all_ready);

        let state = engine.snapshot().await;
        assert_eq!(state.turn_submissions.len(), 1);
        assert_eq!(state.turn_submissions[0].floor_decision, FloorDecision::Lower);
        assert_eq!(state.votes.len(), 1);
        assert_eq!(state.votes[0].vote, FloorDecision::Lower);
    }

    #[tokio::test]
    async fn resubmission_replaces_reward_proposals() {
        let engine = engine();
        let mut first = choice(FloorDecision::Hold);
        first.r_adjustments.insert("p1".to_owned(), 1.1);
        engine.submit_turn("USA", first).await.unwrap();
        let mut second = choice(FloorDecision::Hold);
        second.r_adjustments.insert("p2".to_owned(), 1.3);
        second.r_adjustments.insert("p3".to_owned(), f64::NAN);
        engine.submit_turn("USA", second).await.unwrap();

        let state = engine.snapshot().await;
        assert!(!state.project_r_adjustments.contains_key("p1"));
        assert!(!state.project_r_adjustments.contains_key("p3"));
        let usa = CountryCode::parse("USA").unwrap();
        assert!((state.project_r_adjustments["p2"][&usa] - 1.3).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn stale_submission_is_rejected() {
        let engine = engine();
        let stale = TurnChoice {
            turn: Some(4),
            ..TurnChoice::default()
        };
        let outcome = engine.submit_turn("USA", stale).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Rejected { .. }));
        assert!(engine.snapshot().await.members.is_empty());
    }

    #[tokio::test]
    async fn invalid_country_is_an_error() {
        let engine = engine();
        let err = engine.submit_turn("U5A", TurnChoice::default()).await.unwrap_err();
        assert!(matches!(err, ClubError::InvalidCountry { .. }));
    }

    #[tokio::test]
    async fn resolve_waits_for_missing_members() {
        let engine = engine();
        engine.join_club("USA").await.unwrap();
        engine.join_club("CHN").await.unwrap();
        engine.submit_turn("USA", choice(FloorDecision::Hold)).await.unwrap();

        let outcome = engine.resolve_turn(ResolveRequest::default()).await.unwrap();
        let ResolveOutcome::Waiting { waiting_for } = outcome else {
            panic!("Expected Waiting, got {outcome:?}");
        };
        assert_eq!(waiting_for, vec![CountryCode::parse("CHN").unwrap()]);
        assert_eq!(engine.snapshot().await.turn, 1);

        let forced = ResolveRequest {
            force_advance: true,
            ..ResolveRequest::default()
        };
        let outcome = engine.resolve_turn(forced).await.unwrap();
        assert!(matches!(outcome, ResolveOutcome::Resolved(_)));
        assert_eq!(engine.snapshot().await.turn, 2);
    }

    #[tokio::test]
    async fn empty_club_waits_unless_forced() {
        let engine = engine();
        let outcome = engine.resolve_turn(ResolveRequest::default()).await.unwrap();
        assert!(matches!(outcome, ResolveOutcome::Waiting { ref waiting_for } if waiting_for.is_empty()));
    }

    #[tokio::test]
    async fn cast_vote_validates_and_defaults_turn() {
        let engine = engine();
        let err = engine.cast_vote("USA", "sideways", None).await.unwrap_err();
        assert!(matches!(err, ClubError::InvalidVote { .. }));

        let entry = engine.cast_vote("USA", " Raise ", None).await.unwrap();
        assert_eq!(entry.vote, FloorDecision::Raise);
        assert_eq!(entry.turn, 1);
        let entry = engine.cast_vote("USA", "lower", Some(7)).await.unwrap();
        assert_eq!(entry.turn, 7);
        assert_eq!(engine.snapshot().await.votes.len(), 1);
    }

    #[tokio::test]
    async fn set_floor_directly_validates_and_lifts_market() {
        let engine = engine();
        assert!(matches!(
            engine.set_floor_directly(9.5).await,
            Err(ClubError::FloorTooLow { .. })
        ));
        assert!(matches!(
            engine.set_floor_directly(f64::NAN).await,
            Err(ClubError::NonFiniteValue { .. })
        ));
        let state = engine.set_floor_directly(90.0).await.unwrap();
        assert!((state.floor - 90.0).abs() < f64::EPSILON);
        assert!((state.market - 90.0).abs() < f64::EPSILON);
        assert_eq!(state.last_floor_change_turn, 1);
    }

    #[tokio::test]
    async fn join_club_is_idempotent() {
        let engine = engine();
        engine.join_club(" chn ").await.unwrap();
        let member = engine.join_club("CHN").await.unwrap();
        assert_eq!(member.country.as_str(), "CHN");
        assert_eq!(engine.snapshot().await.members.len(), 1);
    }

    #[tokio::test]
    async fn coalition_operations_round_trip() {
        let engine = engine();
        let err = engine.form_joint_mrv(&["USA", "USA", "CHN"]).await.unwrap_err();
        assert!(matches!(err, ClubError::InvalidCoalition { .. }));
        engine.form_joint_mrv(&["USA", "CHN", "IND"]).await.unwrap();
        assert!(engine.snapshot().await.joint_mrv_active);

        let surge = engine.launch_rnd_surge("dac", &["USA"], None).await.unwrap();
        assert!((surge.cost_reduction_pct - 6.25).abs() < f64::EPSILON);

        let ratio = engine.record_reciprocity("USA", 10.0, 5.0).await.unwrap();
        assert!((ratio - 0.5).abs() < f64::EPSILON);

        let breakdown = engine.coordination_breakdown().await;
        assert!(breakdown.total >= 20.0);

        engine.dissolve_joint_mrv().await.unwrap();
        assert!(!engine.snapshot().await.joint_mrv_active);
    }

    #[tokio::test]
    async fn reset_restores_defaults() {
        let engine = engine();
        engine.join_club("USA").await.unwrap();
        engine.set_floor_directly(120.0).await.unwrap();
        let state = engine.reset_to_default().await.unwrap();
        assert!(state.members.is_empty());
        assert!((state.floor - 80.0).abs() < f64::EPSILON);
    }
}
