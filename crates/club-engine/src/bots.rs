//! Scripted bot players for unattended sessions.
//!
//! Each seated country gets a [`Temperament`] that biases its floor ballot.
//! Bots nominate one of the live offers, propose a reward multiplier for
//! it, and report their reciprocity each round. The first bot also acts as
//! the resolving client, reporting the indicators it last saw.

use club_core::ClubEngine;
use club_core::market::GuidanceOutcome;
use club_core::{ResolveOutcome, ResolveRequest, SubmitOutcome};
use club_types::{FloorDecision, GameState, ObservedIndicators, Project, TurnChoice};
use rand::Rng;
use tracing::{info, warn};

use crate::error::EngineError;

/// Reward multipliers bots choose from.
const R_PROPOSALS: [f64; 3] = [1.0, 1.1, 1.2];

/// Ballot bias of a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Temperament {
    /// Prefers raising the floor.
    Hawk,
    /// Prefers lowering the floor.
    Dove,
    /// Prefers holding.
    Centrist,
}

impl Temperament {
    /// `(raise, hold)` probabilities; the remainder lowers.
    const fn odds(self) -> (f64, f64) {
        match self {
            Self::Hawk => (0.6, 0.3),
            Self::Dove => (0.1, 0.4),
            Self::Centrist => (0.2, 0.6),
        }
    }
}

/// A seated bot player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bot {
    /// Country code the bot plays.
    pub country: String,
    /// Ballot bias.
    pub temperament: Temperament,
}

impl Bot {
    /// Draw a floor ballot.
    pub fn ballot(&self, rng: &mut impl Rng) -> FloorDecision {
        let (raise, hold) = self.temperament.odds();
        let roll: f64 = rng.random();
        if roll < raise {
            FloorDecision::Raise
        } else if roll < raise + hold {
            FloorDecision::Hold
        } else {
            FloorDecision::Lower
        }
    }

    /// Build this round's submission against the live offers.
    pub fn choose(&self, turn: u32, offers: &[Project], rng: &mut impl Rng) -> TurnChoice {
        let mut choice = TurnChoice {
            turn: Some(turn),
            floor_decision: Some(self.ballot(rng)),
            ..TurnChoice::default()
        };
        if offers.is_empty() {
            return choice;
        }
        let pick = offers.get(rng.random_range(0..offers.len()));
        if let Some(project) = pick {
            choice.chosen_project_id = Some(project.id.clone());
            let r = R_PROPOSALS
                .get(rng.random_range(0..R_PROPOSALS.len()))
                .copied()
                .unwrap_or(1.0);
            choice.r_adjustments.insert(project.id.clone(), r);
        }
        choice
    }
}

/// Seat one bot per country, cycling through the temperaments.
pub fn seat_bots(countries: &[String]) -> Vec<Bot> {
    const CYCLE: [Temperament; 3] = [Temperament::Hawk, Temperament::Centrist, Temperament::Dove];
    countries
        .iter()
        .zip(CYCLE.iter().cycle())
        .map(|(country, temperament)| Bot {
            country: country.clone(),
            temperament: *temperament,
        })
        .collect()
}

/// Tallies collected over a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Turns resolved.
    pub rounds_played: u32,
    /// Honored floor changes.
    pub floor_changes: u32,
    /// Rejected floor changes.
    pub guidance_breaks: u32,
    /// Turns with a CQE intervention.
    pub interventions: u32,
    /// Supermajority dividends armed.
    pub dividends: u32,
}

/// Admit every bot and, when enough are seated, form a joint MRV coalition.
pub async fn seat_in_club<C>(engine: &ClubEngine<C>, bots: &[Bot]) -> Result<(), EngineError>
where
    C: club_core::catalog::CatalogStore + Clone,
{
    for bot in bots {
        engine.join_club(&bot.country).await?;
    }
    if bots.len() >= engine.config().coalition.mrv_min_members {
        let members: Vec<&str> = bots.iter().map(|b| b.country.as_str()).collect();
        engine.form_joint_mrv(&members).await?;
        info!(members = members.len(), "Bots formed a joint MRV coalition");
    }
    Ok(())
}

/// Play `rounds` turns with `bots`.
pub async fn play_session<C>(
    engine: &ClubEngine<C>,
    bots: &[Bot],
    rounds: u32,
    rng: &mut impl Rng,
) -> Result<SessionSummary, EngineError>
where
    C: club_core::catalog::CatalogStore + Clone,
{
    let Some(resolver) = bots.first() else {
        return Err(EngineError::Bot {
            message: "no bots seated".to_owned(),
        });
    };
    let mut summary = SessionSummary::default();

    for _ in 0..rounds {
        let state = engine.snapshot().await;
        for bot in bots {
            let choice = bot.choose(state.turn, &state.projects, rng);
            if let Some(project) = state.projects.first() {
                let promised = project.xcr_bid.max(0.0);
                let delivered = promised * rng.random_range(0.5..=1.0);
                engine
                    .record_reciprocity(&bot.country, promised, delivered)
                    .await?;
            }
            if let SubmitOutcome::Rejected { reason } =
                engine.submit_turn(&bot.country, choice).await?
            {
                warn!(country = %bot.country, %reason, "Bot submission rejected");
            }
        }

        let mut request = ResolveRequest {
            force_advance: false,
            observed: observed(&state),
            player_country: Some(resolver.country.clone()),
        };
        let mut outcome = engine.resolve_turn(request.clone()).await?;
        if let ResolveOutcome::Waiting { waiting_for } = &outcome {
            warn!(waiting = waiting_for.len(), "Forcing resolution for missing bots");
            request.force_advance = true;
            outcome = engine.resolve_turn(request).await?;
        }
        let ResolveOutcome::Resolved(resolution) = outcome else {
            return Err(EngineError::Bot {
                message: "forced resolution did not resolve".to_owned(),
            });
        };

        let report = &resolution.report;
        summary.rounds_played = summary.rounds_played.saturating_add(1);
        match report.guidance {
            GuidanceOutcome::Honored(_) => {
                summary.floor_changes = summary.floor_changes.saturating_add(1);
            }
            GuidanceOutcome::Broken(_) => {
                summary.guidance_breaks = summary.guidance_breaks.saturating_add(1);
            }
            GuidanceOutcome::Held => {}
        }
        if report.market.intervened {
            summary.interventions = summary.interventions.saturating_add(1);
        }
        if report.dividend_applied {
            summary.dividends = summary.dividends.saturating_add(1);
        }
        info!(
            turn = report.turn,
            year = report.year,
            quarter = report.quarter,
            decision = %report.floor_tally.decision,
            project = report.project.as_deref().unwrap_or("-"),
            floor = resolution.state.floor,
            market = resolution.state.market,
            "Round complete"
        );
    }
    Ok(summary)
}

/// Indicators as the resolving client last saw them.
const fn observed(state: &GameState) -> ObservedIndicators {
    ObservedIndicators {
        sentiment: Some(state.sentiment),
        private_share: Some(state.private_share),
        inflation: Some(state.inflation),
    }
}
