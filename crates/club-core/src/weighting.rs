//! GDP weighting and vote aggregation.
//!
//! Floor votes are GDP-weighted; project nominations carry one vote per
//! member. Member weights are normalized so they sum to the member count,
//! which keeps relative voting power while the total stays comparable to an
//! equal-weight vote.
//!
//! Aggregation folds ballots into a map keyed by country before summing, so
//! the result does not depend on ballot order.

use std::collections::{BTreeMap, BTreeSet};

use club_types::{CountryCode, FloorDecision, Member};
use serde::Deserialize;

use crate::config::VotingConfig;

/// Bucket totals closer than this are treated as tied.
const TIE_EPSILON: f64 = 1e-9;

/// Source of per-country GDP figures.
pub trait GdpSource: Send + Sync {
    /// GDP of `country` in US dollars; 0 when unknown.
    fn gdp_of(&self, country: &CountryCode) -> f64;
}

/// In-memory GDP lookup table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GdpTable {
    gdp: BTreeMap<CountryCode, f64>,
}

impl GdpTable {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            gdp: BTreeMap::new(),
        }
    }

    /// Insert or replace a country's GDP.
    pub fn insert(&mut self, country: CountryCode, gdp_usd: f64) {
        self.gdp.insert(country, gdp_usd);
    }

    /// Number of countries in the table.
    pub fn len(&self) -> usize {
        self.gdp.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.gdp.is_empty()
    }
}

impl FromIterator<(CountryCode, f64)> for GdpTable {
    fn from_iter<I: IntoIterator<Item = (CountryCode, f64)>>(iter: I) -> Self {
        Self {
            gdp: iter.into_iter().collect(),
        }
    }
}

impl GdpSource for GdpTable {
    fn gdp_of(&self, country: &CountryCode) -> f64 {
        self.gdp
            .get(country)
            .copied()
            .filter(|g| g.is_finite() && *g > 0.0)
            .unwrap_or(0.0)
    }
}

/// Recompute `gdp_usd` and `gdp_weight` for every member.
///
/// `weight = gdp / total_gdp * member_count`. When the total is zero (no
/// GDP data at all) every member gets weight 1.0.
#[allow(clippy::cast_precision_loss)] // member counts are tiny
pub fn compute_weights(members: &mut [Member], gdp: &dyn GdpSource) {
    if members.is_empty() {
        return;
    }
    for member in members.iter_mut() {
        member.gdp_usd = gdp.gdp_of(&member.country);
    }
    let total: f64 = members.iter().map(|m| m.gdp_usd).sum();
    let count = members.len() as f64;
    for member in members.iter_mut() {
        member.gdp_weight = if total > 0.0 {
            member.gdp_usd / total * count
        } else {
            1.0
        };
    }
}

/// Admit `country` unless it already sits in the club, then refresh every
/// weight. Returns `true` when a member was added.
pub fn admit_member(members: &mut Vec<Member>, country: &CountryCode, gdp: &dyn GdpSource) -> bool {
    if members.iter().any(|m| &m.country == country) {
        return false;
    }
    members.push(Member::joining(country.clone()));
    compute_weights(members, gdp);
    true
}

/// How ballots are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    /// GDP-weighted floor vote.
    Floor,
    /// One vote per member.
    Project,
}

/// Voting power of each member for `kind`.
///
/// A missing or zero GDP weight counts as 1.0. Countries not seated in the
/// club also vote with power 1.0 (see [`power_of`]).
pub fn voting_power(members: &[Member], kind: VoteKind) -> BTreeMap<CountryCode, f64> {
    members
        .iter()
        .map(|m| {
            let power = match kind {
                VoteKind::Project => 1.0,
                VoteKind::Floor if m.gdp_weight.is_finite() && m.gdp_weight > 0.0 => {
                    m.gdp_weight
                }
                VoteKind::Floor => 1.0,
            };
            (m.country.clone(), power)
        })
        .collect()
}

/// Power of `country`, defaulting to 1.0 for non-members.
pub fn power_of(power: &BTreeMap<CountryCode, f64>, country: &CountryCode) -> f64 {
    power.get(country).copied().unwrap_or(1.0)
}

/// How equal bucket totals are broken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// First bucket in declaration order (hold, raise, lower) wins.
    #[default]
    DeclarationOrder,
    /// Alphabetically first label wins (hold, lower, raise).
    Lexicographic,
    /// The bucket holding the single heaviest ballot wins; remaining ties
    /// fall back to declaration order.
    HeaviestMember,
}

/// Result of a floor vote.
#[derive(Debug, Clone, PartialEq)]
pub struct FloorTally {
    /// Winning decision (`hold` when nobody voted).
    pub decision: FloorDecision,
    /// Winning weight over total weight (0 when nobody voted).
    pub share: f64,
    /// Total weight cast.
    pub total_weight: f64,
    /// Summed weight per decision.
    pub breakdown: BTreeMap<FloorDecision, f64>,
    /// Whether the share cleared the supermajority threshold.
    pub passed: bool,
}

/// Result of a project nomination vote.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTally {
    /// Most-nominated project id, if any.
    pub decision: Option<String>,
    /// Winning weight over total weight.
    pub share: f64,
    /// Total weight cast.
    pub total_weight: f64,
    /// Nominations per project id.
    pub breakdown: BTreeMap<String, f64>,
    /// Whether the share cleared the supermajority threshold.
    pub passed: bool,
}

/// Whether `share` clears `threshold`.
pub fn supermajority_passed(share: f64, threshold: f64) -> bool {
    share >= threshold
}

struct Bucket<K> {
    key: K,
    weight: f64,
    heaviest: f64,
}

/// Pick the winning bucket. `buckets` must be in declaration order.
fn pick_winner<K, F>(buckets: Vec<Bucket<K>>, tie_break: TieBreak, label: F) -> Option<Bucket<K>>
where
    F: Fn(&K) -> String,
{
    let mut best: Option<Bucket<K>> = None;
    for bucket in buckets {
        let replace = match &best {
            None => true,
            Some(current) => {
                let diff = bucket.weight - current.weight;
                if diff > TIE_EPSILON {
                    true
                } else if diff < -TIE_EPSILON {
                    false
                } else {
                    match tie_break {
                        TieBreak::DeclarationOrder => false,
                        TieBreak::Lexicographic => label(&bucket.key) < label(&current.key),
                        TieBreak::HeaviestMember => bucket.heaviest > current.heaviest + TIE_EPSILON,
                    }
                }
            }
        };
        if replace {
            best = Some(bucket);
        }
    }
    best
}

/// Aggregate GDP-weighted floor ballots.
///
/// Each country counts once; a repeated country keeps its last ballot.
pub fn aggregate_floor(
    ballots: &[(CountryCode, FloorDecision)],
    members: &[Member],
    voting: &VotingConfig,
) -> FloorTally {
    let power = voting_power(members, VoteKind::Floor);
    let by_country: BTreeMap<&CountryCode, FloorDecision> =
        ballots.iter().map(|(c, d)| (c, *d)).collect();

    let mut buckets: Vec<Bucket<FloorDecision>> = FloorDecision::ALL
        .iter()
        .map(|d| Bucket {
            key: *d,
            weight: 0.0,
            heaviest: 0.0,
        })
        .collect();
    let mut total_weight = 0.0;
    for (country, decision) in &by_country {
        let weight = power_of(&power, country);
        if let Some(bucket) = buckets.iter_mut().find(|b| b.key == *decision) {
            bucket.weight += weight;
            bucket.heaviest = bucket.heaviest.max(weight);
            total_weight += weight;
        }
    }

    let breakdown = buckets.iter().map(|b| (b.key, b.weight)).collect();
    let winner = pick_winner(buckets, voting.tie_break, |d| d.label().to_owned());
    let (decision, winning_weight) =
        winner.map_or((FloorDecision::Hold, 0.0), |b| (b.key, b.weight));
    let share = if total_weight > 0.0 {
        winning_weight / total_weight
    } else {
        0.0
    };

    FloorTally {
        decision,
        share,
        total_weight,
        breakdown,
        passed: supermajority_passed(share, voting.supermajority_threshold),
    }
}

/// Aggregate project nominations, one vote per country.
///
/// Buckets are ordered by project id, so declaration order and
/// lexicographic order coincide here.
pub fn aggregate_projects(
    nominations: &[(CountryCode, String)],
    voting: &VotingConfig,
) -> ProjectTally {
    let by_country: BTreeMap<&CountryCode, &str> =
        nominations.iter().map(|(c, p)| (c, p.as_str())).collect();

    let mut breakdown: BTreeMap<String, f64> = BTreeMap::new();
    for project in by_country.values() {
        *breakdown.entry((*project).to_owned()).or_insert(0.0) += 1.0;
    }
    let total_weight: f64 = breakdown.values().sum();
    let buckets = breakdown
        .iter()
        .map(|(id, weight)| Bucket {
            key: id.clone(),
            weight: *weight,
            heaviest: 1.0,
        })
        .collect();
    let winner = pick_winner(buckets, voting.tie_break, Clone::clone);
    let share = match &winner {
        Some(b) if total_weight > 0.0 => b.weight / total_weight,
        _ => 0.0,
    };

    ProjectTally {
        decision: winner.map(|b| b.key),
        share,
        total_weight,
        breakdown,
        passed: supermajority_passed(share, voting.supermajority_threshold),
    }
}

/// Draw the funded project uniformly among the distinct nominated ids.
///
/// Every distinct id has the same chance, however many members named it.
pub fn draw_project<'a>(
    nominations: impl IntoIterator<Item = &'a str>,
    rng: &mut impl rand::Rng,
) -> Option<String> {
    let distinct: Vec<&str> = nominations
        .into_iter()
        .filter(|id| !id.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if distinct.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..distinct.len());
    distinct.get(idx).map(|id| (*id).to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn code(raw: &str) -> CountryCode {
        CountryCode::parse(raw).unwrap()
    }

    fn members(codes: &[&str]) -> Vec<Member> {
        codes.iter().map(|c| Member::joining(code(c))).collect()
    }

    fn table() -> GdpTable {
        [
            (code("USA"), 28.0e12),
            (code("EU"), 18.0e12),
            (code("CHN"), 18.0e12),
            (code("IND"), 4.0e12),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn weights_sum_to_member_count() {
        let mut m = members(&["USA", "EU", "CHN"]);
        compute_weights(&mut m, &table());
        let sum: f64 = m.iter().map(|x| x.gdp_weight).sum();
        assert!((sum - 3.0).abs() < 1e-9);
        assert!((m[0].gdp_weight - 1.3125).abs() < 1e-9);
        assert!((m[1].gdp_weight - m[2].gdp_weight).abs() < 1e-12);
    }

    #[test]
    fn weights_fall_back_to_one_without_gdp() {
        let mut m = members(&["AAA", "BBB"]);
        compute_weights(&mut m, &table());
        assert!(m.iter().all(|x| (x.gdp_weight - 1.0).abs() < f64::EPSILON));
        assert!(m.iter().all(|x| x.gdp_usd.abs() < f64::EPSILON));
    }

    #[test]
    fn admit_member_is_idempotent() {
        let mut m = members(&["USA"]);
        assert!(admit_member(&mut m, &code("ind"), &table()));
        assert!(!admit_member(&mut m, &code("IND"), &table()));
        assert_eq!(m.len(), 2);
        assert!((m[0].gdp_weight - 1.75).abs() < 1e-9);
        assert!((m[1].gdp_weight - 0.25).abs() < 1e-9);
    }

    #[test]
    fn supermajority_boundary() {
        assert!(!supermajority_passed(0.6599, 0.66));
        assert!(supermajority_passed(0.66, 0.66));
    }

    #[test]
    fn equal_weight_three_way_split_holds() {
        let m = members(&["AAA", "BBB", "CCC"]);
        let ballots = vec![
            (code("AAA"), FloorDecision::Raise),
            (code("BBB"), FloorDecision::Lower),
            (code("CCC"), FloorDecision::Hold),
        ];
        let tally = aggregate_floor(&ballots, &m, &VotingConfig::default());
        assert_eq!(tally.decision, FloorDecision::Hold);
        assert!((tally.share - 1.0 / 3.0).abs() < 1e-12);
        assert!(!tally.passed);
    }

    #[test]
    fn gdp_weight_breaks_split() {
        let mut m = members(&["USA", "EU", "IND"]);
        compute_weights(&mut m, &table());
        let ballots = vec![
            (code("USA"), FloorDecision::Raise),
            (code("EU"), FloorDecision::Lower),
            (code("IND"), FloorDecision::Hold),
        ];
        let tally = aggregate_floor(&ballots, &m, &VotingConfig::default());
        assert_eq!(tally.decision, FloorDecision::Raise);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let mut m = members(&["USA", "EU", "CHN", "IND"]);
        compute_weights(&mut m, &table());
        let mut ballots = vec![
            (code("USA"), FloorDecision::Raise),
            (code("EU"), FloorDecision::Raise),
            (code("CHN"), FloorDecision::Lower),
            (code("IND"), FloorDecision::Hold),
        ];
        let first = aggregate_floor(&ballots, &m, &VotingConfig::default());
        ballots.reverse();
        let second = aggregate_floor(&ballots, &m, &VotingConfig::default());
        ballots.swap(0, 2);
        let third = aggregate_floor(&ballots, &m, &VotingConfig::default());
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn tie_break_rules() {
        let mut equal = members(&["AAA", "BBB"]);
        equal[0].gdp_weight = 1.0;
        equal[1].gdp_weight = 1.0;
        let ballots = vec![
            (code("AAA"), FloorDecision::Raise),
            (code("BBB"), FloorDecision::Lower),
        ];
        let mut voting = VotingConfig::default();
        assert_eq!(
            aggregate_floor(&ballots, &equal, &voting).decision,
            FloorDecision::Raise
        );
        voting.tie_break = TieBreak::Lexicographic;
        assert_eq!(
            aggregate_floor(&ballots, &equal, &voting).decision,
            FloorDecision::Lower
        );

        // heaviest member: 1.5 alone vs 0.75 + 0.75
        let mut uneven = members(&["AAA", "BBB", "CCC"]);
        uneven[0].gdp_weight = 1.5;
        uneven[1].gdp_weight = 0.75;
        uneven[2].gdp_weight = 0.75;
        let ballots = vec![
            (code("AAA"), FloorDecision::Lower),
            (code("BBB"), FloorDecision::Raise),
            (code("CCC"), FloorDecision::Raise),
        ];
        voting.tie_break = TieBreak::HeaviestMember;
        assert_eq!(
            aggregate_floor(&ballots, &uneven, &voting).decision,
            FloorDecision::Lower
        );
        voting.tie_break = TieBreak::DeclarationOrder;
        assert_eq!(
            aggregate_floor(&ballots, &uneven, &voting).decision,
            FloorDecision::Raise
        );
    }

    #[test]
    fn no_ballots_holds_with_zero_share() {
        let tally = aggregate_floor(&[], &[], &VotingConfig::default());
        assert_eq!(tally.decision, FloorDecision::Hold);
        assert!(tally.share.abs() < f64::EPSILON);
        assert!(!tally.passed);
    }

    #[test]
    fn non_members_vote_with_unit_power() {
        let ballots = vec![(code("ZZZ"), FloorDecision::Raise)];
        let tally = aggregate_floor(&ballots, &[], &VotingConfig::default());
        assert_eq!(tally.decision, FloorDecision::Raise);
        assert!((tally.total_weight - 1.0).abs() < f64::EPSILON);
        assert!(tally.passed);
    }

    #[test]
    fn project_tally_counts_one_per_member() {
        let nominations = vec![
            (code("USA"), "dac".to_owned()),
            (code("EU"), "dac".to_owned()),
            (code("CHN"), "mangrove".to_owned()),
        ];
        let tally = aggregate_projects(&nominations, &VotingConfig::default());
        assert_eq!(tally.decision.as_deref(), Some("dac"));
        assert!((tally.share - 2.0 / 3.0).abs() < 1e-12);
        assert!(tally.passed);
    }

    #[test]
    fn project_draw_is_uniform_over_distinct_ids() {
        let noms = ["a", "a", "a", "b"];
        let mut rng = StdRng::seed_from_u64(42);
        let mut a = 0_u32;
        let mut b = 0_u32;
        for _ in 0..2000 {
            match draw_project(noms.iter().copied(), &mut rng).as_deref() {
                Some("a") => a += 1,
                Some("b") => b += 1,
                other => panic!("unexpected draw {other:?}"),
            }
        }
        // Equal chance per distinct id, not per nomination.
        assert!(a > 850 && b > 850, "a={a} b={b}");
        assert!(draw_project(std::iter::empty(), &mut rng).is_none());
    }
}
