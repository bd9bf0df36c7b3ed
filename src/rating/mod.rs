//! Skill beliefs and the Plackett-Luce update applied when a debate concludes.

pub mod tiers;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean assigned to a member without any recorded debate.
pub const DEFAULT_MU: f64 = 25.0;
/// Uncertainty assigned to a member without any recorded debate.
pub const DEFAULT_SIGMA: f64 = DEFAULT_MU / 3.0;
/// Performance variance shared by every debater.
pub const BETA: f64 = DEFAULT_SIGMA / 2.0;
/// Lower bound applied to the variance shrink factor.
pub const KAPPA: f64 = 0.0001;

/// Two-parameter skill belief held for every member.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Skill {
    /// Estimated skill.
    pub mu: f64,
    /// Uncertainty around `mu`.
    pub sigma: f64,
}

impl Default for Skill {
    fn default() -> Self {
        Self {
            mu: DEFAULT_MU,
            sigma: DEFAULT_SIGMA,
        }
    }
}

impl Skill {
    /// Build a skill belief from raw parameters.
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// Conservative public rating: `20 * ((mu - 3 * sigma) + 25)`.
    pub fn display_rating(&self) -> f64 {
        20.0 * ((self.mu - 3.0 * self.sigma) + 25.0)
    }
}

/// Outcome of a pairwise prediction between two members.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Probability that the first member wins.
    pub first_wins: f64,
    /// Probability that the second member wins.
    pub second_wins: f64,
    /// Probability of a draw.
    pub draw: f64,
}

/// Plackett-Luce rating model over singleton teams.
#[derive(Debug, Clone)]
pub struct RatingEngine {
    beta: f64,
    kappa: f64,
}

impl Default for RatingEngine {
    fn default() -> Self {
        Self {
            beta: BETA,
            kappa: KAPPA,
        }
    }
}

impl RatingEngine {
    /// Update every entry given its placement (1 is best, equal placements are ties).
    ///
    /// The returned vector is aligned with `standings`.
    pub fn rate(&self, standings: &[(Skill, u32)]) -> Vec<Skill> {
        if standings.len() < 2 {
            return standings.iter().map(|(skill, _)| *skill).collect();
        }

        let beta_sq = self.beta * self.beta;
        let c = standings
            .iter()
            .map(|(skill, _)| skill.sigma * skill.sigma + beta_sq)
            .sum::<f64>()
            .sqrt();

        let strengths: Vec<f64> = standings
            .iter()
            .map(|(skill, _)| (skill.mu / c).exp())
            .collect();

        let sum_q: Vec<f64> = standings
            .iter()
            .map(|(_, rank_q)| {
                standings
                    .iter()
                    .zip(&strengths)
                    .filter(|((_, rank_i), _)| rank_i >= rank_q)
                    .map(|(_, strength)| strength)
                    .sum()
            })
            .collect();

        let tied: Vec<f64> = standings
            .iter()
            .map(|(_, rank_q)| {
                standings
                    .iter()
                    .filter(|(_, rank_i)| rank_i == rank_q)
                    .count() as f64
            })
            .collect();

        standings
            .iter()
            .enumerate()
            .map(|(i, (skill, rank_i))| {
                let mut omega = 0.0;
                let mut delta = 0.0;

                for (q, (_, rank_q)) in standings.iter().enumerate() {
                    if rank_q > rank_i {
                        continue;
                    }
                    let quotient = strengths[i] / sum_q[q];
                    delta += quotient * (1.0 - quotient) / tied[q];
                    if q == i {
                        omega += (1.0 - quotient) / tied[q];
                    } else {
                        omega -= quotient / tied[q];
                    }
                }

                let sigma_sq = skill.sigma * skill.sigma;
                let gamma = skill.sigma / c;
                omega *= sigma_sq / c;
                delta *= gamma * sigma_sq / (c * c);

                Skill {
                    mu: skill.mu + omega,
                    sigma: skill.sigma * (1.0 - delta).max(self.kappa).sqrt(),
                }
            })
            .collect()
    }

    /// Predict win and draw probabilities for a one-on-one match.
    pub fn predict(&self, first: Skill, second: Skill) -> Prediction {
        let first_wins = self.predict_win(first, second);
        Prediction {
            first_wins,
            second_wins: 1.0 - first_wins,
            draw: self.predict_draw(first, second),
        }
    }

    /// Probability that `first` beats `second`.
    pub fn predict_win(&self, first: Skill, second: Skill) -> f64 {
        normal_cdf((first.mu - second.mu) / self.spread(first, second))
    }

    /// Probability that `first` and `second` draw.
    pub fn predict_draw(&self, first: Skill, second: Skill) -> f64 {
        let players = 2.0_f64;
        let draw_probability = 1.0 / players;
        let margin =
            players.sqrt() * self.beta * inverse_normal_cdf((1.0 + draw_probability) / 2.0);
        let spread = self.spread(first, second);
        let gap = first.mu - second.mu;

        (normal_cdf((margin - gap) / spread) - normal_cdf((-gap - margin) / spread)).abs()
    }

    fn spread(&self, first: Skill, second: Skill) -> f64 {
        (2.0 * self.beta * self.beta + first.sigma * first.sigma + second.sigma * second.sigma)
            .sqrt()
    }
}

/// Standard normal cumulative distribution.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Complementary error function (Chebyshev fit, fractional error below 1.2e-7).
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87
                                    + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let value = t * poly.exp();
    if x >= 0.0 { value } else { 2.0 - value }
}

/// Inverse of the standard normal cumulative distribution (Acklam's rational approximation).
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    #[test]
    fn default_skill_maps_to_rating_500() {
        assert!(close(Skill::default().display_rating(), 500.0, 1e-9));
    }

    #[test]
    fn one_on_one_update_matches_reference_values() {
        let engine = RatingEngine::default();
        let updated = engine.rate(&[(Skill::default(), 1), (Skill::default(), 2)]);

        assert!(close(updated[0].mu, 27.635, 1e-3), "{:?}", updated[0]);
        assert!(close(updated[1].mu, 22.365, 1e-3), "{:?}", updated[1]);
        assert!(close(updated[0].sigma, 8.0655, 1e-3), "{:?}", updated[0]);
        assert!(close(updated[1].sigma, 8.0655, 1e-3), "{:?}", updated[1]);
    }

    #[test]
    fn tied_placements_leave_equal_players_unchanged() {
        let engine = RatingEngine::default();
        let updated = engine.rate(&[(Skill::default(), 1), (Skill::default(), 1)]);

        assert!(close(updated[0].mu, DEFAULT_MU, 1e-9));
        assert!(close(updated[1].mu, DEFAULT_MU, 1e-9));
        assert!(updated[0].sigma < DEFAULT_SIGMA);
    }

    #[test]
    fn single_entry_is_returned_untouched() {
        let engine = RatingEngine::default();
        let skill = Skill::new(30.0, 4.0);
        assert_eq!(engine.rate(&[(skill, 1)]), vec![skill]);
    }

    #[test]
    fn three_way_update_preserves_order() {
        let engine = RatingEngine::default();
        let updated = engine.rate(&[
            (Skill::default(), 1),
            (Skill::default(), 2),
            (Skill::default(), 3),
        ]);

        assert!(updated[0].mu > updated[1].mu);
        assert!(updated[1].mu > updated[2].mu);
    }

    #[test]
    fn even_match_predicts_coin_flip() {
        let engine = RatingEngine::default();
        let prediction = engine.predict(Skill::default(), Skill::default());

        assert!(close(prediction.first_wins, 0.5, 1e-6));
        assert!(close(prediction.second_wins, 0.5, 1e-6));
        assert!(close(prediction.draw, 0.2371, 1e-3), "{prediction:?}");
    }

    #[test]
    fn stronger_member_is_favoured() {
        let engine = RatingEngine::default();
        let strong = Skill::new(35.0, 3.0);
        let weak = Skill::new(20.0, 3.0);

        assert!(engine.predict_win(strong, weak) > 0.9);
        assert!(engine.predict_draw(strong, weak) < engine.predict_draw(weak, weak));
    }

    #[test]
    fn normal_helpers_are_consistent() {
        assert!(close(normal_cdf(0.0), 0.5, 1e-7));
        assert!(close(normal_cdf(1.96), 0.975, 1e-4));
        assert!(close(inverse_normal_cdf(0.75), 0.674_49, 1e-4));
        assert!(close(normal_cdf(inverse_normal_cdf(0.01)), 0.01, 1e-6));
    }
}
