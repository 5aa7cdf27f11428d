//! Claim prioritization and heuristic red flags.

use regex::Regex;
use std::sync::LazyLock;

use super::types::Claim;

/// Absolute success language that real systems rarely justify.
static UNREALISTIC_METRIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b100\s*%|\bzero (downtime|bugs|errors|failures)\b|\bflawless\b")
        .expect("Invalid regex")
});

/// Language acknowledging failure handling; its presence makes absolute
/// claims plausible.
static REDUNDANCY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(redundan|failover|fallback|backup|replica|retry|rollback)")
        .expect("Invalid regex")
});

/// Big-scale language.
static SCALE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(millions?|billions?)\b").expect("Invalid regex")
});

/// Infrastructure terms expected alongside big-scale claims.
static INFRASTRUCTURE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(cach(e|ing)|cluster|cloud|shard|distributed|load balanc|cdn|kubernetes|queue)")
        .expect("Invalid regex")
});

/// Heuristic analysis over extracted claims.
pub struct ClaimAnalyzer;

impl ClaimAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Attach heuristic red flags to claims and refresh their verification
    /// requirement.
    pub fn annotate(&self, claims: &mut [Claim]) {
        for claim in claims.iter_mut() {
            if self.is_unrealistic_metric(&claim.claim_text) {
                claim
                    .red_flags
                    .push("Unrealistic metric: absolute success claim with no failure handling mentioned".to_string());
            }
            if self.is_scale_without_infrastructure(&claim.claim_text) {
                claim
                    .red_flags
                    .push("Scale claim without supporting infrastructure mentioned".to_string());
            }
            claim.refresh_requires_verification();
        }
    }

    /// The top-K claims to surface for verification follow-ups, highest
    /// adjusted priority first.
    pub fn top_for_verification<'a>(&self, claims: &'a [Claim], k: usize) -> Vec<&'a Claim> {
        let mut candidates: Vec<&Claim> =
            claims.iter().filter(|c| c.requires_verification).collect();
        candidates.sort_by_key(|c| std::cmp::Reverse(c.adjusted_priority()));
        candidates.truncate(k);
        candidates
    }

    fn is_unrealistic_metric(&self, text: &str) -> bool {
        UNREALISTIC_METRIC_PATTERN.is_match(text) && !REDUNDANCY_PATTERN.is_match(text)
    }

    fn is_scale_without_infrastructure(&self, text: &str) -> bool {
        SCALE_PATTERN.is_match(text) && !INFRASTRUCTURE_PATTERN.is_match(text)
    }
}

impl Default for ClaimAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::claims::{ClaimType, Verifiability};

    fn claim(text: &str) -> Claim {
        Claim::new(
            text,
            ClaimType::Metric,
            Verifiability::Verifiable,
            5,
            "q_4",
            "a_4",
        )
    }

    #[test]
    fn test_unrealistic_metric_flagged() {
        let analyzer = ClaimAnalyzer::new();
        let mut claims = vec![claim("We achieved 100% uptime for two years")];
        analyzer.annotate(&mut claims);
        assert!(!claims[0].red_flags.is_empty());
        assert!(claims[0].requires_verification);
    }

    #[test]
    fn test_redundancy_language_excuses_absolute_claim() {
        let analyzer = ClaimAnalyzer::new();
        let mut claims = vec![claim(
            "We achieved 100% uptime thanks to automatic failover between replicas",
        )];
        analyzer.annotate(&mut claims);
        assert!(claims[0].red_flags.is_empty());
    }

    #[test]
    fn test_scale_without_infrastructure_flagged() {
        let analyzer = ClaimAnalyzer::new();
        let mut claims = vec![claim("The service handled millions of users")];
        analyzer.annotate(&mut claims);
        assert_eq!(claims[0].red_flags.len(), 1);

        let mut grounded = vec![claim(
            "The service handled millions of users behind a sharded cache cluster",
        )];
        analyzer.annotate(&mut grounded);
        assert!(grounded[0].red_flags.is_empty());
    }

    #[test]
    fn test_top_for_verification_ranks_by_adjusted_priority() {
        let analyzer = ClaimAnalyzer::new();

        let mut contradictory = claim("I led the rollout");
        contradictory.mark_contradictory("said otherwise earlier");

        let mut vague = claim("Things got much faster");
        vague.verifiability = Verifiability::Vague;
        vague.refresh_requires_verification();

        let mut clean = claim("Used Postgres");
        clean.priority = 2;
        clean.refresh_requires_verification();

        let claims = vec![vague.clone(), clean, contradictory.clone()];
        let top = analyzer.top_for_verification(&claims, 2);

        assert_eq!(top.len(), 2);
        assert_eq!(top[0].claim_id, contradictory.claim_id);
        assert_eq!(top[1].claim_id, vague.claim_id);
    }

    #[test]
    fn test_top_k_truncates() {
        let analyzer = ClaimAnalyzer::new();
        let mut claims: Vec<Claim> = (0..6)
            .map(|i| {
                let mut c = claim(&format!("claim {}", i));
                c.priority = 8;
                c.refresh_requires_verification();
                c
            })
            .collect();
        analyzer.annotate(&mut claims);
        assert_eq!(analyzer.top_for_verification(&claims, 3).len(), 3);
    }
}
