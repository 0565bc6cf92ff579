use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::types::DeliveryStage;

pub const DEFAULT_ROLLOUT: &[&str] = &["gray-release"];
pub const DEFAULT_RELEASE: &[&str] = &["release"];
pub const DEFAULT_INTEGRATION: &[&str] = &["main", "master"];

#[derive(Debug, thiserror::Error)]
#[error("invalid branch pattern `{pattern}`: {source}")]
pub struct PolicyError {
    pattern: String,
    #[source]
    source: globset::Error,
}

/// Long-lived branch tiers, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BranchTier {
    Integration,
    Release,
    Rollout,
}

impl BranchTier {
    pub fn stage(&self) -> DeliveryStage {
        match self {
            BranchTier::Integration => DeliveryStage::InTesting,
            BranchTier::Release => DeliveryStage::Released,
            BranchTier::Rollout => DeliveryStage::InStagedRollout,
        }
    }
}

#[derive(Debug, Clone)]
struct Tier {
    patterns: Vec<String>,
    set: GlobSet,
}

impl Tier {
    fn build(patterns: &[String]) -> Result<Self, PolicyError> {
        let mut builder = GlobSetBuilder::new();
        for p in patterns {
            let glob = Glob::new(p).map_err(|source| PolicyError {
                pattern: p.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| PolicyError {
            pattern: patterns.join(","),
            source,
        })?;
        Ok(Self {
            patterns: patterns.to_vec(),
            set,
        })
    }

    fn matches(&self, branch: &str) -> bool {
        self.set.is_match(branch)
    }
}

/// Which branch names count as long-lived, grouped into precedence tiers.
///
/// Patterns are globs, so `release/*` covers versioned release branches.
/// Reachability from a tier's branch is read as "deployed to that
/// environment", which only holds under a branch-per-environment workflow.
#[derive(Debug, Clone)]
pub struct BranchPolicy {
    rollout: Tier,
    release: Tier,
    integration: Tier,
}

impl BranchPolicy {
    pub fn new(
        rollout: &[String],
        release: &[String],
        integration: &[String],
    ) -> Result<Self, PolicyError> {
        Ok(Self {
            rollout: Tier::build(rollout)?,
            release: Tier::build(release)?,
            integration: Tier::build(integration)?,
        })
    }

    /// Highest tier `branch` belongs to, if any.
    pub fn tier_of(&self, branch: &str) -> Option<BranchTier> {
        if self.rollout.matches(branch) {
            Some(BranchTier::Rollout)
        } else if self.release.matches(branch) {
            Some(BranchTier::Release)
        } else if self.integration.matches(branch) {
            Some(BranchTier::Integration)
        } else {
            None
        }
    }

    pub fn is_long_lived(&self, branch: &str) -> bool {
        self.tier_of(branch).is_some()
    }

    pub fn is_integration(&self, branch: &str) -> bool {
        self.integration.matches(branch)
    }

    /// Highest tier among a set of branches containing some commit.
    pub fn highest_tier<'a, I>(&self, branches: I) -> Option<BranchTier>
    where
        I: IntoIterator<Item = &'a str>,
    {
        branches.into_iter().filter_map(|b| self.tier_of(b)).max()
    }

    pub fn rollout_patterns(&self) -> &[String] {
        &self.rollout.patterns
    }

    pub fn release_patterns(&self) -> &[String] {
        &self.release.patterns
    }

    pub fn integration_patterns(&self) -> &[String] {
        &self.integration.patterns
    }
}

impl Default for BranchPolicy {
    fn default() -> Self {
        let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        // The default patterns are plain names and always compile.
        Self::new(
            &own(DEFAULT_ROLLOUT),
            &own(DEFAULT_RELEASE),
            &own(DEFAULT_INTEGRATION),
        )
        .unwrap_or_else(|_| unreachable!("default branch patterns are valid globs"))
    }
}
