//! CLI configuration (§6).
//!
//! This module provides structured configuration for the two driver
//! invocations exposed by the binary:
//! - `refine`: incremental point insertion (§4.9)
//! - `decimate`: feature-protected vertex removal (§4.10)
//!
//! The grammar follows `prog infile outfile [nextpt termkind (nupd | norm
//! errlev)]` for refinement, with decimation adding `{errrecalc A|E}
//! kdegree {opts Y|N} [ext Y|N feat Y|N chain Y|N]`.

use clap::{Parser, Subcommand};

use crate::drivers::decimation::DecimationStrategy;
use crate::drivers::refinement::RefinementStrategy;
use crate::drivers::termination::{ErrorDirection, TerminationPolicy};
use crate::errors::MeshError;
use crate::history::sink::Norm;
use crate::kernel::removal::RemovalOptions;

/// Top-level CLI, parsed from `std::env::args`.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Builds a new instance from command line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }
}

/// The two driver subcommands (§6).
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Insert points into a triangulation until a termination policy fires.
    Refine(RefineArgs),
    /// Remove vertices from a triangulation until a termination policy fires.
    Decimate(DecimateArgs),
}

/// Candidate-selection letter shared by both subcommands' `nextpt`/point
/// selection argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum NextPoint {
    /// `E`: largest-head-error candidate first.
    E,
    /// `R`: random order.
    R,
}

/// Termination-kind letter (`termkind`): `U` update count, `E` error
/// level, `A` run until candidates are exhausted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TermKind {
    U,
    E,
    A,
}

/// Global-norm letter (`norm`): `X` max, `S` mean ("sum"), `Q` RMS.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum NormArg {
    X,
    S,
    Q,
}

impl From<NormArg> for Norm {
    fn from(value: NormArg) -> Self {
        match value {
            NormArg::X => Self::Max,
            NormArg::S => Self::Med,
            NormArg::Q => Self::Sqm,
        }
    }
}

/// `Y`/`N` flag spelled out for `--opts`/`--ext`/`--feat`/`--chain`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum YesNo {
    Y,
    N,
}

impl YesNo {
    const fn as_bool(self) -> bool {
        matches!(self, Self::Y)
    }
}

/// Shared positional arguments: `infile outfile`.
#[derive(Parser, Debug, Clone)]
pub struct RefineArgs {
    /// Input point file (§6 format: count, then `x y z` per line).
    pub infile: String,
    /// Output mesh file (§6 format: vertices, triangles, edges).
    pub outfile: String,

    /// Candidate-point selection strategy.
    #[arg(long, value_enum, default_value_t = NextPoint::R)]
    pub nextpt: NextPoint,

    /// Termination kind: update count, error level, or exhaustion.
    #[arg(long, value_enum, default_value_t = TermKind::A)]
    pub termkind: TermKind,

    /// Update-count limit, required when `--termkind u`.
    #[arg(long)]
    pub nupd: Option<u64>,

    /// Global norm, required when `--termkind e`.
    #[arg(long, value_enum)]
    pub norm: Option<NormArg>,

    /// Error-level threshold, required when `--termkind e`.
    #[arg(long)]
    pub errlev: Option<f64>,

    /// RNG seed; omit to seed from OS entropy.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// `decimate` adds the feature-protection and cost-recalculation options.
#[derive(Parser, Debug, Clone)]
pub struct DecimateArgs {
    #[command(flatten)]
    pub common: RefineArgs,

    /// Cost recalculation strategy for error-driven candidate selection:
    /// `a` (approximate, plane fit) or `e` (exact, trial retriangulation).
    #[arg(long, value_enum, default_value_t = ErrRecalc::A)]
    pub errrecalc: ErrRecalc,

    /// Degree cap on a vertex's star; `0` disables the cap.
    #[arg(long, default_value_t = 0)]
    pub kdegree: usize,

    /// Master switch for the feature-protection options below.
    #[arg(long, value_enum, default_value_t = YesNo::N)]
    pub opts: YesNo,

    /// Use the extended local-Delaunay check against the whole star,
    /// not just the two immediate ring neighbours.
    #[arg(long, value_enum, default_value_t = YesNo::N)]
    pub ext: YesNo,

    /// Allow removing a vertex that is a single-constraint feature.
    #[arg(long, value_enum, default_value_t = YesNo::N)]
    pub feat: YesNo,

    /// Allow removing a vertex that would break a closed constraint chain.
    #[arg(long, value_enum, default_value_t = YesNo::N)]
    pub chain: YesNo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ErrRecalc {
    A,
    E,
}

impl RefineArgs {
    /// Validates the termination arguments against `termkind` and
    /// resolves a [`TerminationPolicy`].
    ///
    /// # Errors
    /// Returns [`MeshError::InvalidOptions`] if a required companion
    /// argument for the chosen `termkind` is missing.
    pub fn termination_policy(&self, direction: ErrorDirection) -> Result<TerminationPolicy, MeshError> {
        match self.termkind {
            TermKind::A => Ok(TerminationPolicy::NoTerm),
            TermKind::U => {
                let limit = self
                    .nupd
                    .ok_or_else(|| MeshError::InvalidOptions("--termkind u requires --nupd".to_string()))?;
                Ok(TerminationPolicy::UpdateCount { limit })
            }
            TermKind::E => {
                let norm = self
                    .norm
                    .ok_or_else(|| MeshError::InvalidOptions("--termkind e requires --norm".to_string()))?;
                let level = self
                    .errlev
                    .ok_or_else(|| MeshError::InvalidOptions("--termkind e requires --errlev".to_string()))?;
                Ok(TerminationPolicy::ErrorLevel { norm: norm.into(), level, direction })
            }
        }
    }

    /// Resolves the candidate-selection strategy for refinement.
    #[must_use]
    pub const fn refinement_strategy(&self) -> RefinementStrategy {
        match self.nextpt {
            NextPoint::E => RefinementStrategy::Error,
            NextPoint::R => RefinementStrategy::Random,
        }
    }
}

impl DecimateArgs {
    /// Resolves the candidate-selection strategy for decimation.
    #[must_use]
    pub const fn decimation_strategy(&self) -> DecimationStrategy {
        match (self.common.nextpt, self.errrecalc) {
            (NextPoint::R, _) => DecimationStrategy::Random,
            (NextPoint::E, ErrRecalc::A) => DecimationStrategy::ErrorApprox,
            (NextPoint::E, ErrRecalc::E) => DecimationStrategy::ErrorExact,
        }
    }

    /// Resolves the feature-protection options, honouring `--opts n` as
    /// the master off switch regardless of the individual flags.
    #[must_use]
    pub const fn removal_options(&self) -> RemovalOptions {
        let gated = self.opts.as_bool();
        RemovalOptions {
            kdegree: self.kdegree,
            allow_features_del: gated && self.feat.as_bool(),
            allow_chain_break: gated && self.chain.as_bool(),
            ext_active: gated && self.ext.as_bool(),
        }
    }
}

/// Configuration preset for quick testing, mirroring the teacher's
/// `TestConfig` pattern for the new CLI grammar.
#[derive(Debug, Clone)]
pub struct TestConfig;

impl TestConfig {
    /// A small refinement run: random candidates, no termination policy.
    #[must_use]
    pub fn small_refine(infile: &str, outfile: &str) -> RefineArgs {
        RefineArgs {
            infile: infile.to_string(),
            outfile: outfile.to_string(),
            nextpt: NextPoint::R,
            termkind: TermKind::A,
            nupd: None,
            norm: None,
            errlev: None,
            seed: Some(1),
        }
    }

    /// A small decimation run: random candidates, no feature protection.
    #[must_use]
    pub fn small_decimate(infile: &str, outfile: &str) -> DecimateArgs {
        DecimateArgs {
            common: Self::small_refine(infile, outfile),
            errrecalc: ErrRecalc::A,
            kdegree: 0,
            opts: YesNo::N,
            ext: YesNo::N,
            feat: YesNo::N,
            chain: YesNo::N,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RefineArgs {
        TestConfig::small_refine("in.txt", "out.txt")
    }

    #[test]
    fn exhaustion_termination_needs_no_companion_args() {
        let args = base();
        let policy = args.termination_policy(ErrorDirection::Falling).unwrap();
        assert_eq!(policy, TerminationPolicy::NoTerm);
    }

    #[test]
    fn update_count_termination_requires_nupd() {
        let mut args = base();
        args.termkind = TermKind::U;
        assert!(args.termination_policy(ErrorDirection::Falling).is_err());

        args.nupd = Some(5);
        let policy = args.termination_policy(ErrorDirection::Falling).unwrap();
        assert_eq!(policy, TerminationPolicy::UpdateCount { limit: 5 });
    }

    #[test]
    fn error_level_termination_requires_norm_and_errlev() {
        let mut args = base();
        args.termkind = TermKind::E;
        assert!(args.termination_policy(ErrorDirection::Rising).is_err());

        args.norm = Some(NormArg::X);
        args.errlev = Some(0.1);
        let policy = args.termination_policy(ErrorDirection::Rising).unwrap();
        assert_eq!(
            policy,
            TerminationPolicy::ErrorLevel { norm: Norm::Max, level: 0.1, direction: ErrorDirection::Rising }
        );
    }

    #[test]
    fn opts_master_switch_gates_individual_flags() {
        let mut decimate = TestConfig::small_decimate("in.txt", "out.txt");
        decimate.feat = YesNo::Y;
        decimate.chain = YesNo::Y;
        decimate.ext = YesNo::Y;

        let options = decimate.removal_options();
        assert!(!options.allow_features_del);
        assert!(!options.allow_chain_break);
        assert!(!options.ext_active);

        decimate.opts = YesNo::Y;
        let options = decimate.removal_options();
        assert!(options.allow_features_del);
        assert!(options.allow_chain_break);
        assert!(options.ext_active);
    }

    #[test]
    fn preset_configs_resolve_strategies() {
        let refine = TestConfig::small_refine("in.txt", "out.txt");
        assert_eq!(refine.refinement_strategy(), RefinementStrategy::Random);

        let decimate = TestConfig::small_decimate("in.txt", "out.txt");
        assert_eq!(decimate.decimation_strategy(), DecimationStrategy::Random);
    }
}
