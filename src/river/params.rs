//! River generation parameters and configuration

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Channel size preset, supplying the base channel width
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelPreset {
    /// Narrow stream, easily forded
    Creek,
    /// Ordinary river
    #[default]
    River,
    /// Wide river with a deep core
    LargeRiver,
    /// Very wide river, typical of deltas
    HugeRiver,
}

impl ChannelPreset {
    pub fn all() -> &'static [Self] {
        &[Self::Creek, Self::River, Self::LargeRiver, Self::HugeRiver]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Creek => "Narrow stream",
            Self::River => "Ordinary river",
            Self::LargeRiver => "Wide river with a deep core",
            Self::HugeRiver => "Very wide river",
        }
    }

    /// Base channel width in map units
    pub fn base_width(&self) -> f32 {
        match self {
            Self::Creek => 6.0,
            Self::River => 10.0,
            Self::LargeRiver => 18.0,
            Self::HugeRiver => 28.0,
        }
    }
}

impl std::fmt::Display for ChannelPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creek => write!(f, "creek"),
            Self::River => write!(f, "river"),
            Self::LargeRiver => write!(f, "large"),
            Self::HugeRiver => write!(f, "huge"),
        }
    }
}

impl FromStr for ChannelPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "creek" => Ok(Self::Creek),
            "river" => Ok(Self::River),
            "large" | "large_river" => Ok(Self::LargeRiver),
            "huge" | "huge_river" => Ok(Self::HugeRiver),
            other => Err(format!("unknown channel preset '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("failed to parse river params: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read river params from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid river param `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Highest accepted noise frequency, in cycles per map unit
pub const MAX_NOISE_FREQUENCY: f32 = 10.0;

/// Finest accepted curve sampling step, in map units
pub const MIN_SAMPLE_STEP: f32 = 0.05;

/// Tunable constants for the whole river pass.
///
/// Distances are in map units (grid cells), angles in degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiverParams {
    // =========================================================================
    // Graph growth
    // =========================================================================

    /// Shortest segment grown per delta recursion step
    pub segment_length_min: f32,
    /// Longest segment grown per delta recursion step
    pub segment_length_max: f32,
    /// Chance that a delta node continues as one full-width child instead of splitting
    pub single_branch_chance: f32,
    /// Smallest heading offset of a child from its parent
    pub branch_angle_min: f32,
    /// Largest heading offset of a child from its parent
    pub branch_angle_max: f32,
    /// Extra offset added to one side of a split
    pub branch_skew_max: f32,
    /// Width share of the first child of a split, lower bound
    pub split_ratio_min: f32,
    /// Width share of the first child of a split, upper bound
    pub split_ratio_max: f32,
    /// Share of the boundary-to-boundary distance covered by the delta trunk, lower bound
    pub trunk_fraction_min: f32,
    /// Share of the boundary-to-boundary distance covered by the delta trunk, upper bound
    pub trunk_fraction_max: f32,
    /// Channels narrower than this are never created
    pub min_channel_width: f32,
    /// Delta branches never turn further than this from the coast heading
    pub max_heading_deviation: f32,
    /// Hard cap on delta recursion depth
    pub max_depth: usize,
    /// Branch endpoints closer than this collapse into one mouth
    pub merge_radius: f32,

    // =========================================================================
    // Curve shape
    // =========================================================================

    /// Peak lateral displacement of a channel from its straight chord
    pub bend_amplitude: f32,
    /// Bend noise frequency along the channel for a channel of reference width
    pub bend_frequency: f32,
    /// Width at which `bend_frequency` applies unscaled
    pub bend_reference_width: f32,
    /// Curve oversampling step used for distance projection
    pub curve_step: f32,

    // =========================================================================
    // Depth field
    // =========================================================================

    /// Relative channel width variation from width noise
    pub width_noise_strength: f32,
    pub width_noise_frequency: f32,

    // =========================================================================
    // Classification
    // =========================================================================

    /// Depth above which water may be deep
    pub deep_threshold: f32,
    pub shallow_noise_frequency: f32,
    /// Shallow noise above this value keeps deep-enough water shallow (fords)
    pub shallow_cutoff: f32,
    pub bank_width_min: f32,
    pub bank_width_max: f32,
    pub bank_noise_frequency: f32,
    /// Channels at least this wide clear roofs cell by cell; narrower ones in batches
    pub roof_clear_min_width: f32,
    /// Elevation drop per unit of water depth
    pub carve_depth_scale: f32,

    // =========================================================================
    // Flow field
    // =========================================================================

    /// Curve sampling step for the flow field
    pub flow_sample_step: f32,
}

impl Default for RiverParams {
    fn default() -> Self {
        Self {
            segment_length_min: 30.0,
            segment_length_max: 70.0,
            single_branch_chance: 0.10,
            branch_angle_min: 15.0,
            branch_angle_max: 30.0,
            branch_skew_max: 15.0,
            split_ratio_min: 0.33,
            split_ratio_max: 0.67,
            trunk_fraction_min: 0.2,
            trunk_fraction_max: 0.5,
            min_channel_width: 3.0,
            max_heading_deviation: 45.0,
            max_depth: 64,
            merge_radius: 10.0,

            bend_amplitude: 12.0,
            bend_frequency: 0.02,
            bend_reference_width: 10.0,
            curve_step: 1.0,

            width_noise_strength: 0.3,
            width_noise_frequency: 0.06,

            deep_threshold: 2.0,
            shallow_noise_frequency: 0.03,
            shallow_cutoff: 0.35,
            bank_width_min: 1.0,
            bank_width_max: 3.0,
            bank_noise_frequency: 0.08,
            roof_clear_min_width: 8.0,
            carve_depth_scale: 0.1,

            flow_sample_step: 2.0,
        }
    }
}

impl RiverParams {
    pub fn from_json_str(json: &str) -> Result<Self, ParamsError> {
        let params: RiverParams = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ParamsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let params = Self::from_json_str(&contents)?;
        tracing::info!(
            target: "river_generator::config",
            path = %path.display(),
            "river_params.loaded=file"
        );
        Ok(params)
    }

    pub fn to_json(&self) -> Result<String, ParamsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Largest bank band any cell can get
    pub fn bank_reach(&self) -> f32 {
        self.bank_width_max.max(self.bank_width_min)
    }

    fn noise_frequencies(&self) -> [(&'static str, f32); 4] {
        [
            ("bend_frequency", self.bend_frequency),
            ("width_noise_frequency", self.width_noise_frequency),
            ("shallow_noise_frequency", self.shallow_noise_frequency),
            ("bank_noise_frequency", self.bank_noise_frequency),
        ]
    }

    /// Check every field for consistency.
    pub fn validate(&self) -> Result<(), ParamsError> {
        fn invalid(field: &'static str, reason: impl Into<String>) -> ParamsError {
            ParamsError::Invalid {
                field,
                reason: reason.into(),
            }
        }

        let positive = [
            ("segment_length_min", self.segment_length_min),
            ("min_channel_width", self.min_channel_width),
            ("bend_reference_width", self.bend_reference_width),
            ("curve_step", self.curve_step),
            ("flow_sample_step", self.flow_sample_step),
            ("roof_clear_min_width", self.roof_clear_min_width),
        ];
        for (field, value) in positive {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(field, format!("must be positive, got {}", value)));
            }
        }

        let non_negative = [
            ("merge_radius", self.merge_radius),
            ("bend_amplitude", self.bend_amplitude),
            ("width_noise_strength", self.width_noise_strength),
            ("bank_width_min", self.bank_width_min),
            ("branch_skew_max", self.branch_skew_max),
            ("carve_depth_scale", self.carve_depth_scale),
            ("deep_threshold", self.deep_threshold),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(invalid(field, format!("must be non-negative, got {}", value)));
            }
        }

        for (field, value) in self.noise_frequencies() {
            if !(value > 0.0 && value <= MAX_NOISE_FREQUENCY) {
                return Err(invalid(
                    field,
                    format!("must lie in (0, {}], got {}", MAX_NOISE_FREQUENCY, value),
                ));
            }
        }
        for (field, value) in [("curve_step", self.curve_step), ("flow_sample_step", self.flow_sample_step)] {
            if value < MIN_SAMPLE_STEP {
                return Err(invalid(field, format!("must be at least {}, got {}", MIN_SAMPLE_STEP, value)));
            }
        }
        if !self.shallow_cutoff.is_finite() {
            return Err(invalid("shallow_cutoff", format!("must be finite, got {}", self.shallow_cutoff)));
        }

        let ranges = [
            ("segment_length_max", self.segment_length_min, self.segment_length_max),
            ("branch_angle_max", self.branch_angle_min, self.branch_angle_max),
            ("split_ratio_max", self.split_ratio_min, self.split_ratio_max),
            ("trunk_fraction_max", self.trunk_fraction_min, self.trunk_fraction_max),
            ("bank_width_max", self.bank_width_min, self.bank_width_max),
        ];
        for (field, lo, hi) in ranges {
            if hi < lo {
                return Err(invalid(field, format!("upper bound {} is below lower bound {}", hi, lo)));
            }
        }

        if !(0.0..=1.0).contains(&self.single_branch_chance) {
            return Err(invalid("single_branch_chance", "must lie in [0, 1]"));
        }
        if !(self.split_ratio_min > 0.0 && self.split_ratio_max < 1.0) {
            return Err(invalid("split_ratio_min", "split ratios must lie strictly inside (0, 1)"));
        }
        if !(self.trunk_fraction_min > 0.0 && self.trunk_fraction_max <= 1.0) {
            return Err(invalid("trunk_fraction_min", "trunk fractions must lie in (0, 1]"));
        }
        if !(self.max_heading_deviation > 0.0 && self.max_heading_deviation < 90.0) {
            return Err(invalid("max_heading_deviation", "must lie in (0, 90)"));
        }
        if self.branch_angle_max >= self.max_heading_deviation * 2.0 {
            return Err(invalid(
                "branch_angle_max",
                "must stay below twice the maximum heading deviation",
            ));
        }
        if self.max_depth == 0 {
            return Err(invalid("max_depth", "must be at least 1"));
        }

        Ok(())
    }

    /// Clamp a possibly inconsistent parameter set into a usable one.
    ///
    /// The generation pass runs on the result and therefore never fails on
    /// bad configuration; every correction is logged.
    pub fn sanitized(&self) -> Self {
        let mut p = self.clone();
        let defaults = RiverParams::default();
        let mut fixes = 0usize;

        let mut fix_positive = |field: &'static str, value: &mut f32, default: f32| {
            if !(*value > 0.0 && value.is_finite()) {
                tracing::warn!(target: "river_generator::config", field, value = *value, "river_params.clamped");
                *value = default;
                fixes += 1;
            }
        };
        fix_positive("segment_length_min", &mut p.segment_length_min, defaults.segment_length_min);
        fix_positive("min_channel_width", &mut p.min_channel_width, defaults.min_channel_width);
        fix_positive("bend_reference_width", &mut p.bend_reference_width, defaults.bend_reference_width);
        fix_positive("curve_step", &mut p.curve_step, defaults.curve_step);
        fix_positive("flow_sample_step", &mut p.flow_sample_step, defaults.flow_sample_step);
        fix_positive("roof_clear_min_width", &mut p.roof_clear_min_width, defaults.roof_clear_min_width);
        if !(p.max_heading_deviation > 0.0 && p.max_heading_deviation < 90.0) {
            tracing::warn!(target: "river_generator::config", field = "max_heading_deviation", value = p.max_heading_deviation, "river_params.clamped");
            p.max_heading_deviation = defaults.max_heading_deviation;
            fixes += 1;
        }

        for (field, value) in [
            ("merge_radius", &mut p.merge_radius),
            ("bend_amplitude", &mut p.bend_amplitude),
            ("width_noise_strength", &mut p.width_noise_strength),
            ("bank_width_min", &mut p.bank_width_min),
            ("branch_skew_max", &mut p.branch_skew_max),
            ("carve_depth_scale", &mut p.carve_depth_scale),
        ] {
            if !(*value >= 0.0 && value.is_finite()) {
                tracing::warn!(target: "river_generator::config", field, value = *value, "river_params.clamped");
                *value = 0.0;
                fixes += 1;
            }
        }

        for (field, value, default) in [
            ("bend_frequency", &mut p.bend_frequency, defaults.bend_frequency),
            ("width_noise_frequency", &mut p.width_noise_frequency, defaults.width_noise_frequency),
            ("shallow_noise_frequency", &mut p.shallow_noise_frequency, defaults.shallow_noise_frequency),
            ("bank_noise_frequency", &mut p.bank_noise_frequency, defaults.bank_noise_frequency),
        ] {
            if !(*value > 0.0 && *value <= MAX_NOISE_FREQUENCY) {
                tracing::warn!(target: "river_generator::config", field, value = *value, "river_params.frequency_reset");
                *value = default;
                fixes += 1;
            }
        }

        if !(p.deep_threshold >= 0.0 && p.deep_threshold.is_finite()) {
            tracing::warn!(target: "river_generator::config", field = "deep_threshold", value = p.deep_threshold, "river_params.clamped");
            p.deep_threshold = defaults.deep_threshold;
            fixes += 1;
        }
        if !p.shallow_cutoff.is_finite() {
            tracing::warn!(target: "river_generator::config", field = "shallow_cutoff", value = p.shallow_cutoff, "river_params.clamped");
            p.shallow_cutoff = defaults.shallow_cutoff;
            fixes += 1;
        }

        for (field, lo, hi, default_lo, default_hi) in [
            ("segment_length", &mut p.segment_length_min, &mut p.segment_length_max, defaults.segment_length_min, defaults.segment_length_max),
            ("branch_angle", &mut p.branch_angle_min, &mut p.branch_angle_max, defaults.branch_angle_min, defaults.branch_angle_max),
            ("split_ratio", &mut p.split_ratio_min, &mut p.split_ratio_max, defaults.split_ratio_min, defaults.split_ratio_max),
            ("trunk_fraction", &mut p.trunk_fraction_min, &mut p.trunk_fraction_max, defaults.trunk_fraction_min, defaults.trunk_fraction_max),
            ("bank_width", &mut p.bank_width_min, &mut p.bank_width_max, defaults.bank_width_min, defaults.bank_width_max),
        ] {
            if !(lo.is_finite() && hi.is_finite()) {
                tracing::warn!(target: "river_generator::config", field, lo = *lo, hi = *hi, "river_params.range_reset");
                *lo = default_lo;
                *hi = default_hi;
                fixes += 1;
            } else if *hi < *lo {
                tracing::warn!(target: "river_generator::config", field, lo = *lo, hi = *hi, "river_params.range_swapped");
                std::mem::swap(lo, hi);
                fixes += 1;
            }
        }

        p.single_branch_chance = clamp_logged("single_branch_chance", p.single_branch_chance, 0.0, 1.0, &mut fixes);
        p.split_ratio_min = clamp_logged("split_ratio_min", p.split_ratio_min, 0.05, 0.95, &mut fixes);
        p.split_ratio_max = clamp_logged("split_ratio_max", p.split_ratio_max, p.split_ratio_min, 0.95, &mut fixes);
        p.trunk_fraction_min = clamp_logged("trunk_fraction_min", p.trunk_fraction_min, 0.01, 1.0, &mut fixes);
        p.trunk_fraction_max = clamp_logged("trunk_fraction_max", p.trunk_fraction_max, p.trunk_fraction_min, 1.0, &mut fixes);
        p.branch_angle_min = clamp_logged("branch_angle_min", p.branch_angle_min, 0.0, p.max_heading_deviation, &mut fixes);
        p.branch_angle_max = clamp_logged("branch_angle_max", p.branch_angle_max, p.branch_angle_min, p.max_heading_deviation * 2.0 - 1.0, &mut fixes);
        p.curve_step = clamp_logged("curve_step", p.curve_step, MIN_SAMPLE_STEP, f32::MAX, &mut fixes);
        p.flow_sample_step = clamp_logged("flow_sample_step", p.flow_sample_step, MIN_SAMPLE_STEP, f32::MAX, &mut fixes);
        if p.max_depth == 0 {
            p.max_depth = defaults.max_depth;
            fixes += 1;
        }

        if fixes > 0 {
            tracing::warn!(target: "river_generator::config", fixes, "river_params.sanitized");
        }
        p
    }
}

fn clamp_logged(field: &'static str, value: f32, lo: f32, hi: f32, fixes: &mut usize) -> f32 {
    let clamped = if value.is_finite() { value.clamp(lo, hi.max(lo)) } else { lo };
    if clamped != value {
        tracing::warn!(target: "river_generator::config", field, value, clamped, "river_params.clamped");
        *fixes += 1;
    }
    clamped
}
