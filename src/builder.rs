//! Builder for [`ConversionPlan`].

use crate::format::channels::{bridge, RemapStep};
use crate::format::{
    AudioSpec, ChannelContract, ChannelExpand, RateConverter, SampleFormat, TypeConverter,
};
use crate::plan::{ConversionPlan, ConversionStage};
use crate::{BuildError, ConverterConfig};

/// Channel counts a plan can start or end on.
const SUPPORTED_CHANNELS: [u16; 4] = [1, 2, 4, 6];

/// Builder for negotiating a [`ConversionPlan`] between two audio specs.
///
/// # Example
///
/// ```
/// use pcm_cvt::{AudioSpec, PlanBuilder, SampleFormat};
///
/// let plan = PlanBuilder::new(
///     AudioSpec::new(SampleFormat::S16LSB, 1, 11025),
///     AudioSpec::new(SampleFormat::S16LSB, 2, 44100),
/// )
/// .build()?;
///
/// assert!(plan.needed());
/// # Ok::<(), pcm_cvt::BuildError>(())
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    source: AudioSpec,
    dest: AudioSpec,
    config: ConverterConfig,
}

impl PlanBuilder {
    /// Creates a builder converting `source` audio into `dest` audio.
    pub fn new(source: AudioSpec, dest: AudioSpec) -> Self {
        Self {
            source,
            dest,
            config: ConverterConfig::default(),
        }
    }

    /// Set custom converter configuration.
    pub fn with_config(mut self, config: ConverterConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the resampling filter's sinc length.
    pub fn sinc_length(mut self, sinc_length: usize) -> Self {
        self.config.sinc_length = sinc_length;
        self
    }

    /// Validates both specs and the configuration.
    fn validate(&self) -> Result<(), BuildError> {
        for spec in [self.source, self.dest] {
            spec.format.validate()?;
            if !SUPPORTED_CHANNELS.contains(&spec.channels) {
                return Err(BuildError::UnsupportedChannelCount {
                    channels: spec.channels,
                });
            }
            if spec.rate == 0 {
                return Err(BuildError::InvalidSampleRate { rate: spec.rate });
            }
        }
        self.config.validate()
    }

    /// Assembles the stage chain.
    ///
    /// Stages run in a fixed order: sample type first, then channels in the
    /// destination encoding, then rate with the destination layout.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if either spec is unsupported, the channel counts
    /// cannot be bridged, or filter storage cannot be allocated. Building is
    /// deterministic: the same arguments always give the same outcome.
    pub fn build(self) -> Result<ConversionPlan, BuildError> {
        match self.assemble() {
            Ok(plan) => {
                tracing::debug!(
                    source = ?self.source,
                    dest = ?self.dest,
                    stages = ?plan.stage_kinds(),
                    len_mult = plan.len_mult,
                    len_ratio = plan.len_ratio,
                    "built conversion plan"
                );
                Ok(plan)
            }
            Err(e) => {
                tracing::debug!(
                    source = ?self.source,
                    dest = ?self.dest,
                    error = %e,
                    "no conversion plan"
                );
                Err(e)
            }
        }
    }

    fn assemble(&self) -> Result<ConversionPlan, BuildError> {
        self.validate()?;

        let src = self.source;
        let dst = self.dest;
        let mut stages = Vec::new();
        let mut len_mult = 1u32;
        let mut len_ratio = 1.0f64;

        if src.format != dst.format {
            let from = src.format.bytes() as u32;
            let to = dst.format.bytes() as u32;
            if to > from {
                len_mult *= to / from;
            }
            len_ratio *= f64::from(to) / f64::from(from);
            stages.push(ConversionStage::TypeConvert(TypeConverter::new(
                src.format, dst.format,
            )?));
        }

        if src.channels != dst.channels {
            let steps = bridge(src.channels, dst.channels).ok_or(
                BuildError::UnsupportedChannelTopology {
                    from: src.channels,
                    to: dst.channels,
                },
            )?;
            for step in steps {
                match step {
                    RemapStep::Expand(kind) => {
                        len_mult *= kind.factor();
                        len_ratio *= f64::from(kind.factor());
                        stages.push(ConversionStage::ChannelExpand(ChannelExpand::new(
                            kind, dst.format,
                        )?));
                    }
                    RemapStep::Contract(kind) => {
                        let (from, to) = kind.ratio();
                        len_ratio *= f64::from(to) / f64::from(from);
                        stages.push(ConversionStage::ChannelContract(ChannelContract::new(
                            kind, dst.format,
                        )?));
                    }
                }
            }
        }

        if src.rate != dst.rate {
            let rate = RateConverter::new(
                src.rate,
                dst.rate,
                dst.format,
                dst.channels,
                self.config.sinc_length,
            )?;
            len_mult = len_mult.saturating_mul(rate.up());
            len_ratio *= f64::from(rate.up()) / f64::from(rate.down());
            stages.push(ConversionStage::RateConvert(rate));
        }

        Ok(ConversionPlan {
            stages,
            len_mult,
            len_ratio,
            source: src,
            dest: dst,
        })
    }
}

/// Builds a plan from plain format, channel and rate values.
///
/// # Errors
///
/// See [`PlanBuilder::build`].
pub fn build_plan(
    src_format: SampleFormat,
    src_channels: u16,
    src_rate: u32,
    dst_format: SampleFormat,
    dst_channels: u16,
    dst_rate: u32,
) -> Result<ConversionPlan, BuildError> {
    PlanBuilder::new(
        AudioSpec::new(src_format, src_channels, src_rate),
        AudioSpec::new(dst_format, dst_channels, dst_rate),
    )
    .build()
}
