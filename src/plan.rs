//! Conversion plans and the chain executor.
//!
//! A [`ConversionPlan`] is an ordered list of [`ConversionStage`]s built once by
//! [`PlanBuilder`](crate::PlanBuilder). Running it feeds each stage's output length
//! into the next stage, all within one caller-supplied buffer.

use crate::format::{
    AudioSpec, ChannelContract, ChannelExpand, ContractKind, ExpandKind, RateConverter,
    SampleFormat, TypeConverter,
};
use crate::{BuildError, ExecuteError, PlanBuilder};

/// One step of a conversion plan.
#[derive(Debug)]
pub enum ConversionStage {
    /// Sample encoding change.
    TypeConvert(TypeConverter),
    /// Channel count increase.
    ChannelExpand(ChannelExpand),
    /// Channel count decrease.
    ChannelContract(ChannelContract),
    /// Sample rate change; the only stage with state.
    RateConvert(RateConverter),
}

/// A plain description of a stage, for inspecting and comparing plans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// See [`ConversionStage::TypeConvert`].
    TypeConvert {
        /// Source encoding.
        from: SampleFormat,
        /// Destination encoding.
        to: SampleFormat,
    },
    /// See [`ConversionStage::ChannelExpand`].
    ChannelExpand(ExpandKind),
    /// See [`ConversionStage::ChannelContract`].
    ChannelContract(ContractKind),
    /// See [`ConversionStage::RateConvert`].
    RateConvert {
        /// Interpolation factor.
        up: u32,
        /// Decimation factor.
        down: u32,
    },
}

impl ConversionStage {
    /// Describes this stage.
    #[must_use]
    pub fn kind(&self) -> StageKind {
        match self {
            Self::TypeConvert(stage) => StageKind::TypeConvert {
                from: stage.from_format(),
                to: stage.to_format(),
            },
            Self::ChannelExpand(stage) => StageKind::ChannelExpand(stage.kind()),
            Self::ChannelContract(stage) => StageKind::ChannelContract(stage.kind()),
            Self::RateConvert(stage) => StageKind::RateConvert {
                up: stage.up(),
                down: stage.down(),
            },
        }
    }

    /// Output length in bytes for `len` input bytes.
    #[must_use]
    pub fn output_len(&self, len: usize) -> usize {
        match self {
            Self::TypeConvert(stage) => stage.output_len(len),
            Self::ChannelExpand(stage) => stage.output_len(len),
            Self::ChannelContract(stage) => stage.output_len(len),
            Self::RateConvert(stage) => stage.output_len(len),
        }
    }

    /// Buffer bytes this stage touches while processing `len` input bytes.
    #[must_use]
    pub fn required_capacity(&self, len: usize) -> usize {
        match self {
            Self::RateConvert(stage) => stage.required_capacity(len),
            _ => len.max(self.output_len(len)),
        }
    }

    fn process(&self, buf: &mut [u8], len: usize) -> usize {
        match self {
            Self::TypeConvert(stage) => stage.process(buf, len),
            Self::ChannelExpand(stage) => stage.process(buf, len),
            Self::ChannelContract(stage) => stage.process(buf, len),
            Self::RateConvert(stage) => stage.process(buf, len),
        }
    }
}

/// An ordered, immutable chain of conversion stages.
///
/// A plan with no stages is the identity: [`ConversionPlan::needed`] is `false`
/// and executing it returns the input length untouched.
///
/// Plans are `Send + Sync`. The only mutable state is the resampling filter's
/// history, which sits behind a lock, so concurrent executions of one plan are
/// serialized rather than interleaved. For parallel resampling, build one plan
/// per thread.
#[derive(Debug)]
pub struct ConversionPlan {
    pub(crate) stages: Vec<ConversionStage>,
    pub(crate) len_mult: u32,
    pub(crate) len_ratio: f64,
    pub(crate) source: AudioSpec,
    pub(crate) dest: AudioSpec,
}

impl ConversionPlan {
    /// Shorthand for [`PlanBuilder::new`] followed by [`PlanBuilder::build`].
    ///
    /// # Errors
    ///
    /// Any [`BuildError`] from the builder.
    pub fn new(source: AudioSpec, dest: AudioSpec) -> Result<Self, BuildError> {
        PlanBuilder::new(source, dest).build()
    }

    /// Returns `true` if the plan changes the audio at all.
    #[must_use]
    pub fn needed(&self) -> bool {
        !self.stages.is_empty()
    }

    /// The stages, in execution order.
    #[must_use]
    pub fn stages(&self) -> &[ConversionStage] {
        &self.stages
    }

    /// The kind of each stage, in execution order.
    #[must_use]
    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(ConversionStage::kind).collect()
    }

    /// Worst-case integer growth factor of any stage's buffer use.
    #[must_use]
    pub fn len_mult(&self) -> u32 {
        self.len_mult
    }

    /// Net ratio of output length to input length.
    #[must_use]
    pub fn len_ratio(&self) -> f64 {
        self.len_ratio
    }

    /// Spec of the audio the plan consumes.
    #[must_use]
    pub fn source(&self) -> AudioSpec {
        self.source
    }

    /// Spec of the audio the plan produces.
    #[must_use]
    pub fn dest(&self) -> AudioSpec {
        self.dest
    }

    /// Output length in bytes for `input_len` bytes of source audio, at the
    /// start of a stream.
    ///
    /// Mid-stream, a resampling plan may return one destination frame more than
    /// this as the decimation phase carries over; [`ConversionPlan::execute`]
    /// returns the actual length.
    #[must_use]
    pub fn output_len(&self, input_len: usize) -> usize {
        self.stages
            .iter()
            .fold(input_len, |len, stage| stage.output_len(len))
    }

    /// Exact buffer length needed to execute on `input_len` bytes.
    ///
    /// This is the largest intermediate size across all stages, and never less
    /// than `input_len`. It holds whatever state the resampler carries.
    #[must_use]
    pub fn required_capacity(&self, input_len: usize) -> usize {
        let mut len = input_len;
        let mut required = input_len;
        for stage in &self.stages {
            required = required.max(stage.required_capacity(len));
            len = stage.output_len(len);
        }
        required
    }

    /// Clears any resampling history so the next execution starts from silence.
    ///
    /// Use this between unrelated streams. Consecutive blocks of one stream should
    /// keep the history and decimation phase, so that converting them one by one
    /// matches converting their concatenation.
    pub fn reset_filter_state(&self) {
        for stage in &self.stages {
            if let ConversionStage::RateConvert(rate) = stage {
                rate.reset();
            }
        }
    }

    /// Runs every stage over the first `input_len` bytes of `buf`, in place.
    ///
    /// Returns the number of valid output bytes at the start of `buf`.
    ///
    /// # Errors
    ///
    /// Only for violated preconditions: `input_len` must fit in `buf`, be a whole
    /// number of source frames, and `buf` must hold
    /// [`ConversionPlan::required_capacity`] bytes.
    pub fn execute(&self, buf: &mut [u8], input_len: usize) -> Result<usize, ExecuteError> {
        if let Err(e) = self.check(buf.len(), input_len) {
            tracing::warn!(error = %e, "rejecting conversion");
            return Err(e);
        }

        let mut len = input_len;
        for stage in &self.stages {
            let out = stage.process(buf, len);
            tracing::trace!(stage = ?stage.kind(), len_in = len, len_out = out, "stage done");
            len = out;
        }
        Ok(len)
    }

    fn check(&self, buffer_len: usize, input_len: usize) -> Result<(), ExecuteError> {
        if input_len > buffer_len {
            return Err(ExecuteError::InputLengthExceedsBuffer {
                input_len,
                buffer_len,
            });
        }
        let frame_size = self.source.frame_size();
        if frame_size != 0 && input_len % frame_size != 0 {
            return Err(ExecuteError::PartialFrame {
                input_len,
                frame_size,
            });
        }
        let required = self.required_capacity(input_len);
        if buffer_len < required {
            return Err(ExecuteError::BufferTooSmall {
                required,
                provided: buffer_len,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(format: SampleFormat, channels: u16, rate: u32) -> AudioSpec {
        AudioSpec::new(format, channels, rate)
    }

    #[test]
    fn test_plan_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConversionPlan>();
    }

    #[test]
    fn test_identity_plan() {
        let s = spec(SampleFormat::S16LSB, 2, 44100);
        let plan = ConversionPlan::new(s, s).unwrap();
        assert!(!plan.needed());
        assert!(plan.stages().is_empty());
        assert_eq!(plan.len_mult(), 1);
        assert_eq!(plan.len_ratio(), 1.0);

        let mut buf = vec![1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(plan.execute(&mut buf, 8), Ok(8));
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_stage_kinds() {
        let plan = ConversionPlan::new(
            spec(SampleFormat::U8, 6, 48000),
            spec(SampleFormat::S16LSB, 2, 16000),
        )
        .unwrap();
        assert_eq!(
            plan.stage_kinds(),
            vec![
                StageKind::TypeConvert {
                    from: SampleFormat::U8,
                    to: SampleFormat::S16LSB
                },
                StageKind::ChannelContract(ContractKind::SixToStereo),
                StageKind::RateConvert { up: 1, down: 3 },
            ]
        );
    }

    #[test]
    fn test_required_capacity_covers_widest_stage() {
        // U8 mono -> S16 stereo: widest point is the final 4x buffer
        let plan = ConversionPlan::new(
            spec(SampleFormat::U8, 1, 8000),
            spec(SampleFormat::S16LSB, 2, 8000),
        )
        .unwrap();
        assert_eq!(plan.required_capacity(100), 400);
        assert_eq!(plan.output_len(100), 400);

        // S16 stereo -> U8 mono at a lower rate: the input itself is widest
        let plan = ConversionPlan::new(
            spec(SampleFormat::S16LSB, 2, 48000),
            spec(SampleFormat::U8, 1, 16000),
        )
        .unwrap();
        assert_eq!(plan.required_capacity(400), 400);
        assert_eq!(plan.output_len(400), 100 / 3);
    }

    #[test]
    fn test_execute_rejects_small_buffer() {
        let plan = ConversionPlan::new(
            spec(SampleFormat::S16LSB, 1, 8000),
            spec(SampleFormat::S16LSB, 2, 8000),
        )
        .unwrap();
        let mut buf = vec![0u8; 8];
        assert_eq!(
            plan.execute(&mut buf, 8),
            Err(ExecuteError::BufferTooSmall {
                required: 16,
                provided: 8
            })
        );
    }

    #[test]
    fn test_execute_guards_resampler_buffer() {
        let plan = ConversionPlan::new(
            spec(SampleFormat::S16LSB, 1, 8000),
            spec(SampleFormat::S16LSB, 1, 16000),
        )
        .unwrap();
        let mut short = vec![0u8; 4];
        assert_eq!(
            plan.execute(&mut short, 8),
            Err(ExecuteError::InputLengthExceedsBuffer {
                input_len: 8,
                buffer_len: 4
            })
        );
        let mut exact = vec![0u8; 8];
        assert_eq!(
            plan.execute(&mut exact, 8),
            Err(ExecuteError::BufferTooSmall {
                required: 16,
                provided: 8
            })
        );
        assert_eq!(plan.stages()[0].required_capacity(8), 16);
    }

    #[test]
    fn test_execute_rejects_partial_frame() {
        let plan = ConversionPlan::new(
            spec(SampleFormat::S16LSB, 2, 8000),
            spec(SampleFormat::S16LSB, 1, 8000),
        )
        .unwrap();
        let mut buf = vec![0u8; 16];
        assert_eq!(
            plan.execute(&mut buf, 6),
            Err(ExecuteError::PartialFrame {
                input_len: 6,
                frame_size: 4
            })
        );
    }

    #[test]
    fn test_execute_rejects_overlong_input() {
        let s = spec(SampleFormat::U8, 1, 8000);
        let plan = ConversionPlan::new(s, s).unwrap();
        let mut buf = vec![0u8; 4];
        assert_eq!(
            plan.execute(&mut buf, 5),
            Err(ExecuteError::InputLengthExceedsBuffer {
                input_len: 5,
                buffer_len: 4
            })
        );
    }

    #[test]
    fn test_execute_type_and_channels() {
        let plan = ConversionPlan::new(
            spec(SampleFormat::U8, 1, 8000),
            spec(SampleFormat::S16LSB, 2, 8000),
        )
        .unwrap();
        let mut buf = vec![0u8; plan.required_capacity(2)];
        buf[0] = 0x80;
        buf[1] = 0xFF;
        let len = plan.execute(&mut buf, 2).unwrap();
        assert_eq!(len, 8);
        let samples: Vec<i16> = buf[..len]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(samples, [0, 0, 0x7F00, 0x7F00]);
    }

    #[test]
    fn test_reset_filter_state() {
        let plan = ConversionPlan::new(
            spec(SampleFormat::S16LSB, 1, 8000),
            spec(SampleFormat::S16LSB, 1, 16000),
        )
        .unwrap();
        let input: Vec<u8> = [3000i16; 64].iter().flat_map(|s| s.to_le_bytes()).collect();
        let run = || {
            let mut buf = input.clone();
            buf.resize(plan.required_capacity(input.len()), 0);
            let len = plan.execute(&mut buf, input.len()).unwrap();
            buf.truncate(len);
            buf
        };
        let first = run();
        let second = run();
        assert_ne!(first, second);
        plan.reset_filter_state();
        assert_eq!(run(), first);
    }
}
