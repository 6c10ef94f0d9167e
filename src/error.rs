//! Error types for pcm-cvt.
//!
//! Errors are split into two categories:
//! - **Build errors** ([`BuildError`]): no conversion plan exists for the requested
//!   source/destination pair. Raised once, at format negotiation time.
//! - **Execute errors** ([`ExecuteError`]): the caller broke a buffer precondition
//!   when running a plan. A correctly sized call never fails.

use crate::format::SampleFormat;

/// Fatal errors that prevent a conversion plan from being built.
///
/// These are returned from [`PlanBuilder::build()`] and are deterministic: the same
/// arguments always produce the same error. Callers should fall back to another
/// destination format rather than retry.
///
/// [`PlanBuilder::build()`]: crate::PlanBuilder::build
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// The sample encoding has no defined representation (e.g. unsigned 32-bit).
    #[error("unsupported sample format: {format}")]
    UnsupportedSampleFormat {
        /// The format that was rejected.
        format: SampleFormat,
    },

    /// A compact format code has bits set that no encoding defines.
    #[error("unknown sample format code: {code:#06x}")]
    UnknownFormatCode {
        /// The raw code.
        code: u16,
    },

    /// A channel count outside the supported layouts (1, 2, 4, 6).
    #[error("unsupported channel count: {channels}")]
    UnsupportedChannelCount {
        /// The rejected channel count.
        channels: u16,
    },

    /// The remap primitives cannot bridge the two channel counts.
    #[error("no channel conversion from {from} to {to} channels")]
    UnsupportedChannelTopology {
        /// Source channel count.
        from: u16,
        /// Destination channel count.
        to: u16,
    },

    /// A sample rate of zero.
    #[error("invalid sample rate: {rate}Hz")]
    InvalidSampleRate {
        /// The rejected rate.
        rate: u32,
    },

    /// The FIR sinc length is odd or outside the accepted range.
    #[error("sinc length {requested} out of range (must be even, {min}..={max})")]
    SincLengthOutOfRange {
        /// The requested sinc length.
        requested: usize,
        /// Smallest accepted length.
        min: usize,
        /// Largest accepted length.
        max: usize,
    },

    /// Filter storage could not be allocated.
    #[error("failed to allocate {bytes} bytes for {what}")]
    AllocationFailure {
        /// What was being allocated.
        what: &'static str,
        /// Requested size in bytes.
        bytes: usize,
    },
}

/// Buffer precondition violations reported by [`ConversionPlan::execute()`].
///
/// [`ConversionPlan::execute()`]: crate::ConversionPlan::execute
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecuteError {
    /// The buffer cannot hold the largest intermediate result of the plan.
    #[error("buffer too small: {required} bytes required, {provided} provided")]
    BufferTooSmall {
        /// Capacity the plan needs for this input length.
        required: usize,
        /// Length of the buffer that was passed in.
        provided: usize,
    },

    /// The declared input length runs past the end of the buffer.
    #[error("input length {input_len} exceeds buffer length {buffer_len}")]
    InputLengthExceedsBuffer {
        /// Declared input length in bytes.
        input_len: usize,
        /// Length of the buffer.
        buffer_len: usize,
    },

    /// The input does not hold a whole number of source frames.
    #[error("input length {input_len} is not a multiple of the {frame_size}-byte frame")]
    PartialFrame {
        /// Declared input length in bytes.
        input_len: usize,
        /// Source frame size in bytes.
        frame_size: usize,
    },
}

/// Either failure of the one-shot [`convert_bytes`] helper.
///
/// [`convert_bytes`]: crate::convert_bytes
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    /// No plan exists between the two specs.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// The input could not be converted.
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

impl BuildError {
    /// Creates an allocation failure for `count` elements of `T`.
    pub(crate) fn allocation<T>(what: &'static str, count: usize) -> Self {
        Self::AllocationFailure {
            what,
            bytes: count.saturating_mul(std::mem::size_of::<T>()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_error_display() {
        let err = BuildError::UnsupportedChannelTopology { from: 4, to: 6 };
        assert_eq!(err.to_string(), "no channel conversion from 4 to 6 channels");
    }

    #[test]
    fn test_unknown_code_display() {
        let err = BuildError::UnknownFormatCode { code: 0x0042 };
        assert_eq!(err.to_string(), "unknown sample format code: 0x0042");
    }

    #[test]
    fn test_allocation_failure_bytes() {
        let err = BuildError::allocation::<f64>("fir coefficients", 769);
        assert_eq!(
            err,
            BuildError::AllocationFailure {
                what: "fir coefficients",
                bytes: 769 * 8
            }
        );
    }

    #[test]
    fn test_convert_error_from() {
        let err: ConvertError = BuildError::InvalidSampleRate { rate: 0 }.into();
        assert_eq!(err.to_string(), "invalid sample rate: 0Hz");
        assert!(matches!(err, ConvertError::Build(_)));
    }

    #[test]
    fn test_execute_error_display() {
        let err = ExecuteError::BufferTooSmall {
            required: 1600,
            provided: 800,
        };
        assert_eq!(
            err.to_string(),
            "buffer too small: 1600 bytes required, 800 provided"
        );
    }
}
