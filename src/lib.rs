//! # pcm-cvt
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! PCM audio conversion between arbitrary sample formats, channel layouts and
//! sample rates.
//!
//! `pcm-cvt` negotiates a [`ConversionPlan`] once, when a stream is opened, and
//! then runs it over each audio block in place. Plans chain three kinds of
//! stages: sample type conversion, channel remapping (mono/stereo/quad/5.1) and
//! FIR-based sample rate conversion.
//!
//! ## Quick Start
//!
//! ```rust
//! use pcm_cvt::{AudioSpec, ConversionPlan, FormatPreset, SampleFormat};
//!
//! let source = AudioSpec::new(SampleFormat::F32SYS, 2, 48000);
//! let plan = ConversionPlan::new(source, FormatPreset::Transcription.spec())?;
//!
//! // 10ms of stereo float audio at 48kHz
//! let input = vec![0u8; source.frame_size() * 480];
//! let mut buf = input.clone();
//! buf.resize(plan.required_capacity(input.len()), 0);
//!
//! let len = plan.execute(&mut buf, input.len())?;
//! assert_eq!(len, 160 * 2); // 160 mono 16-bit frames
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **Build**: [`PlanBuilder`] validates both specs and assembles the stages. All
//!   failures ([`BuildError`]) happen here and are deterministic.
//! - **Execute**: [`ConversionPlan::execute`] runs the stages in order over one
//!   buffer. It never allocates; the caller sizes the buffer with
//!   [`ConversionPlan::required_capacity`].
//!
//! The resampler keeps its filter history and decimation phase between blocks,
//! so converting a stream block by block gives the same samples as converting
//! it in one call. Call [`ConversionPlan::reset_filter_state`] when switching
//! to unrelated audio.

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod buffer;
mod builder;
mod config;
#[cfg(feature = "cpal")]
pub mod device;
mod error;
pub mod format;
mod plan;

pub use buffer::ConvertBuffer;
pub use builder::{build_plan, PlanBuilder};
pub use config::{ConverterConfig, FormatPreset};
pub use error::{BuildError, ConvertError, ExecuteError};
pub use format::{AudioSpec, ContractKind, ExpandKind, SampleFormat};
pub use plan::{ConversionPlan, ConversionStage, StageKind};

/// Converts a whole clip from one spec to another in a single call.
///
/// Builds a fresh plan, so the resampler starts from silence. For streams,
/// build a plan once and execute it per block instead.
///
/// # Errors
///
/// [`ConvertError::Build`] if no plan exists between the specs, and
/// [`ConvertError::Execute`] if `input` is not a whole number of source frames.
///
/// # Example
///
/// ```
/// use pcm_cvt::{convert_bytes, AudioSpec, SampleFormat};
///
/// let mono = AudioSpec::new(SampleFormat::U8, 1, 8000);
/// let stereo = AudioSpec::new(SampleFormat::U8, 2, 8000);
/// assert_eq!(convert_bytes(mono, stereo, &[1, 2])?, [1, 1, 2, 2]);
/// # Ok::<(), pcm_cvt::ConvertError>(())
/// ```
pub fn convert_bytes(
    source: AudioSpec,
    dest: AudioSpec,
    input: &[u8],
) -> Result<Vec<u8>, ConvertError> {
    let plan = ConversionPlan::new(source, dest)?;
    let mut buf = Vec::with_capacity(plan.required_capacity(input.len()));
    buf.extend_from_slice(input);
    buf.resize(plan.required_capacity(input.len()), 0);
    let len = plan.execute(&mut buf, input.len())?;
    buf.truncate(len);
    Ok(buf)
}
