//! Configuration types for conversion plans.

use crate::format::resample::{check_sinc_length, DEFAULT_SINC_LENGTH};
use crate::format::{AudioSpec, SampleFormat};
use crate::BuildError;

/// Preset audio specs for common use cases.
///
/// Handy as a source or destination when negotiating a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatPreset {
    /// 16kHz mono signed 16-bit - what speech-to-text services like Deepgram and
    /// `AssemblyAI` expect.
    #[default]
    Transcription,

    /// 44.1kHz stereo signed 16-bit little-endian.
    CdAudio,

    /// 48kHz stereo 32-bit float.
    Studio,

    /// 8kHz mono signed 16-bit.
    Telephony,

    /// 48kHz 5.1 signed 16-bit little-endian.
    Surround51,
}

impl FormatPreset {
    /// Returns the sample format for this preset.
    #[must_use]
    pub fn format(&self) -> SampleFormat {
        match self {
            Self::Transcription | Self::Telephony => SampleFormat::S16SYS,
            Self::CdAudio | Self::Surround51 => SampleFormat::S16LSB,
            Self::Studio => SampleFormat::F32SYS,
        }
    }

    /// Returns the sample rate for this preset.
    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Transcription => 16000,
            Self::CdAudio => 44100,
            Self::Studio | Self::Surround51 => 48000,
            Self::Telephony => 8000,
        }
    }

    /// Returns the channel count for this preset.
    #[must_use]
    pub fn channels(&self) -> u16 {
        match self {
            Self::Transcription | Self::Telephony => 1,
            Self::CdAudio | Self::Studio => 2,
            Self::Surround51 => 6,
        }
    }

    /// Returns the full audio spec for this preset.
    #[must_use]
    pub fn spec(&self) -> AudioSpec {
        AudioSpec::new(self.format(), self.channels(), self.sample_rate())
    }
}

impl From<FormatPreset> for AudioSpec {
    fn from(preset: FormatPreset) -> Self {
        preset.spec()
    }
}

/// Tunables for building conversion plans.
///
/// Use [`ConverterConfig::default()`] for sensible defaults, or customize as needed.
///
/// # Example
///
/// ```
/// use pcm_cvt::ConverterConfig;
///
/// let config = ConverterConfig {
///     sinc_length: 256,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterConfig {
    /// Sinc zero crossings spanned by the resampling filter, doubled.
    ///
    /// The designed filter has `sinc_length / 2 * max(up, down)` taps plus one,
    /// so the cutoff stays equally sharp whatever the rate ratio. Longer filters
    /// give a sharper cutoff at the cost of latency and CPU.
    /// Must be even and within `2..=65536`.
    /// Default: 768
    pub sinc_length: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            sinc_length: DEFAULT_SINC_LENGTH,
        }
    }
}

impl ConverterConfig {
    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// `SincLengthOutOfRange` if `sinc_length` is odd or out of bounds.
    pub fn validate(&self) -> Result<(), BuildError> {
        check_sinc_length(self.sinc_length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_preset_transcription() {
        let spec = FormatPreset::Transcription.spec();
        assert_eq!(spec.rate, 16000);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.format, SampleFormat::S16SYS);
    }

    #[test]
    fn test_format_preset_surround() {
        let spec: AudioSpec = FormatPreset::Surround51.into();
        assert_eq!(spec.channels, 6);
        assert_eq!(spec.frame_size(), 12);
    }

    #[test]
    fn test_format_preset_default() {
        assert_eq!(FormatPreset::default(), FormatPreset::Transcription);
    }

    #[test]
    fn test_presets_are_valid() {
        for preset in [
            FormatPreset::Transcription,
            FormatPreset::CdAudio,
            FormatPreset::Studio,
            FormatPreset::Telephony,
            FormatPreset::Surround51,
        ] {
            assert!(preset.format().validate().is_ok(), "{preset:?}");
        }
    }

    #[test]
    fn test_converter_config_defaults() {
        let config = ConverterConfig::default();
        assert_eq!(config.sinc_length, 768);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_converter_config_rejects_odd_length() {
        let config = ConverterConfig { sinc_length: 101 };
        assert!(matches!(
            config.validate(),
            Err(BuildError::SincLengthOutOfRange { requested: 101, .. })
        ));
    }
}
