//! CPAL interop for negotiating plans against real devices.
//!
//! Maps a CPAL stream configuration onto an [`AudioSpec`] so a playback or
//! capture path can build its [`ConversionPlan`] straight from what the device
//! reports.

use cpal::SupportedStreamConfig;

use crate::format::{AudioSpec, SampleFormat};
use crate::{BuildError, ConversionPlan, PlanBuilder};

impl TryFrom<cpal::SampleFormat> for SampleFormat {
    type Error = BuildError;

    /// CPAL samples are always in the platform's byte order.
    fn try_from(format: cpal::SampleFormat) -> Result<Self, Self::Error> {
        let converted = Self::new(
            (format.sample_size() * 8) as u8,
            format.is_float(),
            !format.is_uint(),
            cfg!(target_endian = "big"),
        );
        converted.validate()?;
        Ok(converted)
    }
}

/// Returns the spec of audio flowing through a stream opened with `config`.
///
/// # Errors
///
/// `UnsupportedSampleFormat` for CPAL formats with no PCM mapping here
/// (64-bit and unsigned 32-bit samples).
pub fn spec_from_config(config: &SupportedStreamConfig) -> Result<AudioSpec, BuildError> {
    Ok(AudioSpec::new(
        config.sample_format().try_into()?,
        config.channels(),
        config.sample_rate().0,
    ))
}

/// Builds a playback plan from application audio to what the device accepts.
///
/// # Errors
///
/// Any [`BuildError`]; callers should try another device config before giving up.
pub fn negotiate_playback(
    source: AudioSpec,
    device: &SupportedStreamConfig,
) -> Result<ConversionPlan, BuildError> {
    PlanBuilder::new(source, spec_from_config(device)?).build()
}

/// Builds a capture plan from what the device delivers to what the application wants.
///
/// # Errors
///
/// Any [`BuildError`].
pub fn negotiate_capture(
    device: &SupportedStreamConfig,
    dest: AudioSpec,
) -> Result<ConversionPlan, BuildError> {
    PlanBuilder::new(spec_from_config(device)?, dest).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FormatPreset, StageKind};

    fn config(channels: u16, rate: u32, format: cpal::SampleFormat) -> SupportedStreamConfig {
        SupportedStreamConfig::new(
            channels,
            cpal::SampleRate(rate),
            cpal::SupportedBufferSize::Unknown,
            format,
        )
    }

    #[test]
    fn test_sample_format_mapping() {
        assert_eq!(
            SampleFormat::try_from(cpal::SampleFormat::F32),
            Ok(SampleFormat::F32SYS)
        );
        assert_eq!(
            SampleFormat::try_from(cpal::SampleFormat::I16),
            Ok(SampleFormat::S16SYS)
        );
        assert_eq!(
            SampleFormat::try_from(cpal::SampleFormat::U8),
            Ok(SampleFormat::U8)
        );
    }

    #[test]
    fn test_rejects_wide_formats() {
        assert!(SampleFormat::try_from(cpal::SampleFormat::F64).is_err());
        assert!(SampleFormat::try_from(cpal::SampleFormat::U32).is_err());
    }

    #[test]
    fn test_spec_from_config() {
        let spec = spec_from_config(&config(2, 48000, cpal::SampleFormat::F32)).unwrap();
        assert_eq!(spec, FormatPreset::Studio.spec());
    }

    #[test]
    fn test_negotiate_capture_for_transcription() {
        let device = config(2, 48000, cpal::SampleFormat::F32);
        let plan = negotiate_capture(&device, FormatPreset::Transcription.spec()).unwrap();
        assert_eq!(
            plan.stage_kinds(),
            vec![
                StageKind::TypeConvert {
                    from: SampleFormat::F32SYS,
                    to: SampleFormat::S16SYS
                },
                StageKind::ChannelContract(crate::ContractKind::HalvePairs),
                StageKind::RateConvert { up: 1, down: 3 },
            ]
        );
    }

    #[test]
    fn test_negotiate_playback_unsupported_device() {
        let device = config(2, 48000, cpal::SampleFormat::F64);
        assert!(matches!(
            negotiate_playback(FormatPreset::CdAudio.spec(), &device),
            Err(BuildError::UnsupportedSampleFormat { .. })
        ));
    }
}
