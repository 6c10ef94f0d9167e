//! Sample format model.

use std::fmt;
use std::time::Duration;

use crate::BuildError;

const MASK_BITSIZE: u16 = 0x00FF;
const MASK_FLOAT: u16 = 1 << 8;
const MASK_BIG_ENDIAN: u16 = 1 << 12;
const MASK_SIGNED: u16 = 1 << 15;
const MASK_DEFINED: u16 = MASK_BITSIZE | MASK_FLOAT | MASK_BIG_ENDIAN | MASK_SIGNED;

const NATIVE_BIG_ENDIAN: bool = cfg!(target_endian = "big");

/// Describes how a single PCM sample is encoded.
///
/// Formats compare structurally. The byte order of 8-bit formats is always
/// reported as little-endian since a single byte has no order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleFormat {
    bits: u8,
    float: bool,
    signed: bool,
    big_endian: bool,
}

impl SampleFormat {
    /// Unsigned 8-bit.
    pub const U8: Self = Self::new(8, false, false, false);
    /// Signed 8-bit.
    pub const S8: Self = Self::new(8, false, true, false);
    /// Unsigned 16-bit, little-endian.
    pub const U16LSB: Self = Self::new(16, false, false, false);
    /// Signed 16-bit, little-endian.
    pub const S16LSB: Self = Self::new(16, false, true, false);
    /// Unsigned 16-bit, big-endian.
    pub const U16MSB: Self = Self::new(16, false, false, true);
    /// Signed 16-bit, big-endian.
    pub const S16MSB: Self = Self::new(16, false, true, true);
    /// Signed 32-bit, little-endian.
    pub const S32LSB: Self = Self::new(32, false, true, false);
    /// Signed 32-bit, big-endian.
    pub const S32MSB: Self = Self::new(32, false, true, true);
    /// 32-bit IEEE float, little-endian.
    pub const F32LSB: Self = Self::new(32, true, true, false);
    /// 32-bit IEEE float, big-endian.
    pub const F32MSB: Self = Self::new(32, true, true, true);

    /// Alias for [`Self::U16LSB`].
    pub const U16: Self = Self::U16LSB;
    /// Alias for [`Self::S16LSB`].
    pub const S16: Self = Self::S16LSB;
    /// Alias for [`Self::S32LSB`].
    pub const S32: Self = Self::S32LSB;
    /// Alias for [`Self::F32LSB`].
    pub const F32: Self = Self::F32LSB;

    /// Unsigned 16-bit in the platform's byte order.
    pub const U16SYS: Self = Self::new(16, false, false, NATIVE_BIG_ENDIAN);
    /// Signed 16-bit in the platform's byte order.
    pub const S16SYS: Self = Self::new(16, false, true, NATIVE_BIG_ENDIAN);
    /// Signed 32-bit in the platform's byte order.
    pub const S32SYS: Self = Self::new(32, false, true, NATIVE_BIG_ENDIAN);
    /// 32-bit float in the platform's byte order.
    pub const F32SYS: Self = Self::new(32, true, true, NATIVE_BIG_ENDIAN);

    /// Creates a format from its semantic parts.
    ///
    /// No validation happens here; see [`SampleFormat::validate`].
    #[must_use]
    pub const fn new(bits: u8, float: bool, signed: bool, big_endian: bool) -> Self {
        Self {
            bits,
            float,
            signed,
            big_endian: big_endian && bits > 8,
        }
    }

    /// Decodes a compact format code.
    ///
    /// Bits 0-7 hold the sample width, bit 8 marks float, bit 12 big-endian and
    /// bit 15 signed.
    ///
    /// # Errors
    ///
    /// `UnknownFormatCode` if undefined bits are set, or any error from
    /// [`SampleFormat::validate`].
    pub fn from_code(code: u16) -> Result<Self, BuildError> {
        if code & !MASK_DEFINED != 0 {
            return Err(BuildError::UnknownFormatCode { code });
        }
        let format = Self::new(
            (code & MASK_BITSIZE) as u8,
            code & MASK_FLOAT != 0,
            code & MASK_SIGNED != 0,
            code & MASK_BIG_ENDIAN != 0,
        );
        format.validate()?;
        Ok(format)
    }

    /// Returns the compact format code.
    #[must_use]
    pub const fn code(self) -> u16 {
        let mut code = self.bits as u16;
        if self.float {
            code |= MASK_FLOAT;
        }
        if self.big_endian {
            code |= MASK_BIG_ENDIAN;
        }
        if self.signed {
            code |= MASK_SIGNED;
        }
        code
    }

    /// Checks that the encoding has a defined representation.
    ///
    /// # Errors
    ///
    /// `UnsupportedSampleFormat` for widths other than 8/16/32, unsigned formats
    /// wider than 16 bits, and floats that are unsigned or not 32-bit.
    pub fn validate(self) -> Result<(), BuildError> {
        let width_ok = matches!(self.bits, 8 | 16 | 32);
        let sign_ok = self.signed || self.bits <= 16;
        let float_ok = !self.float || (self.bits == 32 && self.signed);
        if width_ok && sign_ok && float_ok {
            Ok(())
        } else {
            Err(BuildError::UnsupportedSampleFormat { format: self })
        }
    }

    /// Sample width in bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// Sample width in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        self.bits as usize / 8
    }

    /// Returns `true` for IEEE float samples.
    #[must_use]
    pub const fn is_float(self) -> bool {
        self.float
    }

    /// Returns `true` for signed samples (always true for floats).
    #[must_use]
    pub const fn is_signed(self) -> bool {
        self.signed
    }

    /// Returns `true` for big-endian byte order.
    #[must_use]
    pub const fn is_big_endian(self) -> bool {
        self.big_endian
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.float {
            'F'
        } else if self.signed {
            'S'
        } else {
            'U'
        };
        write!(f, "{kind}{}", self.bits)?;
        if self.bits > 8 {
            f.write_str(if self.big_endian { "MSB" } else { "LSB" })?;
        }
        Ok(())
    }
}

/// A complete stream description: encoding, channel count and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioSpec {
    /// Sample encoding.
    pub format: SampleFormat,
    /// Interleaved channel count.
    pub channels: u16,
    /// Frames per second.
    pub rate: u32,
}

impl AudioSpec {
    /// Creates a new spec.
    #[must_use]
    pub const fn new(format: SampleFormat, channels: u16, rate: u32) -> Self {
        Self {
            format,
            channels,
            rate,
        }
    }

    /// Bytes per interleaved frame.
    #[must_use]
    pub const fn frame_size(&self) -> usize {
        self.format.bytes() * self.channels as usize
    }

    /// Number of whole frames in `len` bytes.
    #[must_use]
    pub const fn frames_in(&self, len: usize) -> usize {
        let frame = self.frame_size();
        if frame == 0 {
            0
        } else {
            len / frame
        }
    }

    /// Bytes needed to hold `duration` of audio, rounded down to whole frames.
    #[must_use]
    pub fn bytes_for(&self, duration: Duration) -> usize {
        let frames = (f64::from(self.rate) * duration.as_secs_f64()) as usize;
        frames * self.frame_size()
    }

    /// Duration of `len` bytes of audio.
    #[must_use]
    pub fn duration_of(&self, len: usize) -> Duration {
        if self.rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames_in(len) as f64 / f64::from(self.rate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(SampleFormat::U8.code(), 0x0008);
        assert_eq!(SampleFormat::S8.code(), 0x8008);
        assert_eq!(SampleFormat::S16LSB.code(), 0x8010);
        assert_eq!(SampleFormat::U16MSB.code(), 0x1010);
        assert_eq!(SampleFormat::S32MSB.code(), 0x9020);
        assert_eq!(SampleFormat::F32LSB.code(), 0x8120);
    }

    #[test]
    fn test_from_code_matches_constants() {
        for format in [
            SampleFormat::U8,
            SampleFormat::S8,
            SampleFormat::U16LSB,
            SampleFormat::S16MSB,
            SampleFormat::S32LSB,
            SampleFormat::F32MSB,
        ] {
            assert_eq!(SampleFormat::from_code(format.code()), Ok(format));
        }
    }

    #[test]
    fn test_eight_bit_ignores_endianness() {
        let format = SampleFormat::from_code(0x1008).unwrap();
        assert_eq!(format, SampleFormat::U8);
        assert!(!format.is_big_endian());
    }

    #[test]
    fn test_rejects_unsigned_32() {
        let result = SampleFormat::from_code(0x0020);
        assert!(matches!(
            result,
            Err(BuildError::UnsupportedSampleFormat { .. })
        ));
    }

    #[test]
    fn test_rejects_odd_width_and_float16() {
        assert!(SampleFormat::from_code(0x8018).is_err());
        assert!(SampleFormat::from_code(0x8110).is_err());
    }

    #[test]
    fn test_rejects_undefined_bits() {
        assert_eq!(
            SampleFormat::from_code(0x0410),
            Err(BuildError::UnknownFormatCode { code: 0x0410 })
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SampleFormat::U8.to_string(), "U8");
        assert_eq!(SampleFormat::S16MSB.to_string(), "S16MSB");
        assert_eq!(SampleFormat::F32LSB.to_string(), "F32LSB");
    }

    #[test]
    fn test_spec_frame_math() {
        let spec = AudioSpec::new(SampleFormat::S16LSB, 2, 48000);
        assert_eq!(spec.frame_size(), 4);
        assert_eq!(spec.frames_in(4002), 1000);
        assert_eq!(spec.bytes_for(Duration::from_millis(100)), 4800 * 4);
        assert_eq!(spec.duration_of(4800 * 4), Duration::from_millis(100));
    }
}
