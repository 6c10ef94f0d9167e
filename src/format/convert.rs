//! Sample type conversion.
//!
//! Every supported encoding has one entry in a codec table that knows how to read a
//! sample into an intermediate [`Value`] and write one back. Converting between two
//! encodings is then a read, a rescale and a write, whatever the pair.

use crate::format::SampleFormat;
use crate::BuildError;

/// One sample in transit between encodings.
///
/// Integers keep their native scale and a centered (signed) range, so an unsigned
/// 8-bit 0x80 reads as `Int { value: 0, bits: 8 }`. Floats are nominally in
/// [-1.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    Int { value: i64, bits: u8 },
    Float(f32),
}

impl Value {
    /// Returns the sample as an integer of `bits` width, saturating at the range ends.
    pub(crate) fn to_int(self, bits: u8) -> i64 {
        let (min, max) = int_range(bits);
        match self {
            Value::Int { value, bits: from } => {
                let scaled = if bits >= from {
                    value << (bits - from)
                } else {
                    value >> (from - bits)
                };
                scaled.clamp(min, max)
            }
            Value::Float(sample) => {
                // NaN casts to 0
                let scaled = (f64::from(sample) * full_scale(bits)).round();
                (scaled as i64).clamp(min, max)
            }
        }
    }

    /// Returns the sample as a float in [-1.0, 1.0).
    pub(crate) fn to_float(self) -> f32 {
        match self {
            Value::Int { value, bits } => (value as f64 / full_scale(bits)) as f32,
            Value::Float(sample) => sample,
        }
    }
}

/// Inclusive range of a signed integer of `bits` width.
#[inline]
pub(crate) fn int_range(bits: u8) -> (i64, i64) {
    let half = 1i64 << (bits - 1);
    (-half, half - 1)
}

#[inline]
fn full_scale(bits: u8) -> f64 {
    (1i64 << (bits - 1)) as f64
}

type ReadFn = fn(&[u8]) -> Value;
type WriteFn = fn(Value, &mut [u8]);

/// Reader and writer for one encoding.
pub(crate) struct Codec {
    format: SampleFormat,
    read: ReadFn,
    write: WriteFn,
}

impl Codec {
    /// Reads sample `index` from `buf`.
    #[inline]
    pub(crate) fn read(&self, buf: &[u8], index: usize) -> Value {
        let width = self.format.bytes();
        (self.read)(&buf[index * width..(index + 1) * width])
    }

    /// Writes `value` as sample `index` of `buf`.
    #[inline]
    pub(crate) fn write(&self, buf: &mut [u8], index: usize, value: Value) {
        let width = self.format.bytes();
        (self.write)(value, &mut buf[index * width..(index + 1) * width]);
    }

    pub(crate) fn format(&self) -> SampleFormat {
        self.format
    }
}

static CODECS: [Codec; 10] = [
    Codec {
        format: SampleFormat::U8,
        read: |b| Value::Int {
            value: i64::from(b[0]) - 0x80,
            bits: 8,
        },
        write: |v, b| b[0] = (v.to_int(8) + 0x80) as u8,
    },
    Codec {
        format: SampleFormat::S8,
        read: |b| Value::Int {
            value: i64::from(b[0] as i8),
            bits: 8,
        },
        write: |v, b| b[0] = v.to_int(8) as i8 as u8,
    },
    Codec {
        format: SampleFormat::U16LSB,
        read: |b| Value::Int {
            value: i64::from(u16::from_le_bytes([b[0], b[1]])) - 0x8000,
            bits: 16,
        },
        write: |v, b| b.copy_from_slice(&((v.to_int(16) + 0x8000) as u16).to_le_bytes()),
    },
    Codec {
        format: SampleFormat::U16MSB,
        read: |b| Value::Int {
            value: i64::from(u16::from_be_bytes([b[0], b[1]])) - 0x8000,
            bits: 16,
        },
        write: |v, b| b.copy_from_slice(&((v.to_int(16) + 0x8000) as u16).to_be_bytes()),
    },
    Codec {
        format: SampleFormat::S16LSB,
        read: |b| Value::Int {
            value: i64::from(i16::from_le_bytes([b[0], b[1]])),
            bits: 16,
        },
        write: |v, b| b.copy_from_slice(&(v.to_int(16) as i16).to_le_bytes()),
    },
    Codec {
        format: SampleFormat::S16MSB,
        read: |b| Value::Int {
            value: i64::from(i16::from_be_bytes([b[0], b[1]])),
            bits: 16,
        },
        write: |v, b| b.copy_from_slice(&(v.to_int(16) as i16).to_be_bytes()),
    },
    Codec {
        format: SampleFormat::S32LSB,
        read: |b| Value::Int {
            value: i64::from(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            bits: 32,
        },
        write: |v, b| b.copy_from_slice(&(v.to_int(32) as i32).to_le_bytes()),
    },
    Codec {
        format: SampleFormat::S32MSB,
        read: |b| Value::Int {
            value: i64::from(i32::from_be_bytes([b[0], b[1], b[2], b[3]])),
            bits: 32,
        },
        write: |v, b| b.copy_from_slice(&(v.to_int(32) as i32).to_be_bytes()),
    },
    Codec {
        format: SampleFormat::F32LSB,
        read: |b| Value::Float(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        write: |v, b| b.copy_from_slice(&v.to_float().to_le_bytes()),
    },
    Codec {
        format: SampleFormat::F32MSB,
        read: |b| Value::Float(f32::from_be_bytes([b[0], b[1], b[2], b[3]])),
        write: |v, b| b.copy_from_slice(&v.to_float().to_be_bytes()),
    },
];

/// Looks up the codec for `format`.
pub(crate) fn codec(format: SampleFormat) -> Result<&'static Codec, BuildError> {
    CODECS
        .iter()
        .find(|codec| codec.format == format)
        .ok_or(BuildError::UnsupportedSampleFormat { format })
}

/// Converts samples between two encodings in place.
///
/// Narrowing conversions run front to back and widening ones back to front, so
/// the destination never overwrites source samples that are still unread. The
/// buffer must hold `count` samples of the wider of the two encodings.
#[derive(Clone, Copy)]
pub struct TypeConverter {
    from: &'static Codec,
    to: &'static Codec,
}

impl TypeConverter {
    /// Creates a converter between two encodings.
    ///
    /// # Errors
    ///
    /// `UnsupportedSampleFormat` if either encoding has no codec.
    pub fn new(from: SampleFormat, to: SampleFormat) -> Result<Self, BuildError> {
        Ok(Self {
            from: codec(from)?,
            to: codec(to)?,
        })
    }

    /// Source encoding.
    #[must_use]
    pub fn from_format(&self) -> SampleFormat {
        self.from.format
    }

    /// Destination encoding.
    #[must_use]
    pub fn to_format(&self) -> SampleFormat {
        self.to.format
    }

    /// Output length in bytes for `len` input bytes.
    #[must_use]
    pub fn output_len(&self, len: usize) -> usize {
        len / self.from.format.bytes() * self.to.format.bytes()
    }

    /// Rewrites the first `count` samples of `buf`.
    ///
    /// # Panics
    ///
    /// Panics if `buf` is shorter than `count` samples of either encoding.
    pub fn convert(&self, buf: &mut [u8], count: usize) {
        if self.to.format.bytes() > self.from.format.bytes() {
            for index in (0..count).rev() {
                let value = self.from.read(buf, index);
                self.to.write(buf, index, value);
            }
        } else {
            for index in 0..count {
                let value = self.from.read(buf, index);
                self.to.write(buf, index, value);
            }
        }
    }

    /// Converts a whole buffer of `len` bytes and returns the new length.
    pub(crate) fn process(&self, buf: &mut [u8], len: usize) -> usize {
        self.convert(buf, len / self.from.format.bytes());
        self.output_len(len)
    }
}

impl std::fmt::Debug for TypeConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeConverter")
            .field("from", &self.from.format)
            .field("to", &self.to.format)
            .finish()
    }
}

/// Converts `count` samples of `buf` from one encoding to another in place.
///
/// Identical encodings leave the buffer untouched.
///
/// # Errors
///
/// `UnsupportedSampleFormat` if either encoding has no codec.
///
/// # Panics
///
/// Panics if `buf` is shorter than `count` samples of either encoding.
pub fn convert_samples(
    buf: &mut [u8],
    count: usize,
    from: SampleFormat,
    to: SampleFormat,
) -> Result<(), BuildError> {
    if from == to {
        return Ok(());
    }
    TypeConverter::new(from, to)?.convert(buf, count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s16le(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_every_supported_format_has_a_codec() {
        for format in [
            SampleFormat::U8,
            SampleFormat::S8,
            SampleFormat::U16LSB,
            SampleFormat::U16MSB,
            SampleFormat::S16LSB,
            SampleFormat::S16MSB,
            SampleFormat::S32LSB,
            SampleFormat::S32MSB,
            SampleFormat::F32LSB,
            SampleFormat::F32MSB,
        ] {
            assert!(codec(format).is_ok(), "missing codec for {format}");
        }
    }

    #[test]
    fn test_u8_to_s16_widens_in_place() {
        let mut buf = vec![0x00, 0x80, 0xFF, 0, 0, 0];
        convert_samples(&mut buf, 3, SampleFormat::U8, SampleFormat::S16LSB).unwrap();
        assert_eq!(buf, s16le(&[-32768, 0, 32512]));
    }

    #[test]
    fn test_s16_to_u8_narrows() {
        let mut buf = s16le(&[-32768, 0, 32767, 255]);
        convert_samples(&mut buf, 4, SampleFormat::S16LSB, SampleFormat::U8).unwrap();
        assert_eq!(&buf[..4], &[0x00, 0x80, 0xFF, 0x80]);
    }

    #[test]
    fn test_endian_swap() {
        let mut buf = s16le(&[0x1234]);
        convert_samples(&mut buf, 1, SampleFormat::S16LSB, SampleFormat::S16MSB).unwrap();
        assert_eq!(buf, vec![0x12, 0x34]);
    }

    #[test]
    fn test_signedness_flip() {
        let mut buf = s16le(&[0, -1]);
        convert_samples(&mut buf, 2, SampleFormat::S16LSB, SampleFormat::U16LSB).unwrap();
        assert_eq!(buf, vec![0x00, 0x80, 0xFF, 0x7F]);
    }

    #[test]
    fn test_s16_to_f32_scale() {
        let mut buf = s16le(&[16384, -32768]);
        buf.resize(8, 0);
        convert_samples(&mut buf, 2, SampleFormat::S16LSB, SampleFormat::F32LSB).unwrap();
        let first = f32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let second = f32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(first, 0.5);
        assert_eq!(second, -1.0);
    }

    #[test]
    fn test_f32_to_s16_clamps() {
        let mut buf: Vec<u8> = [1.0f32, -2.0, 0.25]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        convert_samples(&mut buf, 3, SampleFormat::F32LSB, SampleFormat::S16LSB).unwrap();
        assert_eq!(&buf[..6], &s16le(&[32767, -32768, 8192])[..]);
    }

    #[test]
    fn test_s16_f32_roundtrip_exact() {
        let original = [0i16, 1, -1, 1000, -1000, 32767, -32768];
        let mut buf = s16le(&original);
        buf.resize(original.len() * 4, 0);
        convert_samples(&mut buf, 7, SampleFormat::S16LSB, SampleFormat::F32MSB).unwrap();
        convert_samples(&mut buf, 7, SampleFormat::F32MSB, SampleFormat::S16LSB).unwrap();
        assert_eq!(&buf[..14], &s16le(&original)[..]);
    }

    #[test]
    fn test_s32_to_s16_keeps_polarity() {
        let mut buf: Vec<u8> = [i32::MIN, -65536, 65536, i32::MAX]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        convert_samples(&mut buf, 4, SampleFormat::S32LSB, SampleFormat::S16LSB).unwrap();
        assert_eq!(&buf[..8], &s16le(&[-32768, -1, 1, 32767])[..]);
    }

    #[test]
    fn test_nan_becomes_silence() {
        let mut buf = f32::NAN.to_le_bytes().to_vec();
        convert_samples(&mut buf, 1, SampleFormat::F32LSB, SampleFormat::U8).unwrap();
        assert_eq!(buf[0], 0x80);
    }

    #[test]
    fn test_unsupported_pair_rejected() {
        let bogus = SampleFormat::new(32, false, false, false);
        let result = TypeConverter::new(SampleFormat::S16LSB, bogus);
        assert!(matches!(
            result,
            Err(BuildError::UnsupportedSampleFormat { .. })
        ));
    }

    #[test]
    fn test_output_len() {
        let cvt = TypeConverter::new(SampleFormat::U8, SampleFormat::F32LSB).unwrap();
        assert_eq!(cvt.output_len(10), 40);
        let cvt = TypeConverter::new(SampleFormat::S32LSB, SampleFormat::S16MSB).unwrap();
        assert_eq!(cvt.output_len(10), 4);
    }
}
