//! Channel layout conversion.
//!
//! Each stage changes the channel count of interleaved audio in place while keeping
//! the number of frames. Expanding stages walk the buffer from the end so the wider
//! output never overwrites frames that are still unread.

use crate::format::convert::{codec, Codec, Value};
use crate::format::SampleFormat;
use crate::BuildError;

/// Stages that raise the channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpandKind {
    /// Every sample is written twice (1 -> 2, and doubling in general).
    Duplicate,
    /// Stereo to quad: front L/R kept, rear channels carry the non-center residual.
    StereoToQuad,
    /// Stereo to 5.1: the quad layout plus two copies of the center.
    StereoToSurround51,
}

impl ExpandKind {
    /// Output channels produced per input channel, as a ratio.
    #[must_use]
    pub const fn factor(self) -> u32 {
        match self {
            Self::Duplicate | Self::StereoToQuad => 2,
            Self::StereoToSurround51 => 3,
        }
    }
}

/// Stages that lower the channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractKind {
    /// 6 -> 4: drop channels 4 and 5.
    SixToFour,
    /// 6 -> 2: keep channels 0 and 1.
    SixToStereo,
    /// N -> N/2: average each adjacent pair.
    HalvePairs,
}

impl ContractKind {
    /// Input and output channels per frame group, `(from, to)`.
    #[must_use]
    pub const fn ratio(self) -> (u32, u32) {
        match self {
            Self::SixToFour => (6, 4),
            Self::SixToStereo => (6, 2),
            Self::HalvePairs => (2, 1),
        }
    }
}

/// Halves a sample; integers truncate toward zero.
#[inline]
fn halve(value: Value) -> Value {
    match value {
        Value::Int { value, bits } => Value::Int {
            value: value / 2,
            bits,
        },
        Value::Float(sample) => Value::Float((f64::from(sample) * 0.5) as f32),
    }
}

#[inline]
fn add(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Int { value: x, bits }, Value::Int { value: y, .. }) => Value::Int {
            value: x + y,
            bits,
        },
        _ => Value::Float((f64::from(a.to_float()) + f64::from(b.to_float())) as f32),
    }
}

#[inline]
fn sub(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Int { value: x, bits }, Value::Int { value: y, .. }) => Value::Int {
            value: x - y,
            bits,
        },
        _ => Value::Float((f64::from(a.to_float()) - f64::from(b.to_float())) as f32),
    }
}

#[inline]
fn average(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Int { value: x, bits }, Value::Int { value: y, .. }) => Value::Int {
            value: (x + y) / 2,
            bits,
        },
        _ => Value::Float(((f64::from(a.to_float()) + f64::from(b.to_float())) * 0.5) as f32),
    }
}

/// The `(center, rear_left, rear_right)` derived from a stereo frame.
#[inline]
fn derive_rear(left: Value, right: Value) -> (Value, Value, Value) {
    let center = add(halve(left), halve(right));
    (center, sub(left, center), sub(right, center))
}

/// A stage that raises the channel count of samples in one encoding.
#[derive(Clone, Copy)]
pub struct ChannelExpand {
    kind: ExpandKind,
    codec: &'static Codec,
}

impl ChannelExpand {
    /// Creates an expanding stage over samples encoded as `format`.
    ///
    /// # Errors
    ///
    /// `UnsupportedSampleFormat` if `format` has no codec.
    pub fn new(kind: ExpandKind, format: SampleFormat) -> Result<Self, BuildError> {
        Ok(Self {
            kind,
            codec: codec(format)?,
        })
    }

    /// Which expansion this stage performs.
    #[must_use]
    pub fn kind(&self) -> ExpandKind {
        self.kind
    }

    /// Output length in bytes for `len` input bytes.
    #[must_use]
    pub fn output_len(&self, len: usize) -> usize {
        let width = self.codec.format().bytes();
        match self.kind {
            ExpandKind::Duplicate => len / width * width * 2,
            ExpandKind::StereoToQuad => len / (2 * width) * 4 * width,
            ExpandKind::StereoToSurround51 => len / (2 * width) * 6 * width,
        }
    }

    /// Expands `len` bytes at the start of `buf`, returning the new length.
    ///
    /// `buf` must hold at least [`ChannelExpand::output_len`] bytes.
    pub(crate) fn process(&self, buf: &mut [u8], len: usize) -> usize {
        let width = self.codec.format().bytes();
        match self.kind {
            ExpandKind::Duplicate => {
                for index in (0..len / width).rev() {
                    let src = index * width;
                    let dst = src * 2;
                    buf.copy_within(src..src + width, dst);
                    buf.copy_within(dst..dst + width, dst + width);
                }
            }
            ExpandKind::StereoToQuad => {
                for frame in (0..len / (2 * width)).rev() {
                    let left = self.codec.read(buf, frame * 2);
                    let right = self.codec.read(buf, frame * 2 + 1);
                    let (_, rear_left, rear_right) = derive_rear(left, right);
                    let out = frame * 4;
                    self.codec.write(buf, out, left);
                    self.codec.write(buf, out + 1, right);
                    self.codec.write(buf, out + 2, rear_left);
                    self.codec.write(buf, out + 3, rear_right);
                }
            }
            ExpandKind::StereoToSurround51 => {
                for frame in (0..len / (2 * width)).rev() {
                    let left = self.codec.read(buf, frame * 2);
                    let right = self.codec.read(buf, frame * 2 + 1);
                    let (center, rear_left, rear_right) = derive_rear(left, right);
                    let out = frame * 6;
                    self.codec.write(buf, out, left);
                    self.codec.write(buf, out + 1, right);
                    self.codec.write(buf, out + 2, rear_left);
                    self.codec.write(buf, out + 3, rear_right);
                    self.codec.write(buf, out + 4, center);
                    self.codec.write(buf, out + 5, center);
                }
            }
        }
        self.output_len(len)
    }
}

/// A stage that lowers the channel count of samples in one encoding.
#[derive(Clone, Copy)]
pub struct ChannelContract {
    kind: ContractKind,
    codec: &'static Codec,
}

impl ChannelContract {
    /// Creates a contracting stage over samples encoded as `format`.
    ///
    /// # Errors
    ///
    /// `UnsupportedSampleFormat` if `format` has no codec.
    pub fn new(kind: ContractKind, format: SampleFormat) -> Result<Self, BuildError> {
        Ok(Self {
            kind,
            codec: codec(format)?,
        })
    }

    /// Which contraction this stage performs.
    #[must_use]
    pub fn kind(&self) -> ContractKind {
        self.kind
    }

    /// Output length in bytes for `len` input bytes.
    #[must_use]
    pub fn output_len(&self, len: usize) -> usize {
        let width = self.codec.format().bytes();
        let (from, to) = self.kind.ratio();
        len / (from as usize * width) * to as usize * width
    }

    /// Contracts `len` bytes at the start of `buf`, returning the new length.
    pub(crate) fn process(&self, buf: &mut [u8], len: usize) -> usize {
        let width = self.codec.format().bytes();
        match self.kind {
            ContractKind::SixToFour | ContractKind::SixToStereo => {
                let (from, to) = self.kind.ratio();
                let (from, to) = (from as usize * width, to as usize * width);
                for frame in 0..len / from {
                    buf.copy_within(frame * from..frame * from + to, frame * to);
                }
            }
            ContractKind::HalvePairs => {
                for index in 0..len / (2 * width) {
                    let first = self.codec.read(buf, index * 2);
                    let second = self.codec.read(buf, index * 2 + 1);
                    self.codec.write(buf, index, average(first, second));
                }
            }
        }
        self.output_len(len)
    }
}

impl std::fmt::Debug for ChannelExpand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelExpand")
            .field("kind", &self.kind)
            .field("format", &self.codec.format())
            .finish()
    }
}

impl std::fmt::Debug for ChannelContract {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelContract")
            .field("kind", &self.kind)
            .field("format", &self.codec.format())
            .finish()
    }
}

/// One step of a channel bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RemapStep {
    Expand(ExpandKind),
    Contract(ContractKind),
}

/// Composes the remap steps that take `from` channels to `to` channels.
///
/// Returns `None` when the primitives cannot reach `to` (4 -> 6, for example).
pub(crate) fn bridge(from: u16, to: u16) -> Option<Vec<RemapStep>> {
    let mut steps = Vec::new();
    let mut channels = from;

    if channels == 1 && to > 1 {
        steps.push(RemapStep::Expand(ExpandKind::Duplicate));
        channels = 2;
    }
    if channels == 2 && to == 6 {
        steps.push(RemapStep::Expand(ExpandKind::StereoToSurround51));
        channels = 6;
    }
    if channels == 2 && to == 4 {
        steps.push(RemapStep::Expand(ExpandKind::StereoToQuad));
        channels = 4;
    }
    while channels * 2 <= to {
        steps.push(RemapStep::Expand(ExpandKind::Duplicate));
        channels *= 2;
    }
    if channels == 6 && to <= 2 {
        steps.push(RemapStep::Contract(ContractKind::SixToStereo));
        channels = 2;
    }
    if channels == 6 && to == 4 {
        steps.push(RemapStep::Contract(ContractKind::SixToFour));
        channels = 4;
    }
    // 4 channels are laid out as L front/back + R front/back, so halving lands on L/R
    while channels % 2 == 0 && channels / 2 >= to {
        steps.push(RemapStep::Contract(ContractKind::HalvePairs));
        channels /= 2;
    }

    (channels == to).then_some(steps)
}
