//! Sample rate conversion.
//!
//! The ratio `dst_rate / src_rate` is reduced to integer factors `up / down` in
//! lowest terms. Conceptually the input is zero-stuffed by `up`, low-pass filtered
//! with a Blackman-windowed sinc, and decimated by `down`. Neither the stuffed
//! signal nor the discarded outputs are ever computed: the filter is split into
//! `up` polyphase branches over real input samples, and only the branch landing
//! on each kept output position runs.
//!
//! The filter length scales with `max(up, down)` so it always spans the same
//! number of sinc zero crossings, whatever the ratio.
//!
//! Integer audio is filtered in fixed point. Samples are widened to Q31 and
//! coefficients quantized to Q2.29; every product is shifted back to Q31 before
//! accumulation and the sum saturates to the sample range. Float audio uses plain
//! `f32` arithmetic.

use std::f64::consts::PI;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::format::convert::{codec, Codec, Value};
use crate::format::SampleFormat;
use crate::BuildError;

/// Fractional bits of quantized fixed-point coefficients.
const COEFF_FRAC_BITS: u32 = 29;

/// Width of the fixed-point sample representation.
const SAMPLE_BITS: u8 = 32;

/// Sinc length used unless configured otherwise.
pub const DEFAULT_SINC_LENGTH: usize = 768;

/// Shortest accepted sinc length.
pub const MIN_SINC_LENGTH: usize = 2;

/// Longest accepted sinc length.
pub const MAX_SINC_LENGTH: usize = 1 << 16;

/// Longest designed filter, in stuffed samples.
pub const MAX_FILTER_LENGTH: usize = 1 << 20;

/// Greatest common divisor.
#[must_use]
pub fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Returns `(up, down)` such that `dst_rate / src_rate == up / down` in lowest terms.
///
/// Both rates must be non-zero.
#[must_use]
pub fn rate_factors(src_rate: u32, dst_rate: u32) -> (u32, u32) {
    let g = gcd(src_rate, dst_rate);
    (dst_rate / g, src_rate / g)
}

/// Designed filter length for `sinc_length` at a rate factor of `factor`.
///
/// The cutoff sits at `0.5 / factor`, so sinc zero crossings fall every `factor`
/// stuffed samples. The filter spans `sinc_length / 2` of them, is always even
/// and never exceeds [`MAX_FILTER_LENGTH`].
#[must_use]
pub fn filter_length(sinc_length: usize, factor: u32) -> usize {
    let length = (sinc_length / 2)
        .saturating_mul(factor as usize)
        .min(MAX_FILTER_LENGTH);
    (length + length % 2).max(MIN_SINC_LENGTH)
}

/// Designs a low-pass FIR of `length + 1` taps with normalized `cutoff`
/// (cycles per sample, below 0.5).
///
/// The result is scaled so the absolute values sum to 1.
#[must_use]
pub fn design_lowpass(length: usize, cutoff: f64) -> Vec<f64> {
    let mut taps = vec![0.0; length + 1];
    fill_lowpass(&mut taps, cutoff);
    taps
}
fn fill_lowpass(taps: &mut [f64], cutoff: f64) {
    let length = (taps.len() - 1) as f64;
    let middle = (taps.len() - 1) / 2;
    let omega = 2.0 * PI * cutoff;

    for (i, tap) in taps.iter_mut().enumerate() {
        let sinc = if i == middle {
            omega
        } else {
            let x = i as f64 - middle as f64;
            (omega * x).sin() / x
        };
        let phase = i as f64 / length;
        let window = 0.42 - 0.5 * (2.0 * PI * phase).cos() + 0.08 * (4.0 * PI * phase).cos();
        *tap = sinc * window;
    }

    let total: f64 = taps.iter().map(|tap| tap.abs()).sum();
    if total > 0.0 {
        for tap in taps.iter_mut() {
            *tap /= total;
        }
    }
}

fn try_vec<T: Clone>(what: &'static str, len: usize, fill: T) -> Result<Vec<T>, BuildError> {
    let mut items = Vec::new();
    items
        .try_reserve_exact(len)
        .map_err(|_| BuildError::allocation::<T>(what, len))?;
    items.resize(len, fill);
    Ok(items)
}


/// Quantized polyphase taps plus one history lane per channel.
enum Kernel {
    Fixed { taps: Vec<i64>, history: Vec<i64> },
    Float { taps: Vec<f32>, history: Vec<f32> },
}

/// The interpolating low-pass of a [`RateConverter`], split into polyphase
/// branches, with per-channel circular history of real input samples.
///
/// Branch `p` holds taps `p, p + up, p + 2 * up, ..` of the design and yields the
/// output at stuffed offset `p` after the newest input sample. History survives
/// between calls so consecutive blocks of one stream filter seamlessly;
/// [`FirFilter::reset`] clears it when the stream changes.
pub struct FirFilter {
    coefficients: Vec<f64>,
    kernel: Kernel,
    phases: usize,
    span: usize,
    channels: usize,
    cursor: usize,
}

impl FirFilter {
    /// Designs the filter for resampling by `up / down` (both non-zero) and
    /// allocates history for `channels` interleaved channels of `format` audio.
    pub(crate) fn new(
        sinc_length: usize,
        up: u32,
        down: u32,
        format: SampleFormat,
        channels: usize,
    ) -> Result<Self, BuildError> {
        check_sinc_length(sinc_length)?;
        let factor = up.max(down);
        let length = filter_length(sinc_length, factor);

        let mut coefficients = try_vec("fir coefficients", length + 1, 0.0f64)?;
        fill_lowpass(&mut coefficients, 0.5 / f64::from(factor));

        // Stuffing spreads each input sample over `up` slots; the gain brings DC back to unity.
        let sum: f64 = coefficients.iter().sum();
        let gain = f64::from(up) / if sum > f64::EPSILON { sum } else { 1.0 };

        let phases = up as usize;
        let span = length / phases + 1;
        let bank = phases.saturating_mul(span);
        let lanes = span.saturating_mul(channels);
        let tap = |index: usize| {
            let (phase, k) = (index / span, index % span);
            coefficients
                .get(phase + k * phases)
                .map_or(0.0, |&c| c * gain)
        };

        let kernel = if format.is_float() {
            let mut taps = try_vec("fir taps", bank, 0.0f32)?;
            for (i, t) in taps.iter_mut().enumerate() {
                *t = tap(i) as f32;
            }
            Kernel::Float {
                taps,
                history: try_vec("fir history", lanes, 0.0f32)?,
            }
        } else {
            let scale = f64::from(1u32 << COEFF_FRAC_BITS);
            let mut taps = try_vec("fir taps", bank, 0i64)?;
            for (i, t) in taps.iter_mut().enumerate() {
                *t = (tap(i) * scale).round() as i64;
            }
            Kernel::Fixed {
                taps,
                history: try_vec("fir history", lanes, 0i64)?,
            }
        };

        Ok(Self {
            coefficients,
            kernel,
            phases,
            span,
            channels,
            cursor: 0,
        })
    }

    /// The normalized design coefficients (absolute values sum to 1).
    #[must_use]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Number of taps in the design.
    #[must_use]
    pub fn tap_count(&self) -> usize {
        self.coefficients.len()
    }

    /// Number of polyphase branches (`up`).
    #[must_use]
    pub fn phases(&self) -> usize {
        self.phases
    }

    /// Input samples each branch convolves, and the length of each history lane.
    #[must_use]
    pub fn span(&self) -> usize {
        self.span
    }

    /// Position of the newest sample in each history lane.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Returns `true` if every history lane is silent.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        match &self.kernel {
            Kernel::Fixed { history, .. } => history.iter().all(|&s| s == 0),
            Kernel::Float { history, .. } => history.iter().all(|&s| s == 0.0),
        }
    }

    /// Zeroes the history and rewinds the cursor.
    pub fn reset(&mut self) {
        match &mut self.kernel {
            Kernel::Fixed { history, .. } => history.fill(0),
            Kernel::Float { history, .. } => history.fill(0.0),
        }
        self.cursor = 0;
    }

    /// Moves the cursor to the slot the next frame overwrites.
    fn advance(&mut self) {
        self.cursor = (self.cursor + 1) % self.span;
    }

    /// Stores `value` as the newest sample of `channel`.
    fn push(&mut self, channel: usize, value: Value) {
        let slot = channel * self.span + self.cursor;
        match &mut self.kernel {
            Kernel::Fixed { history, .. } => history[slot] = value.to_int(SAMPLE_BITS),
            Kernel::Float { history, .. } => history[slot] = value.to_float(),
        }
    }

    /// Convolves the history of `channel` with branch `phase`.
    fn output(&self, channel: usize, phase: usize) -> Value {
        let lane = channel * self.span..(channel + 1) * self.span;
        let branch = phase * self.span..(phase + 1) * self.span;
        // newest first: cursor, cursor-1, .., 0, len-1, .., cursor+1
        let split = self.cursor + 1;
        match &self.kernel {
            Kernel::Fixed { taps, history } => {
                let (recent, older) = history[lane].split_at(split);
                let samples = recent.iter().rev().chain(older.iter().rev());
                let acc = taps[branch]
                    .iter()
                    .zip(samples)
                    .fold(0i64, |acc, (&tap, &sample)| {
                        acc.saturating_add(sample.saturating_mul(tap) >> COEFF_FRAC_BITS)
                    });
                Value::Int {
                    value: acc,
                    bits: SAMPLE_BITS,
                }
            }
            Kernel::Float { taps, history } => {
                let (recent, older) = history[lane].split_at(split);
                let samples = recent.iter().rev().chain(older.iter().rev());
                Value::Float(taps[branch].iter().zip(samples).map(|(t, s)| t * s).sum())
            }
        }
    }
}

impl std::fmt::Debug for FirFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirFilter")
            .field("taps", &self.tap_count())
            .field("phases", &self.phases)
            .field("span", &self.span)
            .field("channels", &self.channels)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

pub(crate) fn check_sinc_length(sinc_length: usize) -> Result<(), BuildError> {
    if sinc_length % 2 != 0 || !(MIN_SINC_LENGTH..=MAX_SINC_LENGTH).contains(&sinc_length) {
        return Err(BuildError::SincLengthOutOfRange {
            requested: sinc_length,
            min: MIN_SINC_LENGTH,
            max: MAX_SINC_LENGTH,
        });
    }
    Ok(())
}

/// Filter plus the decimation phase left over from the previous call.
#[derive(Debug)]
struct Resampler {
    filter: FirFilter,
    phase: u32,
}

/// Resamples interleaved audio by `up / down` in place.
///
/// The filter sits behind a mutex so a converter can be shared; calls on one
/// converter are serialized and each picks up the history and decimation phase
/// the previous one left. Splitting a stream into blocks therefore yields the
/// same samples as converting it in one call.
pub struct RateConverter {
    up: u32,
    down: u32,
    codec: &'static Codec,
    channels: usize,
    state: Mutex<Resampler>,
}

impl RateConverter {
    /// Creates a converter from `src_rate` to `dst_rate` for audio already in
    /// `format` with `channels` channels.
    ///
    /// # Errors
    ///
    /// `InvalidSampleRate` for zero rates, `SincLengthOutOfRange` for odd or
    /// out-of-range sinc lengths and `AllocationFailure` if the filter cannot be
    /// stored.
    pub fn new(
        src_rate: u32,
        dst_rate: u32,
        format: SampleFormat,
        channels: u16,
        sinc_length: usize,
    ) -> Result<Self, BuildError> {
        for rate in [src_rate, dst_rate] {
            if rate == 0 {
                return Err(BuildError::InvalidSampleRate { rate });
            }
        }
        let codec = codec(format)?;
        let (up, down) = rate_factors(src_rate, dst_rate);
        let filter = FirFilter::new(sinc_length, up, down, format, usize::from(channels))?;

        Ok(Self {
            up,
            down,
            codec,
            channels: usize::from(channels),
            state: Mutex::new(Resampler { filter, phase: 0 }),
        })
    }

    /// Interpolation factor.
    #[must_use]
    pub fn up(&self) -> u32 {
        self.up
    }

    /// Decimation factor.
    #[must_use]
    pub fn down(&self) -> u32 {
        self.down
    }

    /// Channels per frame.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Locks and returns the filter.
    pub fn filter(&self) -> MappedMutexGuard<'_, FirFilter> {
        MutexGuard::map(self.state.lock(), |state| &mut state.filter)
    }

    /// Stuffed samples consumed since the last kept output, modulo `down`.
    #[must_use]
    pub fn phase(&self) -> u32 {
        self.state.lock().phase
    }

    /// Clears the filter history and the decimation phase.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.filter.reset();
        state.phase = 0;
    }

    fn frame_size(&self) -> usize {
        self.codec.format().bytes() * self.channels
    }

    /// Output length in bytes for `len` input bytes at the start of a stream:
    /// `frames * up / down` frames, rounded down.
    ///
    /// Later calls carry the decimation phase over and may yield one frame more;
    /// the length returned by execution is authoritative.
    #[must_use]
    pub fn output_len(&self, len: usize) -> usize {
        let frames = (len / self.frame_size()) as u64;
        (frames * u64::from(self.up) / u64::from(self.down)) as usize * self.frame_size()
    }

    /// Bytes of buffer needed to resample `len` input bytes in place, whatever
    /// the carried decimation phase.
    #[must_use]
    pub fn required_capacity(&self, len: usize) -> usize {
        let frames = len / self.frame_size();
        let stuffed = frames as u64 * u64::from(self.up);
        let widest = stuffed.div_ceil(u64::from(self.down)) as usize;
        widest.max(frames) * self.frame_size()
    }

    /// Resamples `len` bytes at the start of `buf`, returning the new length.
    ///
    /// `buf` must hold at least [`RateConverter::required_capacity`] bytes.
    pub(crate) fn process(&self, buf: &mut [u8], len: usize) -> usize {
        let frame = self.frame_size();
        let frames = len / frame;

        // Upsampled output outruns the read position, so read from the tail instead.
        let src_frame = if self.up > self.down {
            let start = buf.len() / frame - frames;
            buf.copy_within(0..frames * frame, start * frame);
            start
        } else {
            0
        };

        let mut state = self.state.lock();
        let Resampler { filter, phase } = &mut *state;
        let (up, down) = (u64::from(self.up), u64::from(self.down));
        let mut produced = 0;

        for input in 0..frames {
            filter.advance();
            let base = (src_frame + input) * self.channels;
            for channel in 0..self.channels {
                filter.push(channel, self.codec.read(buf, base + channel));
            }

            // kept outputs end a run of `down` stuffed samples
            let mut step = down - 1 - u64::from(*phase);
            while step < up {
                let base = produced * self.channels;
                for channel in 0..self.channels {
                    self.codec
                        .write(buf, base + channel, filter.output(channel, step as usize));
                }
                produced += 1;
                step += down;
            }
            *phase = ((u64::from(*phase) + up) % down) as u32;
        }

        produced * frame
    }
}

impl std::fmt::Debug for RateConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateConverter")
            .field("up", &self.up)
            .field("down", &self.down)
            .field("format", &self.codec.format())
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}
