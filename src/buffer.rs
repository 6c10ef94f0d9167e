//! Reusable scratch buffer for running a plan block by block.

use std::time::Duration;

use crate::format::AudioSpec;
use crate::{ConversionPlan, ExecuteError};

/// An owned buffer sized for a [`ConversionPlan`].
///
/// Holds the most recent converted block plus the spec it is encoded in. The
/// backing storage only grows, so a buffer created with
/// [`ConvertBuffer::for_plan`] for the largest expected block never reallocates.
///
/// # Example
///
/// ```
/// use pcm_cvt::{AudioSpec, ConversionPlan, ConvertBuffer, SampleFormat};
/// use std::time::Duration;
///
/// let plan = ConversionPlan::new(
///     AudioSpec::new(SampleFormat::U8, 1, 8000),
///     AudioSpec::new(SampleFormat::S16LSB, 2, 8000),
/// )?;
/// let mut buffer = ConvertBuffer::for_plan(&plan, 800);
///
/// buffer.convert(&plan, &[0x80; 800])?;
/// assert_eq!(buffer.frame_count(), 800);
/// assert_eq!(buffer.duration(), Duration::from_millis(100));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConvertBuffer {
    data: Vec<u8>,
    len: usize,
    spec: AudioSpec,
    elapsed: Duration,
}

impl ConvertBuffer {
    /// Creates a buffer able to convert blocks of up to `max_input_len` bytes.
    #[must_use]
    pub fn for_plan(plan: &ConversionPlan, max_input_len: usize) -> Self {
        Self {
            data: vec![0; plan.required_capacity(max_input_len)],
            len: 0,
            spec: plan.dest(),
            elapsed: Duration::ZERO,
        }
    }

    /// Copies `input` in and runs `plan` over it, returning the converted bytes.
    ///
    /// Grows the backing storage first if `input` is longer than the buffer was
    /// sized for.
    ///
    /// # Errors
    ///
    /// `PartialFrame` if `input` is not a whole number of source frames.
    pub fn convert(&mut self, plan: &ConversionPlan, input: &[u8]) -> Result<&[u8], ExecuteError> {
        let required = plan.required_capacity(input.len());
        if self.data.len() < required {
            self.data.resize(required, 0);
        }
        self.data[..input.len()].copy_from_slice(input);

        self.len = 0;
        let len = plan.execute(&mut self.data, input.len())?;
        self.len = len;
        self.spec = plan.dest();
        self.elapsed += self.duration();
        Ok(&self.data[..len])
    }

    /// The most recently converted bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Length of the converted block in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the buffer holds no converted audio.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the backing storage in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Spec of the converted block.
    #[must_use]
    pub fn spec(&self) -> AudioSpec {
        self.spec
    }

    /// Number of frames in the converted block.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.spec.frames_in(self.len)
    }

    /// Duration of the converted block.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.spec.duration_of(self.len)
    }

    /// Total duration of all audio converted through this buffer.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}
