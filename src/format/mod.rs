//! PCM format model and the conversion stages built on it.
//!
//! - [`sample`]: sample encodings and stream specs
//! - [`convert`]: sample type conversion
//! - [`channels`]: channel layout expansion and contraction
//! - [`resample`]: FIR sample rate conversion

pub mod channels;
pub mod convert;
pub mod resample;
mod sample;

pub use channels::{ChannelContract, ChannelExpand, ContractKind, ExpandKind};
pub use convert::{convert_samples, TypeConverter};
pub use resample::{FirFilter, RateConverter};
pub use sample::{AudioSpec, SampleFormat};
