//! Tone conversion example.
//!
//! Generates a 440Hz tone as CD audio, converts it to the transcription format
//! block by block, and prints the plan and signal levels.
//!
//! Run with: `RUST_LOG=pcm_cvt=debug cargo run --example convert_tone`

use std::f32::consts::TAU;

use pcm_cvt::{AudioSpec, ConversionPlan, ConvertBuffer, FormatPreset};

const TONE_HZ: f32 = 440.0;
const BLOCK_FRAMES: usize = 441;
const BLOCKS: usize = 100;

fn tone_block(spec: AudioSpec, block: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(BLOCK_FRAMES * spec.frame_size());
    for frame in 0..BLOCK_FRAMES {
        let t = (block * BLOCK_FRAMES + frame) as f32 / spec.rate as f32;
        let sample = ((TAU * TONE_HZ * t).sin() * 0.5 * f32::from(i16::MAX)) as i16;
        for _ in 0..spec.channels {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
    }
    bytes
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let source = FormatPreset::CdAudio.spec();
    let dest = FormatPreset::Transcription.spec();
    let plan = ConversionPlan::new(source, dest)?;

    println!("Converting {source:?}");
    println!("        to {dest:?}");
    for (i, stage) in plan.stage_kinds().iter().enumerate() {
        println!("  stage {i}: {stage:?}");
    }
    println!(
        "  len_mult={} len_ratio={:.4}",
        plan.len_mult(),
        plan.len_ratio()
    );

    let mut buffer = ConvertBuffer::for_plan(&plan, BLOCK_FRAMES * source.frame_size());
    let mut peak = 0i16;
    let mut frames = 0;
    for block in 0..BLOCKS {
        let out = buffer.convert(&plan, &tone_block(source, block))?;
        // 16-bit native order; the transcription preset is always S16SYS
        for sample in out.chunks_exact(2) {
            peak = peak.max(i16::from_ne_bytes([sample[0], sample[1]]).saturating_abs());
        }
        frames += buffer.frame_count();
    }

    println!();
    println!(
        "Converted {:?} of audio into {frames} frames, peak {peak} ({:.1}% of full scale)",
        buffer.elapsed(),
        f32::from(peak) / f32::from(i16::MAX) * 100.0
    );

    Ok(())
}
