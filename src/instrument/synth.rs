//! Synthetic General-MIDI drum kit, used when no sound bank is configured.
//!
//! Noise comes from a seeded `ChaCha8Rng`, so a given seed and sample rate
//! always yield identical buffers.

use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::sample::SampleData;
use super::SampleBank;

pub const KICK: u8 = 36;
pub const SNARE: u8 = 38;
pub const CLAP: u8 = 39;
pub const CLOSED_HAT: u8 = 42;
pub const OPEN_HAT: u8 = 46;

/// Build the fallback kit at `sample_rate`.
pub fn default_kit(sample_rate: u32, seed: u64) -> SampleBank {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let sr = f64::from(sample_rate.max(1));

    let mut bank = SampleBank::new();
    let mut put = |note: u8, buf: Vec<f32>| bank.insert(note, SampleData::from_mono(buf, sample_rate));
    put(KICK, kick(sr));
    put(SNARE, snare(sr, &mut rng));
    put(CLAP, clap(sr, &mut rng));
    put(CLOSED_HAT, hat(sr, &mut rng, 0.08, 20.0));
    put(OPEN_HAT, hat(sr, &mut rng, 0.4, 6.0));
    bank
}

fn frames(sr: f64, secs: f64) -> usize {
    (sr * secs) as usize
}

/// Sine with a downward pitch sweep.
fn kick(sr: f64) -> Vec<f32> {
    let len = 0.25;
    let mut phase = 0.0;
    (0..frames(sr, len))
        .map(|i| {
            let x = i as f64 / sr / len;
            phase += (50.0 + 100.0 * (-8.0 * x).exp()) / sr;
            ((phase * TAU).sin() * (-10.0 * x).exp()) as f32
        })
        .collect()
}

/// Tonal body plus a noise burst.
fn snare(sr: f64, rng: &mut ChaCha8Rng) -> Vec<f32> {
    let len = 0.2;
    (0..frames(sr, len))
        .map(|i| {
            let t = i as f64 / sr;
            let x = t / len;
            let body = (t * 180.0 * TAU).sin() * (-15.0 * x).exp();
            let noise = rng.gen_range(-1.0f64..1.0) * (-12.0 * x).exp();
            (0.5 * body + 0.5 * noise) as f32
        })
        .collect()
}

/// High-passed noise; `decay` sets how fast it closes.
fn hat(sr: f64, rng: &mut ChaCha8Rng, len: f64, decay: f64) -> Vec<f32> {
    let (mut last_in, mut last_out) = (0.0, 0.0);
    (0..frames(sr, len))
        .map(|i| {
            let x = i as f64 / sr / len;
            let n: f64 = rng.gen_range(-1.0..1.0);
            last_out = 0.85 * (last_out + n - last_in);
            last_in = n;
            (last_out * (-decay * x).exp()) as f32
        })
        .collect()
}

/// Three short noise bursts followed by a smoothed tail.
fn clap(sr: f64, rng: &mut ChaCha8Rng) -> Vec<f32> {
    let total = frames(sr, 0.15);
    let burst = frames(sr, 0.01).max(1);
    let tail_start = frames(sr, 0.04);
    let mut out = vec![0.0f32; total];

    for start in [0.0, 0.015, 0.03].map(|s| frames(sr, s)) {
        for (k, s) in out.iter_mut().skip(start).take(burst).enumerate() {
            let env = (-15.0 * k as f64 / burst as f64).exp();
            *s += (rng.gen_range(-1.0f64..1.0) * env * 0.7) as f32;
        }
    }

    let mut smooth = 0.0;
    for (k, s) in out.iter_mut().skip(tail_start).enumerate() {
        smooth += (rng.gen_range(-1.0f64..1.0) - smooth) * (600.0 / sr);
        *s += (smooth * (-18.0 * k as f64 / sr).exp() * 0.5) as f32;
    }
    out
}
