//! Deterministic hashing RNG and small numeric helpers.
//!
//! `seeded_random` is a pure function of its seed (no hidden stream state), so
//! terrain can be regenerated from `(run_seed, chunk, cell, salt)` alone.

/// SplitMix64 finalizer. Good avalanche, cheap, identical on every platform.
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Combine the parts of a generation key into a single seed.
pub fn hash_seed(run_seed: u64, chunk: u64, cell: u64, salt: u64) -> u64 {
    let mut h = mix64(run_seed);
    h = mix64(h ^ chunk);
    h = mix64(h ^ cell.wrapping_mul(0xD6E8_FEB8_6659_FD93));
    mix64(h ^ salt.wrapping_mul(0xA076_1D64_78BD_642F))
}

/// Deterministic sample in [0, 1) for a seed. Same seed, same value.
#[inline]
pub fn seeded_random(seed: u64) -> f32 {
    // Top 24 bits fit the f32 mantissa exactly, so the result is never 1.0.
    (mix64(seed) >> 40) as f32 / (1u64 << 24) as f32
}

/// Sample for a full generation key.
#[inline]
pub fn roll(run_seed: u64, chunk: u64, cell: u64, salt: u64) -> f32 {
    seeded_random(hash_seed(run_seed, chunk, cell, salt))
}

/// Uniform value in [lo, hi) from a [0, 1) sample.
#[inline]
pub fn sample_range(sample: f32, lo: f32, hi: f32) -> f32 {
    lo + sample * (hi - lo)
}

/// Integer in [lo, hi] (inclusive) from a [0, 1) sample.
#[inline]
pub fn sample_int(sample: f32, lo: u32, hi: u32) -> u32 {
    if hi <= lo {
        return lo;
    }
    let span = hi - lo + 1;
    lo + ((sample * span as f32) as u32).min(span - 1)
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn clamp(v: f32, lo: f32, hi: f32) -> f32 {
    v.max(lo).min(hi)
}

/// Frame-rate independent exponential smoothing:
/// `a + (b - a)(1 - e^(-rate·dt))`. Use this for every per-tick smoothing
/// so convergence does not depend on the tick rate.
#[inline]
pub fn exp_lerp(a: f32, b: f32, rate: f32, dt: f32) -> f32 {
    a + (b - a) * (1.0 - (-rate * dt).exp())
}

/// Uniform Catmull-Rom spline through `p1`..`p2` with outer controls `p0`, `p3`.
#[inline]
pub fn catmull_rom(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Squared distance between two points.
#[inline]
pub fn dist_sq(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = ax - bx;
    let dy = ay - by;
    dx * dx + dy * dy
}
