//! Fuzz-style soundness checks for the range domain, in the teacher's
//! `src/tests/fuzz.rs` style: a seeded `StdRng`, many random trials, and a
//! panic message that reports the seed so a failure can be reproduced.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use shapectr::range::{Bound, IntRange};

fn random_std_rng_with_seed() -> (StdRng, u64) {
    let seed: u64 = rand::random();
    (StdRng::seed_from_u64(seed), seed)
}

fn random_int_range(rng: &mut StdRng) -> IntRange {
    let a = rng.random_range(-1_000..=1_000);
    let b = rng.random_range(-1_000..=1_000);
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    IntRange::new(Bound::Finite(lo), Bound::Finite(hi))
}

fn random_point_in(rng: &mut StdRng, r: &IntRange) -> i64 {
    let (Bound::Finite(lo), Bound::Finite(hi)) = (r.start(), r.end()) else {
        unreachable!("random_int_range only ever produces finite bounds")
    };
    rng.random_range(lo..=hi)
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) { q - 1 } else { q }
}

#[test]
fn fuzz_interval_arithmetic_soundness() {
    for _ in 0..2000 {
        let (mut rng, seed) = random_std_rng_with_seed();
        let ra = random_int_range(&mut rng);
        let rb = random_int_range(&mut rng);
        let a = random_point_in(&mut rng, &ra);
        let b = random_point_in(&mut rng, &rb);

        assert!(
            ra.add(&rb).contains(a + b),
            "add unsound! seed: {seed}, a: {a} in {ra}, b: {b} in {rb}"
        );
        assert!(
            ra.sub(&rb).contains(a - b),
            "sub unsound! seed: {seed}, a: {a} in {ra}, b: {b} in {rb}"
        );
        assert!(
            ra.mul(&rb).contains(a * b),
            "mul unsound! seed: {seed}, a: {a} in {ra}, b: {b} in {rb}"
        );
        assert!(
            ra.max(&rb).contains(a.max(b)),
            "max unsound! seed: {seed}, a: {a} in {ra}, b: {b} in {rb}"
        );
        assert!(
            ra.min(&rb).contains(a.min(b)),
            "min unsound! seed: {seed}, a: {a} in {ra}, b: {b} in {rb}"
        );
        if b != 0 {
            assert!(
                ra.floordiv(&rb).contains(floor_div(a, b)),
                "floordiv unsound! seed: {seed}, a: {a} in {ra}, b: {b} in {rb}"
            );
        }
    }
}
