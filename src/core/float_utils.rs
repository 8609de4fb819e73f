// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Floating-point helpers shared with the CPU core
//!
//! `frsqrte` (floating reciprocal square root estimate) must match hardware
//! bit-for-bit: games feed its result straight into Newton-Raphson steps and
//! compare against constants, so an "almost right" estimate desyncs physics
//! and animation. The estimate is a piecewise-linear lookup on the top mantissa
//! bits plus the exponent parity.

/// One linear segment of the estimate
#[derive(Debug, Clone, Copy)]
struct BaseAndDec {
    base: i32,
    dec: i32,
}

const fn seg(base: i32, dec: i32) -> BaseAndDec {
    BaseAndDec { base, dec }
}

/// Segments for even exponents (0..16) then odd exponents (16..32)
const FRSQRTE_TABLE: [BaseAndDec; 32] = [
    seg(0x1a7e800, -0x568),
    seg(0x17cb800, -0x4f3),
    seg(0x1552800, -0x48d),
    seg(0x130c000, -0x435),
    seg(0x10f2000, -0x3e7),
    seg(0x0eff000, -0x3a2),
    seg(0x0d2e000, -0x365),
    seg(0x0b7c000, -0x32e),
    seg(0x09e5000, -0x2fc),
    seg(0x0867000, -0x2d0),
    seg(0x06ff000, -0x2a8),
    seg(0x05ab800, -0x283),
    seg(0x046a000, -0x261),
    seg(0x0339800, -0x243),
    seg(0x0218800, -0x226),
    seg(0x0105800, -0x20b),
    seg(0x3ffa000, -0x7a4),
    seg(0x3c29000, -0x700),
    seg(0x38aa000, -0x670),
    seg(0x3572000, -0x5f2),
    seg(0x3279000, -0x584),
    seg(0x2fb7000, -0x524),
    seg(0x2d26000, -0x4cc),
    seg(0x2ac0000, -0x47e),
    seg(0x2881000, -0x43a),
    seg(0x2665000, -0x3fa),
    seg(0x2468000, -0x3c2),
    seg(0x2287000, -0x38e),
    seg(0x20c1000, -0x35e),
    seg(0x1f12000, -0x332),
    seg(0x1d79000, -0x30a),
    seg(0x1bf4000, -0x2e6),
];

const MANTISSA_MASK: i64 = (1 << 52) - 1;
const EXPONENT_MASK: i64 = 0x7FF << 52;
const SIGN_BIT: u64 = 1 << 63;
const QUIET_BIT: u64 = 1 << 51;

/// Default quiet NaN produced for invalid inputs
pub const DEFAULT_NAN: u64 = 0x7FF8_0000_0000_0000;

/// Reciprocal square root estimate on raw IEEE-754 bits
///
/// - `±0` gives `±inf`
/// - `+inf` gives `+0`, `-inf` and any negative finite value give [`DEFAULT_NAN`]
/// - NaN inputs are quieted and passed through
/// - denormals are normalized before the lookup
pub fn frsqrte_bits(bits: u64) -> u64 {
    let sign = bits & SIGN_BIT;
    let mut mantissa = (bits as i64) & MANTISSA_MASK;
    let mut exponent = (bits as i64) & EXPONENT_MASK;

    if mantissa == 0 && exponent == 0 {
        return sign | f64::INFINITY.to_bits();
    }

    if exponent == EXPONENT_MASK {
        if mantissa == 0 {
            return if sign != 0 { DEFAULT_NAN } else { 0 };
        }
        return bits | QUIET_BIT;
    }

    if sign != 0 {
        return DEFAULT_NAN;
    }

    if exponent == 0 {
        loop {
            exponent -= 1 << 52;
            mantissa <<= 1;
            if mantissa & (1 << 52) != 0 {
                break;
            }
        }
        mantissa &= MANTISSA_MASK;
        exponent += 1 << 52;
    }

    let exponent_lsb = exponent & (1 << 52);
    let result_exponent = ((0x3FF << 52) - ((exponent - (0x3FE << 52)) / 2)) & EXPONENT_MASK;

    let i = ((exponent_lsb | mantissa) >> 37) as usize;
    let entry = FRSQRTE_TABLE[i / 2048];
    let fraction = (entry.base as i64 + entry.dec as i64 * (i % 2048) as i64) << 26;

    (result_exponent | fraction) as u64
}

/// Reciprocal square root estimate
#[inline]
pub fn frsqrte(value: f64) -> f64 {
    f64::from_bits(frsqrte_bits(value.to_bits()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hardware reference values (input bits, expected bits)
    const REFERENCE: &[(u64, u64)] = &[
        // Zeroes
        (0x0000000000000000, 0x7FF0000000000000),
        (0x8000000000000000, 0xFFF0000000000000),
        // Infinities
        (0x7FF0000000000000, 0x0000000000000000),
        (0xFFF0000000000000, 0x7FF8000000000000),
        // NaNs
        (0x7FF8000000000000, 0x7FF8000000000000),
        (0x7FF4000000000000, 0x7FFC000000000000),
        (0xFFF8000000000000, 0xFFF8000000000000),
        // Subnormals
        (0x0000000000000001, 0x617FFE8000000000),
        (0x000FFFFFFFFFFFFF, 0x5FE000082C000000),
        (0x0008000000000000, 0x5FE69FA000000000),
        // Normals
        (0x3FF0000000000000, 0x3FEFFE8000000000),
        (0x4000000000000000, 0x3FE69FA000000000),
        (0x4010000000000000, 0x3FDFFE8000000000),
        (0x3FD0000000000000, 0x3FFFFE8000000000),
        (0x4008000000000000, 0x3FE2794000000000),
        (0x4024000000000000, 0x3FD43C8000000000),
        (0x3FB999999999999A, 0x40094CF320000000),
        (0xBFF0000000000000, 0x7FF8000000000000),
        (0x3FEFFFFFFFFFFFFF, 0x3FF000082C000000),
        (0x7FEFFFFFFFFFFFFF, 0x1FF000082C000000),
        (0x0010000000000000, 0x5FDFFE8000000000),
        (0x40FE240C9FBE76C9, 0x3F67509300000000),
    ];

    #[test]
    fn test_frsqrte_matches_reference_table() {
        for &(input, expected) in REFERENCE {
            let actual = frsqrte_bits(input);
            assert_eq!(
                actual, expected,
                "frsqrte(0x{:016X}) = 0x{:016X}, expected 0x{:016X}",
                input, actual, expected
            );
        }
    }

    #[test]
    fn test_frsqrte_is_close_to_exact() {
        for value in [0.25f64, 1.0, 2.0, 3.0, 10.0, 12345.678] {
            let estimate = frsqrte(value);
            let exact = 1.0 / value.sqrt();
            assert!(((estimate - exact) / exact).abs() < 1.0 / 4096.0);
        }
    }

    #[test]
    fn test_frsqrte_negative_is_default_nan() {
        assert_eq!(frsqrte(-4.0).to_bits(), DEFAULT_NAN);
        assert_eq!(frsqrte(f64::NEG_INFINITY).to_bits(), DEFAULT_NAN);
    }
}
