// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Polynomial arithmetic over the prime field Z_p.

use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Evaluate `coefficients[0] + coefficients[1]·x + …` at `x` with Horner's rule.
pub(crate) fn evaluate(coefficients: &[BigUint], x: &BigUint, p: &BigUint) -> BigUint {
    coefficients
        .iter()
        .rev()
        .fold(BigUint::zero(), |acc, c| (acc * x + c) % p)
}

/// Multiplicative inverse through Fermat's little theorem. `p` must be prime.
///
/// `None` when `a` is zero modulo `p` or `p` is below 2.
fn inverse(a: &BigUint, p: &BigUint) -> Option<BigUint> {
    let two = BigUint::from(2u8);
    if *p < two || (a % p).is_zero() {
        return None;
    }
    Some(a.modpow(&(p - two), p))
}

fn sub_mod(a: &BigUint, b: &BigUint, p: &BigUint) -> BigUint {
    ((a % p) + p - (b % p)) % p
}

/// Lagrange interpolation of the polynomial through `points`, evaluated at `at`.
///
/// `None` if two abscissas coincide modulo `p`.
pub(crate) fn interpolate(
    points: &[(BigUint, BigUint)],
    at: &BigUint,
    p: &BigUint,
) -> Option<BigUint> {
    let mut result = BigUint::zero();
    for (i, (xi, yi)) in points.iter().enumerate() {
        let mut num = BigUint::one();
        let mut den = BigUint::one();
        for (j, (xj, _)) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            num = num * sub_mod(at, xj, p) % p;
            den = den * sub_mod(xi, xj, p) % p;
        }
        let basis = num * inverse(&den, p)? % p;
        result = (result + yi * basis) % p;
    }
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn horner_matches_direct_evaluation() {
        // 7 + 3x + 2x^2 mod 11 at x = 4 -> 7 + 12 + 32 = 51 = 7 mod 11
        let coefficients = [big(7), big(3), big(2)];
        assert_eq!(evaluate(&coefficients, &big(4), &big(11)), big(7));
    }

    #[test]
    fn interpolation_recovers_constant_term() {
        let p = big(65_521);
        let coefficients = [big(1234), big(777), big(65_000)];
        let points: Vec<_> = [2u64, 5, 9]
            .iter()
            .map(|x| (big(*x), evaluate(&coefficients, &big(*x), &p)))
            .collect();
        assert_eq!(interpolate(&points, &BigUint::zero(), &p), Some(big(1234)));
        assert_eq!(
            interpolate(&points, &big(7), &p),
            Some(evaluate(&coefficients, &big(7), &p))
        );
    }

    #[test]
    fn colliding_abscissas_have_no_interpolant() {
        // 1 and 12 are the same point mod 11
        let points = [(big(1), big(3)), (big(12), big(5))];
        assert_eq!(interpolate(&points, &BigUint::zero(), &big(11)), None);
    }

    #[test]
    fn degenerate_modulus_has_no_inverse() {
        assert_eq!(inverse(&big(1), &big(1)), None);
        assert_eq!(inverse(&big(0), &big(11)), None);
        assert_eq!(inverse(&big(3), &big(11)), Some(big(4)));
    }
}
