//! Prime helpers used to size tables when prime capacities are requested.

/// Trial division over `6k ± 1` candidates
pub fn is_prime(n: usize) -> bool {
    if n <= 1 {
        return false;
    }
    if n <= 3 {
        return true;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }

    let mut i = 5usize;
    while i.saturating_mul(i) <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Returns the smallest prime strictly greater than `n`
pub fn next_prime(n: usize) -> usize {
    let mut candidate = n + 1;
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

/// Returns `n` itself when it is prime, otherwise [`next_prime`]
pub fn prime_at_or_above(n: usize) -> usize {
    if is_prime(n) { n } else { next_prime(n) }
}

/// Returns the largest prime strictly smaller than `n`,
/// or `None` when there is none (`n <= 2`)
pub fn previous_prime(n: usize) -> Option<usize> {
    (2..n).rev().find(|&candidate| is_prime(candidate))
}

/// Returns the prime closest to `n`, preferring the lower one on ties
///
/// # Note
///
/// `0` and `1` have no lower prime, so they resolve to `2`
pub fn closest_prime(n: usize) -> usize {
    if is_prime(n) {
        return n;
    }

    let mut distance = 1;
    loop {
        if let Some(lower) = n.checked_sub(distance) {
            if is_prime(lower) {
                return lower;
            }
        }
        if is_prime(n + distance) {
            return n + distance;
        }
        distance += 1;
    }
}
