//! Toy modular-exponentiation cipher (spec §4.2). This provides no real
//! confidentiality: the modulus is a product of two ~10-bit primes and the public
//! exponent is fixed at 7. It exists to exercise the asymmetric-key wire protocol,
//! not to protect anything. See the design notes for the non-goal this flags.

use rand::Rng;

/// One half of a key pair: `exponent` paired with the shared `modulus`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Key {
    pub exponent: u64,
    pub modulus: u64,
}

impl Key {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.exponent != 0 && self.modulus != 0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KeyPair {
    pub public: Key,
    pub private: Key,
}

const PUBLIC_EXPONENT: u64 = 7;

fn is_prime(num: u64) -> bool {
    if num < 2 || num % 2 == 0 || num % 3 == 0 {
        return num == 2 || num == 3;
    }
    let mut i = 5;
    while i * i <= num {
        if num % i == 0 || num % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

fn next_prime(base: u64) -> u64 {
    let mut num = if base <= 1 { 2 } else { base };
    while !is_prime(num) {
        num += 1;
    }
    num
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Generates a key pair: two distinct primes in disjoint ranges, `e = 7`,
/// `n = p * q`, and `d` the modular inverse of `e` mod `φ(n)` found by linear
/// search. The prime ranges are tiny by design (this is a teaching cipher, not a
/// security primitive) - see the design notes.
pub fn generate_keypair<R: Rng>(rng: &mut R) -> KeyPair {
    loop {
        let p = next_prime(rng.gen_range(1000..1500));
        let mut q = next_prime(rng.gen_range(1500..2000));
        if p == q {
            q = next_prime(q + 1);
        }

        let n = p * q;
        let phi_n = (p - 1) * (q - 1);

        if gcd(PUBLIC_EXPONENT, phi_n) != 1 {
            continue;
        }

        if let Some(d) = mod_inverse(PUBLIC_EXPONENT, phi_n) {
            return KeyPair {
                public: Key {
                    exponent: PUBLIC_EXPONENT,
                    modulus: n,
                },
                private: Key { exponent: d, modulus: n },
            };
        }
    }
}

fn mod_inverse(e: u64, phi_n: u64) -> Option<u64> {
    (1..phi_n).find(|&k| (k * e) % phi_n == 1)
}

/// Largest whole-byte plaintext block strictly packable into a value `< modulus`.
pub fn block_bytes(modulus: u64) -> usize {
    assert!(modulus != 0);
    let bit_length = 64 - modulus.leading_zeros() as usize;
    ((bit_length.saturating_sub(1)) / 8).max(1)
}

#[inline]
fn modular_pow(mut base: u64, key: &Key) -> u64 {
    if key.modulus == 1 {
        return 0;
    }

    let mut exponent = key.exponent;
    let mut result: u64 = 1;
    base %= key.modulus;

    while exponent > 0 {
        if exponent & 1 == 1 {
            result = (result as u128 * base as u128 % key.modulus as u128) as u64;
        }
        base = (base as u128 * base as u128 % key.modulus as u128) as u64;
        exponent >>= 1;
    }

    result
}

fn pack_block(data: &[u8]) -> u64 {
    data.iter().fold(0u64, |packed, &byte| (packed << 8) | byte as u64)
}

fn unpack_block(packed: u64, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let mut temp = packed;
    for i in 0..len {
        out[len - i - 1] = (temp & 0xFF) as u8;
        temp >>= 8;
    }
    out
}

/// Encrypts `plain` with `key`, splitting it into `block_bytes(key.modulus)`-sized
/// runs (the last run may be short) and raising each packed block to `key.exponent`
/// mod `key.modulus`. Returns one `u64` ciphertext block per plaintext block.
pub fn encrypt(key: &Key, plain: &[u8]) -> Vec<u64> {
    assert!(key.is_valid());
    assert!(!plain.is_empty());

    let block_len = block_bytes(key.modulus);
    plain
        .chunks(block_len)
        .map(|chunk| {
            let packed = pack_block(chunk);
            assert!(packed < key.modulus, "plaintext block does not fit the modulus");
            modular_pow(packed, key)
        })
        .collect()
}

/// Decrypts `cipher` with `key`. The recovered plaintext is always exactly
/// `cipher.len() * block_bytes(key.modulus)` bytes: if the original plaintext's
/// length was not a multiple of the block size, the last block comes back padded
/// with trailing zero bytes (see the design notes - callers that need an exact
/// length, like `SEND`, must transmit it explicitly rather than relying on a
/// terminator).
pub fn decrypt(key: &Key, cipher: &[u64]) -> Vec<u8> {
    assert!(key.is_valid());
    assert!(!cipher.is_empty());

    let block_len = block_bytes(key.modulus);
    let mut out = Vec::with_capacity(cipher.len() * block_len);
    for &block in cipher {
        out.extend(unpack_block(modular_pow(block, key), block_len));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn keypair_is_valid_and_shares_modulus() {
        let pair = generate_keypair(&mut test_rng());
        assert!(pair.public.is_valid());
        assert!(pair.private.is_valid());
        assert_eq!(pair.public.modulus, pair.private.modulus);
    }

    #[test]
    fn roundtrip_on_exact_multiple_of_block_size() {
        let pair = generate_keypair(&mut test_rng());
        let block_len = block_bytes(pair.public.modulus);
        let plain: Vec<u8> = (0..block_len as u8 * 3).collect();

        let cipher = encrypt(&pair.private, &plain);
        let recovered = decrypt(&pair.public, &cipher);

        assert_eq!(recovered, plain);
    }

    #[test]
    fn roundtrip_pads_last_block_with_zeros() {
        let pair = generate_keypair(&mut test_rng());
        let block_len = block_bytes(pair.public.modulus);
        if block_len < 2 {
            return;
        }
        let plain = vec![0xABu8; block_len + 1];

        let cipher = encrypt(&pair.private, &plain);
        let recovered = decrypt(&pair.public, &cipher);

        assert_eq!(&recovered[..plain.len()], &plain[..]);
        assert!(recovered[plain.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn block_bytes_is_at_least_one() {
        assert_eq!(block_bytes(1), 1);
        assert_eq!(block_bytes(255), 1);
    }
}
