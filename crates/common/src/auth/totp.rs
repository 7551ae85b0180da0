//! Time-based one-time passwords (RFC 6238, HMAC-SHA256)

use crate::errors::{AppError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Secret size in bytes
pub const SECRET_LEN: usize = 20;

/// A TOTP generator bound to one secret
#[derive(Debug, Clone)]
pub struct Totp {
    secret: Vec<u8>,
    digits: u32,
    step_secs: u64,
    /// Accepted drift, in steps, on each side
    skew: u64,
}

impl Totp {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            digits: 6,
            step_secs: 30,
            skew: 1,
        }
    }

    /// Build from a stored base32 secret
    pub fn from_base32(encoded: &str) -> Result<Self> {
        decode_base32(encoded).map(Self::new)
    }

    /// Fresh random secret
    pub fn generate() -> Self {
        let secret: [u8; SECRET_LEN] = rand::random();
        Self::new(secret.to_vec())
    }

    pub fn with_digits(mut self, digits: u32) -> Self {
        self.digits = digits;
        self
    }

    pub fn secret_base32(&self) -> String {
        encode_base32(&self.secret)
    }

    /// Code for a Unix timestamp
    pub fn code_at(&self, unix_secs: u64) -> String {
        let counter = unix_secs / self.step_secs;
        // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC takes any key size");
        mac.update(&counter.to_be_bytes());
        let digest = mac.finalize().into_bytes();

        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let binary = ((digest[offset] as u32 & 0x7f) << 24)
            | ((digest[offset + 1] as u32) << 16)
            | ((digest[offset + 2] as u32) << 8)
            | digest[offset + 3] as u32;
        let code = binary % 10u32.pow(self.digits);
        format!("{:0width$}", code, width = self.digits as usize)
    }

    /// Time step the code belongs to, tolerating clock skew
    pub fn matching_step_at(&self, code: &str, unix_secs: u64) -> Option<u64> {
        let code = code.trim();
        if code.len() != self.digits as usize || !code.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let current = unix_secs / self.step_secs;
        let mut matched = None;
        for step in current.saturating_sub(self.skew)..=current + self.skew {
            // no early exit, every window is computed
            if constant_time_eq(self.code_at(step * self.step_secs).as_bytes(), code.as_bytes()) {
                matched = Some(step);
            }
        }
        matched
    }

    /// Step of a valid code that is newer than `last_used`
    pub fn accept_at(&self, code: &str, last_used: Option<u64>, unix_secs: u64) -> Option<u64> {
        self.matching_step_at(code, unix_secs)
            .filter(|step| last_used.map_or(true, |last| *step > last))
    }

    /// [`Totp::accept_at`] against the current time
    pub fn accept(&self, code: &str, last_used: Option<u64>) -> Option<u64> {
        self.accept_at(code, last_used, now_secs())
    }

    /// Provisioning URI for authenticator apps
    pub fn otpauth_uri(&self, issuer: &str, account: &str) -> String {
        format!(
            "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA256&digits={}&period={}",
            percent_encode(issuer),
            percent_encode(account),
            self.secret_base32(),
            percent_encode(issuer),
            self.digits,
            self.step_secs
        )
    }
}

fn now_secs() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn percent_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'@' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// RFC 4648 base32 without padding
pub fn encode_base32(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() * 8).div_ceil(5));
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &byte in data {
        buffer = (buffer << 8) | byte as u32;
        bits += 8;
        while bits >= 5 {
            let index = (buffer >> (bits - 5)) & 0x1f;
            out.push(BASE32_ALPHABET[index as usize] as char);
            bits -= 5;
        }
    }
    if bits > 0 {
        let index = (buffer << (5 - bits)) & 0x1f;
        out.push(BASE32_ALPHABET[index as usize] as char);
    }
    out
}

/// Decode RFC 4648 base32, ignoring padding, spaces and case
pub fn decode_base32(encoded: &str) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(encoded.len() * 5 / 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for c in encoded.chars().filter(|c| *c != '=' && !c.is_whitespace()) {
        let upper = c.to_ascii_uppercase() as u8;
        let value = BASE32_ALPHABET
            .iter()
            .position(|&a| a == upper)
            .ok_or_else(|| AppError::InvalidFormat {
                message: format!("invalid base32 character '{}'", c),
            })?;
        buffer = (buffer << 5) | value as u32;
        bits += 5;
        if bits >= 8 {
            out.push((buffer >> (bits - 8)) as u8);
            bits -= 8;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 6238 appendix B, SHA-256 seed
    const RFC_SEED: &[u8] = b"12345678901234567890123456789012";

    #[test]
    fn test_rfc6238_sha256_vectors() {
        let totp = Totp::new(RFC_SEED.to_vec()).with_digits(8);
        assert_eq!(totp.code_at(59), "46119246");
        assert_eq!(totp.code_at(1111111109), "68084774");
        assert_eq!(totp.code_at(1111111111), "67062674");
        assert_eq!(totp.code_at(1234567890), "91819424");
    }

    #[test]
    fn test_verify_with_skew() {
        let totp = Totp::new(RFC_SEED.to_vec());
        let now = 1_700_000_000;
        let previous = totp.code_at(now - 30);
        let far = totp.code_at(now - 120);
        assert_eq!(totp.matching_step_at(&totp.code_at(now), now), Some(now / 30));
        assert_eq!(totp.matching_step_at(&previous, now), Some(now / 30 - 1));
        let window = [now - 30, now, now + 30].map(|t| totp.code_at(t));
        if !window.contains(&far) {
            assert_eq!(totp.matching_step_at(&far, now), None);
        }
        assert_eq!(totp.matching_step_at("12345", now), None);
        assert_eq!(totp.matching_step_at("abcdef", now), None);
    }

    #[test]
    fn test_used_step_is_not_accepted_again() {
        let totp = Totp::new(RFC_SEED.to_vec());
        let now = 1_700_000_010;
        let code = totp.code_at(now);

        let step = totp.accept_at(&code, None, now).unwrap();
        assert_eq!(step, now / 30);
        assert_eq!(totp.accept_at(&code, Some(step), now), None);
        // still inside the skew window, but already spent
        assert_eq!(totp.accept_at(&code, Some(step), now + 30), None);

        let next = totp.code_at(now + 30);
        assert_eq!(totp.accept_at(&next, Some(step), now + 30), Some(step + 1));
        // an older code is refused once a newer one was used
        let previous = totp.code_at(now - 30);
        assert_eq!(totp.accept_at(&previous, Some(step), now), None);
    }

    #[test]
    fn test_base32() {
        assert_eq!(encode_base32(b"foobar"), "MZXW6YTBOI");
        assert_eq!(decode_base32("MZXW6YTBOI").unwrap(), b"foobar");
        assert_eq!(decode_base32("mzxw 6ytb oi======").unwrap(), b"foobar");
        assert!(decode_base32("MZ1W").is_err());
    }

    #[test]
    fn test_secret_roundtrip() {
        let totp = Totp::generate();
        let restored = Totp::from_base32(&totp.secret_base32()).unwrap();
        assert_eq!(totp.code_at(1_000_000), restored.code_at(1_000_000));
    }

    #[test]
    fn test_otpauth_uri() {
        let totp = Totp::new(b"foobar".to_vec());
        let uri = totp.otpauth_uri("Câmara Ourinhos", "ana@camara.sp.gov.br");
        assert!(uri.starts_with("otpauth://totp/C%C3%A2mara%20Ourinhos:ana@camara.sp.gov.br?"));
        assert!(uri.contains("secret=MZXW6YTBOI"));
        assert!(uri.contains("algorithm=SHA256"));
    }
}
