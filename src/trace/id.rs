//! Trace and span identifiers.
//!
//! Identifiers are never zero: an all-zero id is the "invalid" value on the
//! wire, so generation loops until it draws a non-zero value.

use std::fmt;

use rand::Rng;

/// 128-bit trace identifier, rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceId(u128);

impl TraceId {
    /// Draw a random non-zero trace id.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let value: u128 = rng.gen();
            if value != 0 {
                return Self(value);
            }
        }
    }

    /// Wrap a raw value. Returns `None` for zero.
    pub fn from_u128(value: u128) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    /// Parse 32 hex characters. Zero and malformed input yield `None`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u128::from_str_radix(hex, 16).ok().and_then(Self::from_u128)
    }

    pub fn to_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// 64-bit span identifier, rendered as 16 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanId(u64);

impl SpanId {
    /// Draw a random non-zero span id.
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let value: u64 = rng.gen();
            if value != 0 {
                return Self(value);
            }
        }
    }

    pub fn from_u64(value: u64) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    /// Parse 16 hex characters. Zero and malformed input yield `None`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 16 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u64::from_str_radix(hex, 16).ok().and_then(Self::from_u64)
    }

    pub fn to_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}
