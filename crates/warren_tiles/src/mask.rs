//! 4x4 subtile occupancy masks.
//!
//! Bit `row * 4 + col` is set when that subtile blocks movement. Row 0 is
//! the top of the tile. Authored form is four bracketed rows, e.g.
//! `[1000],[0110],[0000],[0001]`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SIDE: u32 = 4;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubtileMask(u16);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MaskParseError {
    #[error("collider mask '{0}' has no bracketed rows")]
    NoRows(String),
}

impl SubtileMask {
    pub const EMPTY: SubtileMask = SubtileMask(0);
    pub const FULL: SubtileMask = SubtileMask(u16::MAX);

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn is_full(self) -> bool {
        self.0 == u16::MAX
    }

    /// Whether the subtile at local `(col, row)` is blocked.
    pub fn is_blocked(self, col: u32, row: u32) -> bool {
        col < SIDE && row < SIDE && self.0 & (1 << (row * SIDE + col)) != 0
    }

    pub fn with_blocked(self, col: u32, row: u32) -> Self {
        if col < SIDE && row < SIDE {
            Self(self.0 | (1 << (row * SIDE + col)))
        } else {
            self
        }
    }

    /// Mirror left/right.
    pub fn flip_h(self) -> Self {
        self.remap(|col, row| (SIDE - 1 - col, row))
    }

    /// Mirror top/bottom.
    pub fn flip_v(self) -> Self {
        self.remap(|col, row| (col, SIDE - 1 - row))
    }

    fn remap(self, to: impl Fn(u32, u32) -> (u32, u32)) -> Self {
        let mut out = SubtileMask::EMPTY;
        for row in 0..SIDE {
            for col in 0..SIDE {
                if self.is_blocked(col, row) {
                    let (c, r) = to(col, row);
                    out = out.with_blocked(c, r);
                }
            }
        }
        out
    }
}

impl FromStr for SubtileMask {
    type Err = MaskParseError;

    /// Parse bracketed rows. Short rows leave the remaining subtiles open;
    /// any character other than `1` inside a row reads as open. Rows past
    /// the fourth are ignored and a trailing row missing its `]` still counts.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bits = 0u16;
        let mut rows = 0u32;
        let mut rest = s;
        while rows < SIDE {
            let Some(open) = rest.find('[') else {
                break;
            };
            let after = &rest[open + 1..];
            let (body, next) = match after.find(']') {
                Some(close) => (&after[..close], &after[close + 1..]),
                None => (after, ""),
            };
            for (col, ch) in body.chars().take(SIDE as usize).enumerate() {
                if ch == '1' {
                    bits |= 1 << (rows * SIDE + col as u32);
                }
            }
            rows += 1;
            rest = next;
        }
        if rows == 0 {
            return Err(MaskParseError::NoRows(s.to_string()));
        }
        Ok(SubtileMask(bits))
    }
}

impl TryFrom<String> for SubtileMask {
    type Error = MaskParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SubtileMask> for String {
    fn from(mask: SubtileMask) -> Self {
        mask.to_string()
    }
}

impl fmt::Display for SubtileMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..SIDE {
            if row > 0 {
                f.write_str(",")?;
            }
            f.write_str("[")?;
            for col in 0..SIDE {
                f.write_str(if self.is_blocked(col, row) { "1" } else { "0" })?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}
