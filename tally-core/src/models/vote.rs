//! Vote direction, vote value and the signed token encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{assert_actor, Actor};
use crate::errors::StorageError;

/// Direction of a cast vote. "No vote" is represented by absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Signed value persisted in the `value` column: +1 or -1.
    pub fn value(self) -> i32 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }

    /// Decode a persisted direction. Zero is never persisted, so it is
    /// rejected along with anything outside {-1, +1}.
    pub fn from_value(value: i64) -> Result<Self, StorageError> {
        match value {
            1 => Ok(Self::Up),
            -1 => Ok(Self::Down),
            other => Err(StorageError::corruption(format!(
                "vote value outside of range: {other}"
            ))),
        }
    }
}

/// The current vote of one actor for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Vote {
    Down,
    #[default]
    None,
    Up,
}

impl Vote {
    /// -1, 0 or +1.
    pub fn value(self) -> i32 {
        match self {
            Self::Down => -1,
            Self::None => 0,
            Self::Up => 1,
        }
    }

    pub fn direction(self) -> Option<Direction> {
        match self {
            Self::Down => Some(Direction::Down),
            Self::None => None,
            Self::Up => Some(Direction::Up),
        }
    }
}

impl From<Direction> for Vote {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::Up,
            Direction::Down => Self::Down,
        }
    }
}

impl TryFrom<i64> for Vote {
    type Error = StorageError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Down),
            0 => Ok(Self::None),
            1 => Ok(Self::Up),
            other => Err(StorageError::corruption(format!(
                "vote value outside of range: {other}"
            ))),
        }
    }
}

/// `(actor, direction)` packed into one signed integer: `+actor` is an
/// upvote, `-actor` a downvote.
///
/// Tokens are only built from a positive actor, so the raw value is never
/// zero and never `i32::MIN`, and negation cannot overflow.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoteToken(i32);

impl VoteToken {
    #[track_caller]
    pub fn new(actor: Actor, direction: Direction) -> Self {
        assert_actor(actor);
        match direction {
            Direction::Up => Self(actor),
            Direction::Down => Self(-actor),
        }
    }

    pub fn up(actor: Actor) -> Self {
        Self::new(actor, Direction::Up)
    }

    pub fn down(actor: Actor) -> Self {
        Self::new(actor, Direction::Down)
    }

    /// Decode a raw signed token, rejecting `0` and `i32::MIN`.
    pub fn from_raw(raw: i32) -> Result<Self, StorageError> {
        if raw == 0 || raw == i32::MIN {
            return Err(StorageError::corruption(format!("invalid vote token: {raw}")));
        }
        Ok(Self(raw))
    }

    pub fn actor(self) -> Actor {
        self.0.abs()
    }

    pub fn direction(self) -> Direction {
        if self.0 > 0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    pub fn opposite(self) -> Self {
        Self(-self.0)
    }

    pub fn raw(self) -> i32 {
        self.0
    }
}

impl fmt::Debug for VoteToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:+}", self.0)
    }
}

impl Serialize for VoteToken {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.0)
    }
}

impl<'de> Deserialize<'de> for VoteToken {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i32::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(serde::de::Error::custom)
    }
}
