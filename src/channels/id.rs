//! Channel ids and the fixed channel space.
//!
//! A [`ChannelId`] can only be obtained through [`ChannelSpace::resolve`], so every
//! id that reaches a table lookup has already passed the range check.

use std::fmt;

use crate::error::RelayError;

/// Range-checked logical channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u32);

impl ChannelId {
    pub fn get(self) -> u32 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed channel space `0..len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpace {
    len: u32,
}

impl ChannelSpace {
    pub fn new(len: u32) -> Self {
        Self { len }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Range-checks a raw upstream id.
    pub fn resolve(&self, raw: i64) -> Result<ChannelId, RelayError> {
        match u32::try_from(raw) {
            Ok(id) if id < self.len => Ok(ChannelId(id)),
            _ => Err(RelayError::OutOfRangeChannel {
                raw,
                limit: self.len,
            }),
        }
    }

    /// Every id in the space, ascending.
    pub fn ids(self) -> impl Iterator<Item = ChannelId> {
        (0..self.len).map(ChannelId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_checks_both_ends() {
        let space = ChannelSpace::new(6);
        assert_eq!(space.resolve(0).map(ChannelId::get), Ok(0));
        assert_eq!(space.resolve(5).map(ChannelId::get), Ok(5));
        assert_eq!(
            space.resolve(6),
            Err(RelayError::OutOfRangeChannel { raw: 6, limit: 6 })
        );
        assert!(space.resolve(-99).is_err());
        assert!(space.resolve(99).is_err());
        assert!(space.resolve(i64::MAX).is_err());
    }

    #[test]
    fn ids_cover_space() {
        let ids: Vec<u32> = ChannelSpace::new(3).ids().map(ChannelId::get).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }
}
