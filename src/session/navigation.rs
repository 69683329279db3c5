//! Cyclic tab-stop navigation

use std::str::FromStr;

use tracing::debug;

use super::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" | "next" => Ok(Self::Forward),
            "backward" | "prev" => Ok(Self::Backward),
            other => Err(format!("unknown direction `{}`", other)),
        }
    }
}

/// Position of the active stop in the rendered content.
///
/// `col` is where the cursor goes and `length` how much text after it to
/// select. Every field is -1 when there is no column-navigable stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpPosition {
    pub line: i64,
    pub orig_col: i64,
    pub col: i64,
    pub length: i64,
}

impl JumpPosition {
    pub const NONE: Self = Self {
        line: -1,
        orig_col: -1,
        col: -1,
        length: -1,
    };

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

/// Move `index` one step and fold it into `(-len, len)`.
///
/// The sign only turns negative when a backward step lands below zero, and
/// the magnitude wraps as `|index| % len`, so forward steps from a negative
/// index fold towards zero rather than continuing from the end.
pub fn step(index: i64, direction: Direction, len: usize) -> i64 {
    let len = len as i64;
    if len == 0 {
        return 0;
    }
    let (index, sign) = match direction {
        Direction::Forward => (index + 1, 1),
        Direction::Backward if index - 1 < 0 => (index - 1, -1),
        Direction::Backward => (index - 1, 1),
    };
    sign * (index.abs() % len)
}

/// Resolve a possibly negative index into a slot of a list of `len`
pub fn slot(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let slot = if index < 0 { len + index } else { index };
    (0..len).contains(&slot).then_some(slot as usize)
}

/// First stop to visit: stop 0 is skipped when other stops exist
pub fn initial_index(stops: &[u32]) -> i64 {
    match stops {
        [0, _, ..] => 1,
        _ => 0,
    }
}

impl Session {
    /// Move to the next or previous stop and report its position
    pub fn jump(&mut self, direction: Direction) -> JumpPosition {
        if self.stops.is_empty() {
            return JumpPosition::NONE;
        }
        self.current = step(self.current, direction, self.stops.len());
        debug!(
            trigger = %self.trigger,
            index = self.current,
            stop = ?self.current_stop(),
            "jump"
        );
        self.jump_position()
    }

    /// Position of the current stop in the latest render
    pub fn jump_position(&self) -> JumpPosition {
        let node = match self.current_stop().and_then(|n| self.registry.get(n)) {
            Some(id) => self.body.node(id),
            None => return JumpPosition::NONE,
        };
        if !node.placed || node.start.line != node.end.line {
            return JumpPosition::NONE;
        }

        let line = node.start.line as i64;
        let orig_col = node.start.column as i64;
        let end_col = node.end.column as i64;
        if node.edited {
            JumpPosition {
                line,
                orig_col,
                col: end_col,
                length: 0,
            }
        } else {
            JumpPosition {
                line,
                orig_col,
                col: orig_col,
                length: end_col - orig_col,
            }
        }
    }

    /// Number of the active stop
    pub fn current_stop(&self) -> Option<u32> {
        slot(self.current, self.stops.len()).map(|i| self.stops[i])
    }

    /// Return to the first stop
    pub fn reset(&mut self) {
        self.current = initial_index(&self.stops);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn walk(start: i64, direction: Direction, len: usize, steps: usize) -> Vec<i64> {
        let mut index = start;
        (0..steps)
            .map(|_| {
                index = step(index, direction, len);
                index
            })
            .collect()
    }

    #[test]
    fn test_forward_wraps() {
        assert_eq!(walk(0, Direction::Forward, 3, 4), vec![1, 2, 0, 1]);
    }

    #[test]
    fn test_backward_cycles_through_negative_indices() {
        assert_eq!(walk(0, Direction::Backward, 3, 3), vec![-1, -2, 0]);
    }

    #[test]
    fn test_forward_from_negative_folds_towards_zero() {
        assert_eq!(walk(-2, Direction::Forward, 3, 3), vec![1, 2, 0]);
        assert_eq!(step(-1, Direction::Forward, 3), 0);
    }

    #[test]
    fn test_slot() {
        assert_eq!(slot(0, 3), Some(0));
        assert_eq!(slot(-1, 3), Some(2));
        assert_eq!(slot(-3, 3), Some(0));
        assert_eq!(slot(3, 3), None);
        assert_eq!(slot(0, 0), None);
    }

    #[test]
    fn test_initial_index() {
        assert_eq!(initial_index(&[0, 1, 2]), 1);
        assert_eq!(initial_index(&[0]), 0);
        assert_eq!(initial_index(&[1, 2]), 0);
        assert_eq!(initial_index(&[]), 0);
    }

    #[test]
    fn test_direction_from_str() {
        assert_eq!("forward".parse::<Direction>(), Ok(Direction::Forward));
        assert_eq!("prev".parse::<Direction>(), Ok(Direction::Backward));
        assert!("sideways".parse::<Direction>().is_err());
    }
}
