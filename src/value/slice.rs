//! Range selectors used by indexing

use std::fmt;

use crate::error::{GraphError, Result};

/// A `start:stop:step` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    #[inline]
    pub fn new(
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    ) -> Self {
        Self { start, stop, step }
    }

    /// `[..stop]`
    #[inline]
    pub fn up_to(stop: i64) -> Self {
        Self::new(None, Some(stop), None)
    }

    /// `[start..]`
    #[inline]
    pub fn from_start(start: i64) -> Self {
        Self::new(Some(start), None, None)
    }

    /// Resolve the selector against a sequence of `len` elements, returning
    /// the selected positions in order.
    pub fn indices(
        &self,
        len: usize,
    ) -> Result<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(GraphError::Operation {
                op: "slice",
                message: "slice step cannot be zero".to_string(),
            });
        }
        let len = len as i64;
        // Bounds differ by direction: forward walks [0, len], backward
        // walks [-1, len - 1].
        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
        let clamp = |bound: Option<i64>, default: i64| match bound {
            None => default,
            Some(b) if b < 0 => (b + len).max(lower),
            Some(b) => b.min(upper),
        };
        let (start, stop) = if step > 0 {
            (clamp(self.start, lower), clamp(self.stop, upper))
        } else {
            (clamp(self.start, upper), clamp(self.stop, lower))
        };

        let mut out = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            out.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(out)
    }
}

impl fmt::Display for Slice {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let part = |v: Option<i64>| v.map(|x| x.to_string()).unwrap_or_default();
        write!(f, "{}:{}", part(self.start), part(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{}", step)?;
        }
        Ok(())
    }
}
