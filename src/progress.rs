//! Advisory progress reporting.
//!
//! Every algorithm in this crate takes a [`Progress`] by value and reports integer percentages in
//! `0..=100` through it. Reported values are non-decreasing within one reporter, and `100` is
//! always reported when a routine succeeds. Nothing in the crate polls the callback for
//! cancellation.

use crate::assert;

/// Progress reporter wrapping an optional user callback.
///
/// A reporter covers a range of the caller's percentages. [`Progress::sub`] hands out a child
/// reporter that maps its own `0..=100` onto part of that range, which is how multi-phase
/// routines split their progress between phases.
pub struct Progress<'a> {
    callback: Option<&'a mut (dyn FnMut(usize) + 'a)>,
    lo: usize,
    hi: usize,
    last: Last<'a>,
}

// Child reporters share the last forwarded value with their parent, so that the values seen by
// the callback stay increasing across phases.
enum Last<'a> {
    Root(Option<usize>),
    Nested(&'a mut Option<usize>),
}

impl Last<'_> {
    #[inline]
    fn get_mut(&mut self) -> &mut Option<usize> {
        match self {
            Last::Root(last) => last,
            Last::Nested(last) => last,
        }
    }
}

impl Default for Progress<'_> {
    #[inline]
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> Progress<'a> {
    /// Returns a reporter that discards every update.
    #[inline]
    pub fn none() -> Self {
        Self {
            callback: None,
            lo: 0,
            hi: 100,
            last: Last::Root(None),
        }
    }

    /// Returns a reporter that forwards updates to `callback`.
    #[inline]
    pub fn new(callback: &'a mut (dyn FnMut(usize) + 'a)) -> Self {
        Self {
            callback: Some(callback),
            lo: 0,
            hi: 100,
            last: Last::Root(None),
        }
    }

    /// Returns `true` if updates reach a callback.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.callback.is_some()
    }

    /// Reports that `percent` of the work covered by this reporter is done. Values above `100`
    /// are clamped, and values lower than the last reported one are dropped.
    pub fn report(&mut self, percent: usize) {
        let Some(callback) = &mut self.callback else {
            return;
        };
        let percent = percent.min(100);
        let value = self.lo + (self.hi - self.lo) * percent / 100;
        let last = self.last.get_mut();
        if last.map_or(true, |last| value > last) {
            *last = Some(value);
            (*callback)(value);
        }
    }

    /// Reports `done` out of `total` units of work.
    #[inline]
    pub fn report_fraction(&mut self, done: usize, total: usize) {
        if total == 0 {
            self.report(100);
        } else {
            self.report(done.saturating_mul(100) / total);
        }
    }

    /// Reports completion.
    #[inline]
    pub fn finish(&mut self) {
        self.report(100);
    }

    /// Returns a reporter covering `lo..=hi` percent of the range of `self`.
    ///
    /// # Panics
    /// Panics if `lo > hi` or `hi > 100`.
    #[track_caller]
    pub fn sub(&mut self, lo: usize, hi: usize) -> Progress<'_> {
        assert!(all(lo <= hi, hi <= 100));
        let span = self.hi - self.lo;
        Progress {
            callback: self
                .callback
                .as_mut()
                .map(|callback| &mut **callback as &mut dyn FnMut(usize)),
            lo: self.lo + span * lo / 100,
            hi: self.lo + span * hi / 100,
            last: Last::Nested(self.last.get_mut()),
        }
    }

    /// Returns a reporter covering the same range as `self`, for the duration of the borrow.
    #[inline]
    pub fn rb_mut(&mut self) -> Progress<'_> {
        self.sub(0, 100)
    }
}
