//! Frame rate and match rate logging.

use std::{
    fmt,
    time::{Duration, Instant},
};

const INTERVAL: Duration = Duration::from_secs(1);

/// What happened to a single frame, as far as statistics are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    NoHand,
    Skipped,
    NoMatch,
    Matched,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u32,
    pub hands: u32,
    pub skipped: u32,
    pub matched: u32,
}

impl FrameStats {
    fn record(&mut self, kind: FrameKind) {
        self.frames += 1;
        match kind {
            FrameKind::NoHand => {}
            FrameKind::Skipped => self.skipped += 1,
            FrameKind::NoMatch => self.hands += 1,
            FrameKind::Matched => {
                self.hands += 1;
                self.matched += 1;
            }
        }
    }
}

impl fmt::Display for FrameStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} FPS, {} with hand, {} matched",
            self.frames, self.hands, self.matched
        )?;
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// Counts processed frames and logs the rates once per second.
pub struct FpsCounter {
    name: String,
    current: FrameStats,
    total: FrameStats,
    start: Instant,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            current: FrameStats::default(),
            total: FrameStats::default(),
            start: Instant::now(),
        }
    }

    /// Records a frame and logs the statistics of the last second if one second has passed.
    pub fn tick(&mut self, kind: FrameKind) {
        self.tick_at(kind, Instant::now());
    }

    fn tick_at(&mut self, kind: FrameKind, now: Instant) {
        self.current.record(kind);
        self.total.record(kind);
        if now.saturating_duration_since(self.start) > INTERVAL {
            log::debug!("{}: {}", self.name, self.current);

            self.current = FrameStats::default();
            self.start = now;
        }
    }

    /// Statistics over all recorded frames.
    pub fn total(&self) -> FrameStats {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts() {
        let mut fps = FpsCounter::new("test");
        let start = fps.start;
        use FrameKind::*;
        for kind in [NoHand, NoMatch, Matched, Skipped] {
            fps.tick_at(kind, start);
        }
        assert_eq!(fps.current, fps.total());
        assert_eq!(
            fps.total(),
            FrameStats {
                frames: 4,
                hands: 2,
                skipped: 1,
                matched: 1
            }
        );

        fps.tick_at(FrameKind::Matched, start + Duration::from_millis(1001));
        assert_eq!(fps.current, FrameStats::default());
        assert_eq!(fps.total().frames, 5);
        assert_eq!(fps.total().matched, 2);
    }

    #[test]
    fn display() {
        let stats = FrameStats {
            frames: 30,
            hands: 20,
            skipped: 0,
            matched: 5,
        };
        assert_eq!(stats.to_string(), "30 FPS, 20 with hand, 5 matched");
    }
}
