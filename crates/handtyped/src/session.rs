//! The detection and capture loop.
//!
//! A [`Session`] owns the [`BindingSet`] for as long as it runs. Every capture writes the updated
//! set back to the [`BindingStore`] before it becomes visible to matching, and matching only ever
//! happens between captures, so no locking is needed.

use std::time::{Duration, Instant};

use crate::{
    binding::{Binding, BindingSet},
    config::Config,
    key::{KeyAction, KeyError, KeySink},
    landmark::{self, NormalizedPose, Pose, PoseError},
    matcher::PoseMatcher,
    source::{Frame, LandmarkSource},
    store::BindingStore,
    timer::{FpsCounter, FrameKind, FrameStats},
};

/// Result of processing a single frame with [`Session::process`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The frame contained no hand.
    NoHand,
    /// The hand in the frame could not be used.
    Skipped(PoseError),
    /// The hand did not match any binding.
    NoMatch,
    /// The quit gesture was recognized.
    Quit { label: String },
    /// A binding matched, but too soon after the previous key press.
    CoolingDown { label: String },
    /// A binding matched, but its key name cannot be pressed.
    UnknownKey { label: String, error: KeyError },
    /// A binding matched and its key should be pressed.
    Triggered { label: String, key: KeyAction },
}

impl Outcome {
    fn kind(&self) -> FrameKind {
        match self {
            Outcome::NoHand => FrameKind::NoHand,
            Outcome::Skipped(_) => FrameKind::Skipped,
            Outcome::NoMatch => FrameKind::NoMatch,
            Outcome::Quit { .. }
            | Outcome::CoolingDown { .. }
            | Outcome::UnknownKey { .. }
            | Outcome::Triggered { .. } => FrameKind::Matched,
        }
    }
}

/// Result of [`Session::capture`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// The binding was stored. `replaced` is `true` if it overwrote a binding with the same label.
    Saved { label: String, replaced: bool },
    /// The frame contained no hand; the user should try again.
    NoHandDetected,
}

/// Summary returned by [`Session::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: FrameStats,
    /// Number of keys handed to the sink.
    pub presses: u32,
    /// Whether the run ended because the quit gesture was recognized.
    pub quit: bool,
}

pub struct Session<B: BindingStore> {
    store: B,
    bindings: BindingSet,
    matcher: PoseMatcher,
    quit_gesture: Option<String>,
    cooldown: Duration,
    expected_landmarks: Option<usize>,
    last_trigger: Option<Instant>,
}

impl<B: BindingStore> Session<B> {
    /// Creates a session, loading the bindings from `store`.
    pub fn open(config: &Config, store: B) -> anyhow::Result<Self> {
        config.validate()?;
        let bindings = store.load()?;
        log::info!("{} gesture bindings loaded", bindings.len());

        Ok(Self {
            store,
            bindings,
            matcher: config.matcher(),
            quit_gesture: config.quit_gesture().map(String::from),
            cooldown: config.cooldown(),
            expected_landmarks: config.expected_landmarks(),
            last_trigger: None,
        })
    }

    pub fn bindings(&self) -> &BindingSet {
        &self.bindings
    }

    pub fn matcher(&self) -> &PoseMatcher {
        &self.matcher
    }

    pub fn store(&self) -> &B {
        &self.store
    }

    fn prepare(&self, pose: &Pose) -> Result<NormalizedPose, PoseError> {
        if let Some(expected) = self.expected_landmarks {
            pose.check_len(expected)?;
        }
        landmark::normalize(pose)
    }

    /// Classifies one frame at time `now`.
    ///
    /// Never fails: frames that cannot be used are reported as [`Outcome::Skipped`].
    pub fn process(&mut self, frame: &Frame, now: Instant) -> Outcome {
        let Some(pose) = frame.hand() else {
            return Outcome::NoHand;
        };
        let candidate = match self.prepare(pose) {
            Ok(candidate) => candidate,
            Err(e) => {
                log::warn!("skipping frame: {e}");
                return Outcome::Skipped(e);
            }
        };
        let Some(m) = self.matcher.find(&candidate, &self.bindings) else {
            return Outcome::NoMatch;
        };

        let label = m.label().to_string();
        log::trace!("matched '{label}' at distance {}", m.distance());
        if self.quit_gesture.as_deref() == Some(m.label()) {
            return Outcome::Quit { label };
        }

        // The cooldown has to have fully elapsed.
        if let Some(last) = self.last_trigger {
            if !self.cooldown.is_zero() && now.saturating_duration_since(last) <= self.cooldown {
                return Outcome::CoolingDown { label };
            }
        }

        let key = match KeyAction::parse(m.binding().key()) {
            Ok(key) => key,
            Err(error) => return Outcome::UnknownKey { label, error },
        };
        self.last_trigger = Some(now);

        Outcome::Triggered { label, key }
    }

    /// Presses the key of a [`Outcome::Triggered`] outcome.
    ///
    /// [`Outcome::UnknownKey`] outcomes and sink failures are logged and otherwise ignored, so that one bad
    /// binding does not stop detection. Returns whether the key was handed to the sink.
    pub fn dispatch(&self, outcome: &Outcome, sink: &mut dyn KeySink) -> bool {
        match outcome {
            Outcome::Triggered { label, key } => {
                log::info!("detected '{label}' -> {key}");
                match sink.press(key) {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!("failed to press '{key}': {e:#}");
                        false
                    }
                }
            }
            Outcome::UnknownKey { label, error } => {
                log::warn!("cannot press key of '{label}': {error}");
                false
            }
            _ => false,
        }
    }

    /// Runs detection until `source` is exhausted or the quit gesture is recognized.
    ///
    /// Errors from `source` end the run; everything else is handled per frame.
    pub fn run(
        &mut self,
        source: &mut dyn LandmarkSource,
        sink: &mut dyn KeySink,
    ) -> anyhow::Result<RunSummary> {
        let mut fps = FpsCounter::new("detection");
        let mut presses = 0;
        let mut quit = false;

        while let Some(frame) = source.next_frame()? {
            let outcome = self.process(&frame, Instant::now());
            fps.tick(outcome.kind());

            if let Outcome::Quit { label } = &outcome {
                log::info!("quit gesture '{label}' detected");
                quit = true;
                break;
            }
            if self.dispatch(&outcome, sink) {
                presses += 1;
            }
        }

        Ok(RunSummary {
            stats: fps.total(),
            presses,
            quit,
        })
    }

    /// Records the hand in `frame` as the reference pose of a new binding.
    ///
    /// The updated bindings are saved before this returns; if saving fails, the session keeps its
    /// previous bindings. A `key` that does not name a known key is stored anyway, with a warning.
    pub fn capture(
        &mut self,
        frame: &Frame,
        label: &str,
        key: &str,
    ) -> anyhow::Result<Capture> {
        if let (Some(pose), Some(expected)) = (frame.hand(), self.expected_landmarks) {
            pose.check_len(expected)?;
        }
        let Some(pose) = landmark::capture(frame.hand())? else {
            return Ok(Capture::NoHandDetected);
        };
        let binding = Binding::new(label, pose, key)?;
        if let Err(e) = KeyAction::parse(binding.key()) {
            log::warn!("'{}' is bound to a key that cannot be pressed: {e}", binding.label());
        }

        let label = binding.label().to_string();
        let mut updated = self.bindings.clone();
        let replaced = updated.insert(binding).is_some();
        self.store.save(&updated)?;
        self.bindings = updated;

        log::info!("saved '{label}' -> {key}");
        Ok(Capture::Saved { label, replaced })
    }

    /// Removes the binding with `label` and saves the result.
    ///
    /// Returns `false` if there was no such binding.
    pub fn remove(&mut self, label: &str) -> anyhow::Result<bool> {
        let mut updated = self.bindings.clone();
        if updated.remove(label).is_none() {
            return Ok(false);
        }
        self.store.save(&updated)?;
        self.bindings = updated;
        Ok(true)
    }
}
