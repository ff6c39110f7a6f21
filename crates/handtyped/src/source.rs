//! Landmark sources: where hand poses come from.
//!
//! Landmark extraction itself happens outside of this crate. A [`LandmarkSource`] only delivers
//! its results, one [`Frame`] per camera frame.

use std::io::BufRead;

use anyhow::Context;
use serde::Deserialize;

use crate::landmark::Pose;

/// Extractor result for one camera frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Exactly one hand was detected.
    Hand(Pose),
    /// No hand was detected.
    Empty,
}

impl Frame {
    pub fn hand(&self) -> Option<&Pose> {
        match self {
            Frame::Hand(pose) => Some(pose),
            Frame::Empty => None,
        }
    }
}

impl From<Option<Pose>> for Frame {
    fn from(pose: Option<Pose>) -> Self {
        pose.map_or(Frame::Empty, Frame::Hand)
    }
}

pub trait LandmarkSource {
    /// Returns the next frame, or `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>>;
}

impl<S: LandmarkSource + ?Sized> LandmarkSource for &mut S {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        (**self).next_frame()
    }
}

/// Reads one frame per line of JSON.
///
/// Each non-blank line is one of:
///
/// - `null` or `[]`: no hand detected,
/// - `[[x, y, z], ...]`: the landmarks of the detected hand,
/// - `{"landmarks": ...}` with either of the above as value. Other fields are ignored.
///
/// This is the format an external extractor process (eg. a MediaPipe script) can print to its
/// stdout.
pub struct JsonLinesSource<R> {
    reader: R,
    line: String,
    line_no: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Line {
    Bare(Option<Vec<[f32; 3]>>),
    Object { landmarks: Option<Vec<[f32; 3]>> },
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> LandmarkSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .context("failed to read landmarks")?;
            if read == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = self.line.trim();
            if line.is_empty() {
                continue;
            }

            let parsed: Line = serde_json::from_str(line)
                .with_context(|| format!("invalid landmarks on line {}", self.line_no))?;
            let coords = match parsed {
                Line::Bare(coords) | Line::Object { landmarks: coords } => coords,
            };
            let frame = match coords {
                Some(coords) if !coords.is_empty() => Frame::Hand(Pose::from(coords)),
                _ => Frame::Empty,
            };
            return Ok(Some(frame));
        }
    }
}

/// Plays back a fixed sequence of frames.
pub struct Replay<I> {
    frames: I,
}

impl<I: Iterator<Item = Frame>> Replay<I> {
    pub fn new(frames: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            frames: frames.into_iter(),
        }
    }
}

impl<I: Iterator<Item = Frame>> LandmarkSource for Replay<I> {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        Ok(self.frames.next())
    }
}
