//! Key actions and the sinks that perform them.

use std::{borrow::Cow, fmt, io, process::Command, str::FromStr};

use anyhow::{bail, Context};
use pawawwewism::Worker;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("key name is empty")]
    Empty,
    #[error("unknown key '{0}'")]
    Unknown(String),
}

/// Keys that are referred to by name rather than by the character they type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Space,
    Backspace,
    Tab,
    Escape,
    Shift,
    Ctrl,
    Alt,
    Cmd,
    Up,
    Down,
    Left,
    Right,
    /// Function key `F1` to `F12`.
    F(u8),
}

impl NamedKey {
    fn parse(name: &str) -> Option<Self> {
        use NamedKey::*;
        let key = match name {
            "enter" | "return" => Enter,
            "space" => Space,
            "backspace" => Backspace,
            "tab" => Tab,
            "esc" | "escape" => Escape,
            "shift" => Shift,
            "ctrl" | "control" => Ctrl,
            "alt" => Alt,
            "cmd" | "command" | "super" => Cmd,
            "up" => Up,
            "down" => Down,
            "left" => Left,
            "right" => Right,
            _ => {
                let n = name.strip_prefix('f')?.parse::<u8>().ok()?;
                if !(1..=12).contains(&n) {
                    return None;
                }
                F(n)
            }
        };
        Some(key)
    }

    /// Canonical lowercase name, as accepted by [`KeyAction::parse`].
    pub fn name(self) -> Cow<'static, str> {
        use NamedKey::*;
        let name = match self {
            Enter => "enter",
            Space => "space",
            Backspace => "backspace",
            Tab => "tab",
            Escape => "esc",
            Shift => "shift",
            Ctrl => "ctrl",
            Alt => "alt",
            Cmd => "cmd",
            Up => "up",
            Down => "down",
            Left => "left",
            Right => "right",
            F(n) => return format!("f{n}").into(),
        };
        name.into()
    }

    /// X11 keysym name of this key.
    pub fn keysym(self) -> Cow<'static, str> {
        use NamedKey::*;
        let keysym = match self {
            Enter => "Return",
            Space => "space",
            Backspace => "BackSpace",
            Tab => "Tab",
            Escape => "Escape",
            Shift => "Shift_L",
            Ctrl => "Control_L",
            Alt => "Alt_L",
            Cmd => "Super_L",
            Up => "Up",
            Down => "Down",
            Left => "Left",
            Right => "Right",
            F(n) => return format!("F{n}").into(),
        };
        keysym.into()
    }
}

/// What to do when a gesture is recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Type a single printable character.
    Char(char),
    /// Press and release a named key.
    Named(NamedKey),
}

impl KeyAction {
    /// Parses a key-action identifier as stored in a binding.
    ///
    /// A string consisting of exactly one printable character (including a single space) types
    /// that character, case preserved. Anything else is looked up case-insensitively among the
    /// named keys: `enter`, `space`, `backspace`, `tab`, `esc`, `shift`, `ctrl`, `alt`, `cmd`,
    /// the arrow keys `up`/`down`/`left`/`right`, and `f1` to `f12`.
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if !c.is_control() {
                return Ok(Self::Char(c));
            }
        }

        let name = s.trim();
        if name.is_empty() {
            return Err(KeyError::Empty);
        }
        NamedKey::parse(&name.to_lowercase())
            .map(Self::Named)
            .ok_or_else(|| KeyError::Unknown(name.to_string()))
    }
}

impl FromStr for KeyAction {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, KeyError> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{c}"),
            Self::Named(key) => f.write_str(&key.name()),
        }
    }
}

/// Performs key actions, usually by injecting key events into the OS.
pub trait KeySink {
    fn press(&mut self, key: &KeyAction) -> anyhow::Result<()>;
}

impl<S: KeySink + ?Sized> KeySink for Box<S> {
    fn press(&mut self, key: &KeyAction) -> anyhow::Result<()> {
        (**self).press(key)
    }
}

/// Only logs key presses. Useful for trying out bindings.
#[derive(Debug, Default)]
pub struct LogSink;

impl KeySink for LogSink {
    fn press(&mut self, key: &KeyAction) -> anyhow::Result<()> {
        log::info!("press '{key}'");
        Ok(())
    }
}

/// Remembers every key it was asked to press.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pressed: Vec<KeyAction>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pressed(&self) -> &[KeyAction] {
        &self.pressed
    }
}

impl KeySink for RecordingSink {
    fn press(&mut self, key: &KeyAction) -> anyhow::Result<()> {
        self.pressed.push(*key);
        Ok(())
    }
}

/// Injects key events on X11 by invoking the `xdotool` command.
#[derive(Debug)]
pub struct XdotoolSink {
    program: String,
}

impl Default for XdotoolSink {
    fn default() -> Self {
        Self {
            program: "xdotool".into(),
        }
    }
}

impl XdotoolSink {
    /// Uses `program` instead of looking up `xdotool` in `PATH`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, key: &KeyAction) -> Command {
        let mut cmd = Command::new(&self.program);
        match key {
            KeyAction::Char(c) => {
                cmd.args(["type", "--clearmodifiers", "--"]).arg(c.to_string());
            }
            KeyAction::Named(key) => {
                cmd.args(["key", "--clearmodifiers"]).arg(&*key.keysym());
            }
        }
        cmd
    }
}

impl KeySink for XdotoolSink {
    fn press(&mut self, key: &KeyAction) -> anyhow::Result<()> {
        let status = self
            .command(key)
            .status()
            .with_context(|| format!("failed to run `{}`", self.program))?;
        if !status.success() {
            bail!("`{}` failed to press '{key}': {status}", self.program);
        }
        Ok(())
    }
}

/// Presses keys on a background worker thread.
///
/// Up to [`WorkerSink::QUEUE`] presses can be pending while the wrapped sink is busy; only then
/// does [`KeySink::press`] block. Failures of the wrapped sink are logged by the worker.
pub struct WorkerSink {
    worker: Worker<KeyAction>,
}

impl WorkerSink {
    /// Number of presses that can be queued without blocking the caller.
    pub const QUEUE: usize = 16;

    pub fn spawn<S: KeySink + Send + 'static>(mut inner: S) -> Result<Self, io::Error> {
        let worker = Worker::builder()
            .name("key injector")
            .capacity(Self::QUEUE)
            .spawn(move |key: KeyAction| {
                if let Err(e) = inner.press(&key) {
                    log::warn!("failed to press '{key}': {e:#}");
                }
            })?;
        Ok(Self { worker })
    }
}

impl KeySink for WorkerSink {
    fn press(&mut self, key: &KeyAction) -> anyhow::Result<()> {
        self.worker.send(*key);
        Ok(())
    }
}
