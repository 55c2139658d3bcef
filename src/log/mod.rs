use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

// ----------------------------------------------
// Level
// ----------------------------------------------

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Display, IntoPrimitive, TryFromPrimitive, Serialize, Deserialize)]
pub enum Level {
    Silent,
    Verbose,
    Info,
    Warn,
    Error,
}

impl Level {
    // Silent only works as a threshold, nothing is ever logged at it.
    #[inline]
    pub fn is_enabled(self) -> bool {
        self != Self::Silent && u8::from(self) >= MIN_LEVEL.load(Ordering::Relaxed)
    }

    #[inline]
    fn tty_color(self) -> &'static str {
        match self {
            Self::Silent  => "",
            Self::Verbose => "\x1b[90m",
            Self::Info    => "\x1b[32m",
            Self::Warn    => "\x1b[33m",
            Self::Error   => "\x1b[31m",
        }
    }
}

// ----------------------------------------------
// Channel
// ----------------------------------------------

// Tags a message with the subsystem it came from ("viewport", "picker", ...).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Channel(pub &'static str);

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

#[macro_export]
macro_rules! channel {
    ($name:literal) => { $crate::log::Channel($name) };
}

// ----------------------------------------------
// Record / listener
// ----------------------------------------------

#[derive(Copy, Clone, Debug)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
    pub module: &'static str,
}

#[derive(Clone, Debug)]
pub struct Record {
    pub level: Level,
    pub channel: Option<Channel>,
    pub location: Location,
    pub message: String,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]", self.level)?;
        if let Some(channel) = self.channel {
            write!(f, " {channel}")?;
        }
        if SOURCE_LOCATION.load(Ordering::Relaxed) {
            write!(f, " {}:{} {}", self.location.file, self.location.line, self.location.module)?;
        }
        write!(f, " - {}", self.message)
    }
}

// Receives every record that passes the level filter. Set once per process.
static LISTENER: OnceLock<Box<dyn Fn(&Record) + Send + Sync>> = OnceLock::new();

// Returns false if a listener was already installed.
pub fn set_listener<F>(listener_fn: F) -> bool
    where F: Fn(&Record) + Send + Sync + 'static
{
    LISTENER.set(Box::new(listener_fn)).is_ok()
}

// ----------------------------------------------
// Global settings
// ----------------------------------------------

static MIN_LEVEL: AtomicU8 = AtomicU8::new(Level::Verbose as u8);
static SOURCE_LOCATION: AtomicBool = AtomicBool::new(false);
static TTY_COLORS: AtomicBool = AtomicBool::new(true);

pub fn set_level(level: Level) {
    MIN_LEVEL.store(level.into(), Ordering::Relaxed);
}

pub fn level() -> Level {
    Level::try_from(MIN_LEVEL.load(Ordering::Relaxed)).unwrap_or(Level::Error)
}

pub fn enable_source_location(enable: bool) {
    SOURCE_LOCATION.store(enable, Ordering::Relaxed);
}

pub fn enable_tty_colors(enable: bool) {
    TTY_COLORS.store(enable, Ordering::Relaxed);
}

// Called by the logging macros after the level check.
pub fn write_record(level: Level, channel: Option<Channel>, location: Location, args: fmt::Arguments) {
    let record = Record {
        level,
        channel,
        location,
        message: args.to_string(),
    };

    // A closed stderr is not an error worth reporting.
    let mut out = std::io::stderr().lock();
    let _ = if TTY_COLORS.load(Ordering::Relaxed) {
        writeln!(out, "{}{record}\x1b[0m", level.tty_color())
    } else {
        writeln!(out, "{record}")
    };

    if let Some(listener) = LISTENER.get() {
        listener(&record);
    }
}

#[macro_export]
macro_rules! log_at {
    ($level:expr, $chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        if $level.is_enabled() {
            $crate::log::write_record(
                $level,
                $chan,
                $crate::log::Location { file: file!(), line: line!(), module: module_path!() },
                format_args!($fmt $(, $($arg)+)?));
        }
    };
}

// ----------------------------------------------
// Macros
// ----------------------------------------------

#[macro_export]
macro_rules! verbose {
    ($chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_at!($crate::log::Level::Verbose, Some($chan), $fmt $(, $($arg)+)?)
    };
}

#[macro_export]
macro_rules! info {
    ($chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_at!($crate::log::Level::Info, Some($chan), $fmt $(, $($arg)+)?)
    };
}

#[macro_export]
macro_rules! warn {
    ($chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_at!($crate::log::Level::Warn, Some($chan), $fmt $(, $($arg)+)?)
    };
}

#[macro_export]
macro_rules! error {
    ($chan:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        $crate::log_at!($crate::log::Level::Error, Some($chan), $fmt $(, $($arg)+)?)
    };
}

// Scoped usage: log::warn!(log::channel!("viewport"), ...).
#[allow(unused_imports)]
pub use crate::{channel, verbose, info, warn, error};

#[cfg(test)]
mod tests;
