use std::{cell::RefCell, fmt::Arguments};

pub trait Logger {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>);
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Level {
    Verbose,
    Info,
    Warn,
    Error,
}

impl Level {
    /// The tag that starts every line of an extraction log
    pub fn tag(self) -> &'static str {
        match self {
            Level::Verbose => "[DEBUG]",
            Level::Info => "[INFO]",
            Level::Warn => "[WARNING]",
            Level::Error => "[ERROR]",
        }
    }

    fn to_log(self) -> log::Level {
        match self {
            Level::Verbose => log::Level::Debug,
            Level::Info => log::Level::Info,
            Level::Warn => log::Level::Warn,
            Level::Error => log::Level::Error,
        }
    }
}

/// Forwards everything to the `log` crate.
pub struct LogLogger;

impl Logger for LogLogger {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>) {
        log::log!(target: target, level.to_log(), "{}", body);
    }
}

/// The human-readable log of one extraction. Every line is kept, in order, as
/// `"[LEVEL] - message"`, and mirrored to the `log` crate with the source as context.
pub struct ExtractionLog {
    source: String,
    lines: RefCell<Vec<String>>,
}

impl ExtractionLog {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            lines: RefCell::new(Vec::new()),
        }
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines.into_inner()
    }
}

impl Logger for ExtractionLog {
    fn log(&self, level: Level, target: &str, body: Arguments<'_>) {
        let line = format!("{} - {}", level.tag(), body);
        LogLogger.log(level, target, format_args!("{} ({})", line, self.source));
        self.lines.borrow_mut().push(line);
    }
}

#[allow(unused_macros)]
macro_rules! information {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::keyframe::logger::Level::Info,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

#[allow(unused_macros)]
macro_rules! warning {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::keyframe::logger::Level::Warn,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

#[allow(unused_macros)]
macro_rules! fault {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::keyframe::logger::Level::Error,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

#[allow(unused_macros)]
macro_rules! verbose {
    ($logger:expr, $($args:tt)*) => {
        $logger.log(
            $crate::keyframe::logger::Level::Verbose,
            std::module_path!(),
            std::format_args!($($args)*)
        )
    }
}

#[allow(unused_imports)]
pub(crate) use fault;
#[allow(unused_imports)]
pub(crate) use information;
#[allow(unused_imports)]
pub(crate) use verbose;
#[allow(unused_imports)]
pub(crate) use warning;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lines_are_tagged_in_order() {
        let log = ExtractionLog::new("video.mp4");
        information!(log, "first {}", 1);
        warning!(log, "second");
        fault!(log, "third");
        verbose!(log, "fourth");
        assert_eq!(
            vec![
                "[INFO] - first 1",
                "[WARNING] - second",
                "[ERROR] - third",
                "[DEBUG] - fourth",
            ],
            log.into_lines()
        );
    }
}
