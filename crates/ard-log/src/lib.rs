use std::path::{Path, PathBuf};

use chrono::{Datelike, Timelike};
// Re-export logging functions for convenience.
pub use log::*;
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("unable to open log file `{path}`: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid logging configuration: {0}")]
    Config(String),
    #[error("a logger has already been installed: {0}")]
    AlreadyInitialized(#[from] SetLoggerError),
}

/// Initializes logging. Should be called before any other logging functions. Provided
/// `LevelFilter` will remove all logs below the provided level.
///
/// Logs always go to the console. When `log_dir` is provided, they are also written to a file
/// inside of it named after the current time.
pub fn init(filter: LevelFilter, log_dir: Option<&Path>) -> Result<(), LogInitError> {
    // Output to console
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
        .build();

    let mut config =
        Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
    let mut root = Root::builder().appender("stdout");

    // Output to log file. Name of the file is based on the current time.
    if let Some(log_dir) = log_dir {
        let path = log_dir.join(log_file_name(chrono::Utc::now()));
        let log_file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d} [{l}] {t} - {m}{n}")))
            .build(&path)
            .map_err(|source| LogInitError::File { path, source })?;

        config = config.appender(Appender::builder().build("log_file", Box::new(log_file)));
        root = root.appender("log_file");
    }

    let config = config
        .build(root.build(filter))
        .map_err(|err| LogInitError::Config(err.to_string()))?;
    log4rs::init_config(config)?;

    log_panics::init();

    Ok(())
}

fn log_file_name<T: Datelike + Timelike>(now: T) -> String {
    format!(
        "{}-{:02}-{:02} {:02}-{:02}-{:02}.txt",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn file_name_from_time() {
        let time = chrono::Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 42).unwrap();
        assert_eq!(log_file_name(time), "2024-03-07 09-05-42.txt");
    }
}
