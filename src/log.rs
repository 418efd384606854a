/*!

Logging for the engine. Modules log through the `log` facade macros re-exported here; the
binary (or a test) decides where the records go by calling [`enable_logging`], which installs a
`log4rs` console logger writing to stderr.

The logger is process global. Calling [`enable_logging`] again swaps the configuration of the
installed logger instead of installing a second one.

*/

use std::sync::Mutex;

pub use ::log::{LevelFilter, debug, error, info, trace, warn};
use log4rs::{
    Handle,
    append::console::{ConsoleAppender, Target},
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};

use crate::error::SirvError;

const CONSOLE_APPENDER: &str = "stderr";
const LOG_PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l}):<5} {t} - {m}{n}";

static LOG_HANDLE: Mutex<Option<Handle>> = Mutex::new(None);

fn build_config(level: LevelFilter) -> Result<Config, SirvError> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    Config::builder()
        .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console)))
        .build(Root::builder().appender(CONSOLE_APPENDER).build(level))
        .map_err(|errors| SirvError::LoggingError(errors.to_string()))
}

/// Installs the console logger at `level`, or reconfigures it if it is already installed.
pub fn enable_logging(level: LevelFilter) -> Result<(), SirvError> {
    let config = build_config(level)?;
    let mut handle = LOG_HANDLE
        .lock()
        .map_err(|_| SirvError::LoggingError(String::from("logger handle lock poisoned")))?;

    match handle.as_ref() {
        Some(installed) => installed.set_config(config),
        None => {
            let installed = log4rs::init_config(config)
                .map_err(|error| SirvError::LoggingError(error.to_string()))?;
            *handle = Some(installed);
        }
    }

    Ok(())
}

/// Silences the installed logger. Does nothing if logging was never enabled.
pub fn disable_logging() -> Result<(), SirvError> {
    let handle = LOG_HANDLE
        .lock()
        .map_err(|_| SirvError::LoggingError(String::from("logger handle lock poisoned")))?;

    if let Some(installed) = handle.as_ref() {
        installed.set_config(build_config(LevelFilter::Off)?);
    }
    Ok(())
}
