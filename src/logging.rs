use std::io::Write;

use chrono::Local;
use clap::ValueEnum;
use env_logger::{Builder, Target};
use log::{Level, LevelFilter};

use crate::error::Result;

const IDENT: &str = "jiraclient";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogLevel {
    Critical,
    Error,
    Warning,
    #[default]
    Info,
    Debug,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Critical | LogLevel::Error => LevelFilter::Error,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
        }
    }
}

fn level_name(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARNING",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Syslog priority for the user facility.
fn syslog_priority(level: Level) -> u8 {
    let severity = match level {
        Level::Error => 3,
        Level::Warn => 4,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    };
    8 + severity
}

/// Install the global logger. `RUST_LOG` overrides `level` when set.
pub fn init(level: LogLevel, syslog: bool) -> Result<()> {
    let mut builder = Builder::new();
    builder.filter_level(level.into()).parse_env("RUST_LOG");

    let pid = std::process::id();
    if syslog {
        builder.target(Target::Pipe(Box::new(syslog::connect()?)));
        builder.format(move |buf, record| {
            write!(
                buf,
                "<{}>{} {IDENT}[{pid}]: {}: {}",
                syslog_priority(record.level()),
                Local::now().format("%b %d %H:%M:%S"),
                level_name(record.level()),
                record.args()
            )
        });
    } else {
        builder.format(move |buf, record| {
            writeln!(
                buf,
                "{} {IDENT}[{pid}]: {}: {}",
                Local::now().format("%b %d %H:%M:%S"),
                level_name(record.level()),
                record.args()
            )
        });
    }

    builder.init();
    Ok(())
}

#[cfg(unix)]
mod syslog {
    use std::io::{self, Write};
    use std::os::unix::net::UnixDatagram;

    const SOCKET: &str = "/dev/log";

    /// Sends every write as one datagram to the local syslog daemon.
    pub struct Writer(UnixDatagram);

    pub fn connect() -> io::Result<Writer> {
        let socket = UnixDatagram::unbound()?;
        socket.connect(SOCKET)?;
        Ok(Writer(socket))
    }

    impl Write for Writer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.send(buf)?;
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(not(unix))]
mod syslog {
    use std::io;

    pub fn connect() -> io::Result<io::Stderr> {
        Ok(io::stderr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_and_error_share_a_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Critical), LevelFilter::Error);
        assert_eq!(LevelFilter::from(LogLevel::Warning), LevelFilter::Warn);
        assert_eq!(LevelFilter::from(LogLevel::default()), LevelFilter::Info);
    }

    #[test]
    fn test_syslog_priority_uses_user_facility() {
        assert_eq!(syslog_priority(Level::Error), 11);
        assert_eq!(syslog_priority(Level::Warn), 12);
        assert_eq!(syslog_priority(Level::Debug), 15);
        assert_eq!(level_name(Level::Warn), "WARNING");
    }
}
