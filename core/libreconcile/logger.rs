// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Backends for the log facade. stdout carries the reconciliation result, so
//! the console logger writes to stderr.
use log::{Level, LevelFilter, Log};
use std::{
    io::Write,
    os::unix::net::UnixDatagram,
    sync::{Arc, Mutex},
};

/// syslog facility LOG_DAEMON
const LOG_DAEMON: u8 = 3;

fn write_msg_common(writer: &mut impl Write, level: Level, module: &str, msg: String) {
    let now = chrono::Local::now();

    /* time, level, module, message */
    let line = format!(
        "{} {:<5} {} {}\n",
        now.format("%Y-%m-%d %H:%M:%S"),
        level,
        module,
        msg
    );
    if let Err(e) = writer.write_all(line.as_bytes()) {
        eprintln!("Failed to log message: {}", e);
    }
}

fn syslog_severity(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warn => 4,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    }
}

struct SysLogger {
    app_name: String,
    dgram: Arc<Mutex<UnixDatagram>>,
}

impl SysLogger {
    fn connect(app_name: &str) -> Result<Self, std::io::Error> {
        let sock = UnixDatagram::unbound()?;
        sock.connect("/dev/log")?;
        Ok(Self {
            app_name: app_name.to_string(),
            dgram: Arc::new(Mutex::new(sock)),
        })
    }
}

/* Only the very basic log function is supported. */
impl Log for SysLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let msg = format!(
            "<{}>{}[{}]: {}",
            LOG_DAEMON * 8 + syslog_severity(record.level()),
            self.app_name,
            std::process::id(),
            record.args()
        );

        let dgram = match self.dgram.lock() {
            Ok(v) => v,
            Err(_) => return,
        };

        if let Err(e) = dgram.send(msg.as_bytes()) {
            eprintln!("Failed to log message: {}", e);
        }
    }

    fn flush(&self) {}
}

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let mut stderr = std::io::stderr();
        let module_path = match record.module_path() {
            None => "unknown",
            Some(v) => v,
        };
        write_msg_common(
            &mut stderr,
            record.level(),
            module_path,
            record.args().to_string(),
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

struct CombinedLogger {
    loggers: Vec<Box<dyn Log>>,
}

impl Log for CombinedLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.loggers.iter().any(|l| l.enabled(metadata))
    }

    fn log(&self, record: &log::Record) {
        for logger in self.loggers.iter() {
            logger.log(record);
        }
    }

    fn flush(&self) {
        for logger in self.loggers.iter() {
            logger.flush();
        }
    }
}

/// Parse a configured log level, None for an unsupported value.
pub fn parse_level(level: &str) -> Option<LevelFilter> {
    match level {
        "trace" => Some(LevelFilter::Trace),
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

fn console_or_syslog(app_name: &str, want_syslog: bool, want_console: bool) -> Box<dyn Log> {
    let mut loggers: Vec<Box<dyn Log>> = Vec::new();
    if want_syslog {
        match SysLogger::connect(app_name) {
            Ok(l) => loggers.push(Box::new(l)),
            Err(e) => {
                eprintln!("Failed to connect to /dev/log ({}), logging to console", e);
                if !want_console {
                    loggers.push(Box::new(ConsoleLogger));
                }
            }
        }
    }
    if want_console {
        loggers.push(Box::new(ConsoleLogger));
    }
    Box::new(CombinedLogger { loggers })
}

/// Init and set the logger
///
/// [`app_name`]: which app output the log
///
/// level:  maximum log level
///
/// target: log target, one of `console`, `syslog` and `console-syslog`
pub fn init_log(app_name: &str, level: LevelFilter, target: &str) {
    let logger = match target {
        "syslog" => console_or_syslog(app_name, true, false),
        "console-syslog" => console_or_syslog(app_name, true, true),
        "console" => console_or_syslog(app_name, false, true),
        _ => {
            eprintln!("Unsupported LogTarget '{}', logging to console", target);
            console_or_syslog(app_name, false, true)
        }
    };

    /* A second init only adjusts the level. */
    if let Err(e) = log::set_boxed_logger(logger) {
        log::debug!("logger already initialized: {}", e);
    }
    log::set_max_level(level);
}

/// Init and set the log target to console
pub fn init_log_to_console(app_name: &str, level: LevelFilter) {
    init_log(app_name, level, "console");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_level("off"), Some(LevelFilter::Off));
        assert_eq!(parse_level("verbose"), None);
    }

    #[test]
    fn test_write_msg_common() {
        let mut buf: Vec<u8> = Vec::new();
        write_msg_common(
            &mut buf,
            Level::Warn,
            "reconcile::observer",
            "query failed".to_string(),
        );
        let line = String::from_utf8(buf).unwrap();
        assert!(line.ends_with("WARN  reconcile::observer query failed\n"));
    }

    #[test]
    fn test_init_log_to_console() {
        init_log_to_console("test", LevelFilter::Debug);
        log::debug!("hello debug!");
        init_log("test", LevelFilter::Info, "no-such-target");
        log::info!("hello, info!");
        assert_eq!(log::max_level(), LevelFilter::Info);
    }
}
