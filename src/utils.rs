use std::{path::Path, sync::Arc};

use log::LevelFilter;
use simple_logger::SimpleLogger;

pub trait FileNameShortcut {
    fn file_name_arc_str(&self) -> Arc<str>;
}

impl FileNameShortcut for Path {
    fn file_name_arc_str(&self) -> Arc<str> {
        self.file_name().unwrap().to_string_lossy().into()
    }
}

pub trait ExtractBaseName {
    fn base_name(&self) -> Arc<str>;
}

impl ExtractBaseName for Arc<str> {
    fn base_name(&self) -> Arc<str> {
        self.rfind('.')
            .and_then(|last_dot_index| {
                if last_dot_index == 0 {
                    None
                } else {
                    Some(self[..last_dot_index].into())
                }
            })
            .unwrap_or_else(|| self.clone())
    }
}

pub fn parse_log_level(log_level_name: &str) -> Option<LevelFilter> {
    match &log_level_name.to_lowercase()[..] {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

pub fn init_logging(log_level_name: &str) {
    let level = parse_log_level(log_level_name).unwrap_or_else(|| {
        eprintln!(
            "Log level {:?} isn't in [\"off\", \"error\", \"warn\", \"info\", \"debug\", \
            \"trace\"]! Using \"info\" instead",
            log_level_name
        );
        LevelFilter::Info
    });
    SimpleLogger::new().with_level(level).init().unwrap();
}
