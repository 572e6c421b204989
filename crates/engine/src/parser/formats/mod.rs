/// Grammar implementations for the supported access-log layouts

pub mod access_log;

pub use access_log::AccessLogParser;
