//! Shared command configuration.

use clap::{Args, ValueEnum};
use url::Url;

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and above messages
    Debug,
    /// All messages including trace
    Trace,
}

/// Settings shared by every command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Maximum number of packages analyzed concurrently
    #[arg(long, value_name = "N", default_value_t = 8, env = "PKGRANK_CONCURRENCY")]
    pub concurrency: usize,

    /// Document store base URL [default: an in-memory store]
    #[arg(long, value_name = "URL", env = "PKGRANK_DOC_STORE_URL")]
    pub doc_store_url: Option<Url>,

    /// Search-index store base URL [default: an in-memory store]
    #[arg(long, value_name = "URL", env = "PKGRANK_INDEX_STORE_URL")]
    pub index_store_url: Option<Url>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,
}

impl ConfigArgs {
    /// Initialize the logger from the configured level.
    pub fn init_logging(&self) {
        let level = match self.log_level {
            LogLevel::None => return,
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        let env = env_logger::Env::default().filter_or("RUST_LOG", level);
        env_logger::Builder::from_env(env)
            .format_timestamp(None)
            .format_module_path(false)
            .format_target(matches!(self.log_level, LogLevel::Debug | LogLevel::Trace))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    #[test]
    fn every_flag_drives_a_consumed_setting() {
        let cli = TestCli::parse_from([
            "test",
            "--concurrency",
            "2",
            "--doc-store-url",
            "http://127.0.0.1:5984/pkgrank",
            "--index-store-url",
            "http://127.0.0.1:9200",
            "--log-level",
            "debug",
        ]);

        assert_eq!(cli.config.concurrency, 2);
        assert_eq!(cli.config.doc_store_url.unwrap().as_str(), "http://127.0.0.1:5984/pkgrank");
        assert_eq!(cli.config.index_store_url.unwrap().as_str(), "http://127.0.0.1:9200/");
        assert_eq!(cli.config.log_level, LogLevel::Debug);
    }

    #[test]
    fn defaults_select_the_in_memory_stores() {
        let cli = TestCli::parse_from(["test"]);

        assert_eq!(cli.config.concurrency, 8);
        assert!(cli.config.doc_store_url.is_none());
        assert!(cli.config.index_store_url.is_none());
        assert_eq!(cli.config.log_level, LogLevel::None);

        // Acquisition is configured by the caller, not the command line.
        assert!(TestCli::try_parse_from(["test", "--scratch-root", "/tmp"]).is_err());
    }
}
