/*!

`agent-utils` is a collection of functions shared by the talos-aws crates.
`aws` contains functions that set up an aws environment.

!*/

use constants::DEFAULT_AGENT_LEVEL_FILTER;
use env_logger::Builder;
pub use error::Error;
use log::LevelFilter;
use serde::Serialize;
use std::env;
use std::process::Output;

pub mod aws;
pub mod constants;
mod error;

/// Extract the value of `RUST_LOG` if it exists, otherwise log this application at
/// `DEFAULT_AGENT_LEVEL_FILTER`.
pub fn init_agent_logger(bin_crate: &str, log_level: Option<LevelFilter>) {
    match env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            let log_level = log_level.unwrap_or(DEFAULT_AGENT_LEVEL_FILTER);
            Builder::new()
                // Set log level to Error for crates other than our own.
                .filter_level(LevelFilter::Error)
                .filter(Some(bin_crate), log_level)
                .filter(Some("agent_utils"), log_level)
                .filter(Some("cluster_model"), log_level)
                .filter(Some("resource_agent"), log_level)
                .filter(Some("talos_agents"), log_level)
                .init();
        }
    }
}

/// Print a value using `serde_json` `to_string_pretty` for types that implement Serialize.
pub fn json_display<T: Serialize>(object: T) -> String {
    serde_json::to_string_pretty(&object).unwrap_or_else(|e| format!("Serialization failed: {}", e))
}

/// Implement `Display` using `serde_json` `to_string_pretty` for types that implement Serialize.
#[macro_export]
macro_rules! impl_display_as_json {
    ($i:ident) => {
        impl std::fmt::Display for $i {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = serde_json::to_string_pretty(self)
                    .unwrap_or_else(|e| format!("Serialization failed: {}", e));
                std::fmt::Display::fmt(&s, f)
            }
        }
    };
}

/// If the command was successful (exit code zero), returns the command's `stdout`. Otherwise
/// returns an error carrying the exit code and both output streams.
/// - `output`: the `Output` of a finished command
/// - `hint`: the command that was executed, e.g. `talosctl gen config`
pub fn command_output(output: &Output, hint: &str) -> Result<String, Error> {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        Ok(stdout.to_string())
    } else {
        Err(Error::CommandFailed {
            command: hint.to_string(),
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            stdout: stdout.to_string(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::{command_output, json_display, Error};
    use serde::Serialize;
    use std::process::Command;

    #[derive(Serialize)]
    struct Pair {
        key: &'static str,
    }

    impl_display_as_json!(Pair);

    #[test]
    fn json_display_is_pretty() {
        assert_eq!(json_display(Pair { key: "v" }), "{\n  \"key\": \"v\"\n}");
        assert_eq!(Pair { key: "v" }.to_string(), "{\n  \"key\": \"v\"\n}");
    }

    #[test]
    fn successful_command_returns_stdout() {
        let output = Command::new("sh")
            .args(["-c", "echo hello"])
            .output()
            .unwrap();
        assert_eq!(command_output(&output, "echo hello").unwrap(), "hello\n");
    }

    #[test]
    fn failed_command_keeps_exit_code_and_stderr() {
        let output = Command::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .output()
            .unwrap();
        match command_output(&output, "broken").unwrap_err() {
            Error::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, 3);
                assert_eq!(stderr, "broken\n");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
