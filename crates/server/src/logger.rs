//! Logger initialization for the server

use jiff::{Zoned, tz::TimeZone};
use log::kv::{Key, Value, VisitSource};
use logforth::{append::Stderr, filter::EnvFilter, layout::Layout};
use std::{fmt::Write, io::IsTerminal, str::FromStr, sync::Once};

static INIT: Once = Once::new();

/// Custom layout that formats timestamps in UTC
#[derive(Debug)]
struct UtcLayout {
    no_color: bool,
}

impl UtcLayout {
    fn new() -> Self {
        Self { no_color: false }
    }

    fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }
}

impl Layout for UtcLayout {
    fn format(
        &self,
        record: &log::Record<'_>,
        _diagnostics: &[Box<dyn logforth::diagnostic::Diagnostic>],
    ) -> anyhow::Result<Vec<u8>> {
        let mut output = String::new();

        let now = Zoned::now().with_time_zone(TimeZone::UTC);
        write!(output, "{} ", now.strftime("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level_str = if self.no_color {
            format!("{:>5}", record.level())
        } else {
            match record.level() {
                log::Level::Error => format!("\x1b[31m{:>5}\x1b[0m", record.level()),
                log::Level::Warn => format!("\x1b[33m{:>5}\x1b[0m", record.level()),
                log::Level::Info => format!("\x1b[32m{:>5}\x1b[0m", record.level()),
                log::Level::Debug => format!("\x1b[34m{:>5}\x1b[0m", record.level()),
                log::Level::Trace => format!("\x1b[35m{:>5}\x1b[0m", record.level()),
            }
        };

        write!(output, "{level_str}  {}", record.args())?;

        record
            .key_values()
            .visit(&mut KeyValues(&mut output))
            .map_err(|e| anyhow::anyhow!("failed to format log key-values: {e}"))?;

        Ok(output.into_bytes())
    }
}

/// Appends each key-value pair of a record as ` key=value`.
struct KeyValues<'a>(&'a mut String);

impl<'kvs> VisitSource<'kvs> for KeyValues<'_> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), log::kv::Error> {
        write!(self.0, " {key}={value}").map_err(|_| log::kv::Error::msg("formatter error"))
    }
}

/// Initialize the logger once per process.
///
/// The log_filter should be a string like "info" or "server=debug,impersonation=debug"
pub fn init(log_filter: &str) {
    let log_filter = log_filter.to_owned();
    INIT.call_once(move || apply_logger(log_filter));
}

fn apply_logger(log_filter: String) {
    logforth::builder()
        .dispatch(move |d| {
            let filter = EnvFilter::from_str(&log_filter)
                .unwrap_or_else(|_| EnvFilter::from_str("info").expect("default filter should be valid"));

            let layout = if std::io::stderr().is_terminal() {
                UtcLayout::new()
            } else {
                UtcLayout::new().no_color()
            };

            d.filter(filter).append(Stderr::default().with_layout(layout))
        })
        .apply();
}

#[cfg(test)]
mod tests {
    use logforth::layout::Layout;

    use super::UtcLayout;

    #[test]
    fn key_values_are_rendered() {
        let kvs = [("kind", "exit"), ("previous", "alice"), ("current", "bob")];

        let output = UtcLayout::new()
            .no_color()
            .format(
                &log::Record::builder()
                    .level(log::Level::Info)
                    .args(format_args!("Authentication switched from 'alice' to 'bob'"))
                    .key_values(&kvs)
                    .build(),
                &[],
            )
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        let (_, line) = output.split_once(' ').unwrap();

        insta::assert_snapshot!(
            line.trim_start(),
            @"INFO  Authentication switched from 'alice' to 'bob' kind=exit previous=alice current=bob"
        );
    }

    #[test]
    fn records_without_key_values_are_unchanged() {
        let output = UtcLayout::new()
            .no_color()
            .format(
                &log::Record::builder()
                    .level(log::Level::Warn)
                    .args(format_args!("plain message"))
                    .build(),
                &[],
            )
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.ends_with(" WARN  plain message"));
    }
}
