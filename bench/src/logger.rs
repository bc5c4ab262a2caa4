use std::time::SystemTime;

use anyhow::Context;
use fern::{
    colors::{Color, ColoredLevelConfig},
    Dispatch,
};
use log::LevelFilter;

/// Installs the global logger on stderr, keeping stdout for the report.
pub fn initialize(level: LevelFilter, colored: bool) -> anyhow::Result<()> {
    let dispatch = if colored {
        let colors = ColoredLevelConfig::new()
            .trace(Color::Magenta)
            .debug(Color::Blue)
            .info(Color::Green)
            .warn(Color::Yellow)
            .error(Color::Red);

        Dispatch::new().format(move |out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{target}]",
                date = humantime::format_rfc3339_millis(SystemTime::now()),
                level = colors.color(record.level()),
                target = record.target(),
            ))
        })
    } else {
        Dispatch::new().format(|out, message, record| {
            out.finish(format_args!(
                "[{date} - {level}] {message} [{target}]",
                date = humantime::format_rfc3339_millis(SystemTime::now()),
                level = record.level(),
                target = record.target(),
            ))
        })
    };

    dispatch
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .context("Failed to initialize logger")?;

    Ok(())
}
