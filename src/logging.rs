//! Logger setup.

use std::sync::Once;

use log::LevelFilter;

static INIT: Once = Once::new();

/// Formats one record as `[timestamp LEVEL target] message`.
fn format_line(timestamp: &str, level: log::Level, target: &str, message: &std::fmt::Arguments) -> String {
    format!("[{} {} {}] {}", timestamp, level, target, message)
}

/// Installs the global logger, writing to stderr at `level`.
///
/// Only the first call has any effect. `gltf` and `image` are capped at `warn` so debug output
/// stays readable.
pub fn init_logging(level: LevelFilter) {
    INIT.call_once(|| {
        let result = fern::Dispatch::new()
            .format(|out, message, record| {
                let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
                out.finish(format_args!(
                    "{}",
                    format_line(&timestamp, record.level(), record.target(), message)
                ))
            })
            .level(level)
            .level_for("gltf", level.min(LevelFilter::Warn))
            .level_for("image", level.min(LevelFilter::Warn))
            .chain(std::io::stderr())
            .apply();

        match result {
            Ok(()) => log::debug!("Logging initialised at {}", level),
            // Another logger was installed first; keep it.
            Err(e) => eprintln!("Could not install logger: {}", e),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_format() {
        let line = format_line(
            "2024-01-01 00:00:00.000",
            log::Level::Warn,
            "srender::model",
            &format_args!("missing {}", "texture"),
        );
        assert_eq!(line, "[2024-01-01 00:00:00.000 WARN srender::model] missing texture");
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(LevelFilter::Debug);
        init_logging(LevelFilter::Trace);
        assert!(log::max_level() <= LevelFilter::Debug);
    }
}
