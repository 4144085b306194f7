use tracing::Level;

const LANWATCH_CONFIG: &str = "LANWATCH_CONFIG";

/// Config file path from the environment, if any
pub fn get_config_path() -> Option<String> {
    std::env::var(LANWATCH_CONFIG).ok().filter(|path| !path.is_empty())
}

const LANWATCH_LOG: &str = "LANWATCH_LOG";

const DEFAULT_LOG_LEVEL: Level = Level::INFO;

pub fn get_log_level() -> Level {
    let level_from_env = std::env::var(LANWATCH_LOG);
    level_from_env.map_or(DEFAULT_LOG_LEVEL, |res| parse_log_level(&res))
}

fn parse_log_level(value: &str) -> Level {
    value.trim().parse().unwrap_or(DEFAULT_LOG_LEVEL)
}
