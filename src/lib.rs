pub mod fixtures;
pub mod settings;

pub use fixtures::{
    collect_fixtures, extract_word_at_position, parse_fixtures_report, resolve_definitions,
    should_suggest_fixtures, CommandSetting, Fixture, FixtureCache, FixtureLocation,
    RunnerCommand, ScanError,
};
pub use settings::ServerSettings;
