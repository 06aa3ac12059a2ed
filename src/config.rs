//! Application-level configuration loading: question timing, answer alphabet and room codes.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_ROOM_BACK_CONFIG_PATH";

const DEFAULT_QUESTION_DURATION_SECS: u32 = 15;
const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
const DEFAULT_ANSWER_LETTERS: &str = "ABCD";
const DEFAULT_HOST_SENTINEL: &str = "HOST";
const DEFAULT_TOTAL_QUESTIONS: u32 = 10;
const DEFAULT_ROOM_CODE_PREFIX: &str = "QZ-";

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    question_duration_secs: u32,
    tick_interval: Duration,
    answer_letters: Vec<char>,
    host_sentinel: String,
    default_total_questions: u32,
    room_code_prefix: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        question_duration_secs = app_config.question_duration_secs,
                        letters = ?app_config.answer_letters,
                        "loaded quiz configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Seconds each question stays open.
    pub fn question_duration_secs(&self) -> u32 {
        self.question_duration_secs
    }

    /// Answer time budget used by the scoring engine.
    pub fn answer_budget_ms(&self) -> u64 {
        u64::from(self.question_duration_secs) * 1000
    }

    /// Delay between two countdown ticks.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Allowed answer letters, in display order.
    pub fn answer_letters(&self) -> &[char] {
        &self.answer_letters
    }

    /// Parse a client-supplied answer into one of the allowed letters.
    pub fn parse_answer_letter(&self, raw: &str) -> Option<char> {
        let mut chars = raw.trim().chars();
        let letter = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        self.answer_letters.contains(&letter).then_some(letter)
    }

    /// Player name reserved for host connections.
    pub fn host_sentinel(&self) -> &str {
        &self.host_sentinel
    }

    /// Question count used when a create request does not specify one.
    pub fn default_total_questions(&self) -> u32 {
        self.default_total_questions
    }

    /// Prefix prepended to every generated room code.
    pub fn room_code_prefix(&self) -> &str {
        &self.room_code_prefix
    }

    /// Same configuration with a different countdown cadence.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Same configuration with a different question duration.
    pub fn with_question_duration_secs(mut self, secs: u32) -> Self {
        self.question_duration_secs = secs;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            question_duration_secs: DEFAULT_QUESTION_DURATION_SECS,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            answer_letters: DEFAULT_ANSWER_LETTERS.chars().collect(),
            host_sentinel: DEFAULT_HOST_SENTINEL.into(),
            default_total_questions: DEFAULT_TOTAL_QUESTIONS,
            room_code_prefix: DEFAULT_ROOM_CODE_PREFIX.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    question_duration_secs: Option<u32>,
    tick_interval_ms: Option<u64>,
    answer_letters: Option<String>,
    host_sentinel: Option<String>,
    default_total_questions: Option<u32>,
    room_code_prefix: Option<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();

        let answer_letters: Vec<char> = value
            .answer_letters
            .map(|letters| {
                letters
                    .chars()
                    .filter(|c| !c.is_whitespace())
                    .collect::<Vec<_>>()
            })
            .filter(|letters| !letters.is_empty())
            .unwrap_or(defaults.answer_letters);

        Self {
            question_duration_secs: value
                .question_duration_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.question_duration_secs),
            tick_interval: value
                .tick_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            answer_letters,
            host_sentinel: value
                .host_sentinel
                .filter(|sentinel| !sentinel.trim().is_empty())
                .unwrap_or(defaults.host_sentinel),
            default_total_questions: value
                .default_total_questions
                .filter(|total| *total > 0)
                .unwrap_or(defaults.default_total_questions),
            room_code_prefix: value.room_code_prefix.unwrap_or(defaults.room_code_prefix),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_quiz() {
        let config = AppConfig::default();
        assert_eq!(config.question_duration_secs(), 15);
        assert_eq!(config.answer_budget_ms(), 15_000);
        assert_eq!(config.answer_letters(), &['A', 'B', 'C', 'D']);
        assert_eq!(config.host_sentinel(), "HOST");
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn answer_letters_are_single_allowed_characters() {
        let config = AppConfig::default();
        assert_eq!(config.parse_answer_letter("A"), Some('A'));
        assert_eq!(config.parse_answer_letter(" d "), None);
        assert_eq!(config.parse_answer_letter(" D "), Some('D'));
        assert_eq!(config.parse_answer_letter("E"), None);
        assert_eq!(config.parse_answer_letter("AB"), None);
        assert_eq!(config.parse_answer_letter(""), None);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "questionDurationSecs": 20, "answerLetters": "A B C" }"#)
                .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.question_duration_secs(), 20);
        assert_eq!(config.answer_letters(), &['A', 'B', 'C']);
        assert_eq!(config.default_total_questions(), 10);
        assert_eq!(config.room_code_prefix(), "QZ-");
    }

    #[test]
    fn nonsensical_values_fall_back() {
        let raw: RawConfig = serde_json::from_str(
            r#"{ "questionDurationSecs": 0, "tickIntervalMs": 0, "hostSentinel": " " }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.question_duration_secs(), 15);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.host_sentinel(), "HOST");
    }
}
