use anyhow::{Context, Result};
use crawl::{TraversalConfig, WebDriverConfig};
use extract::ExtractionConfig;
use sentiment::ScoringPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub webdriver: WebDriverConfig,
    pub traversal: TraversalConfig,
    pub extraction: ExtractionConfig,
    pub scoring: ScoringPolicy,
    pub run: RunConfig,
    /// JSON lexicon replacing the built-in word lists.
    pub lexicon_path: Option<PathBuf>,
    pub targets: Vec<Target>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyPreset {
    Strict,  // weights 2/2, threshold 3
    Lenient, // weights 1/1, threshold 2
}

impl PolicyPreset {
    pub fn policy(self) -> ScoringPolicy {
        match self {
            PolicyPreset::Strict => ScoringPolicy::strict(),
            PolicyPreset::Lenient => ScoringPolicy::lenient(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub output_dir: PathBuf,
    pub inter_entity_pause_ms: u64,
    pub max_entities: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            inter_entity_pause_ms: 5000,
            max_entities: None,
        }
    }
}

/// One entity to traverse. Without a name the page header is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
}

impl Target {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: url.into(),
        }
    }

    /// Parse `NAME=URL`, or a bare URL.
    pub fn parse(arg: &str) -> Result<Self> {
        let (name, url) = match arg.split_once('=') {
            Some((name, url)) if !name.contains("://") => {
                (Some(name.trim().to_string()).filter(|n| !n.is_empty()), url.trim())
            }
            _ => (None, arg.trim()),
        };

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("Target URL must be http(s): {}", arg);
        }

        Ok(Self {
            name,
            url: url.to_string(),
        })
    }
}

impl AppConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&json).context(format!("Invalid config {}", path.display()))
    }

    /// Restaurant review pages used when no targets are configured.
    pub fn default_targets() -> Vec<Target> {
        vec![
            Target::new("БГ (Бургер Гриль)", "https://yandex.ru/maps/org/bg/1710293547/reviews/"),
            Target::new("Напекла", "https://yandex.ru/maps/org/napekla/195075538071/reviews/"),
            Target::new("Анров", "https://yandex.ru/maps/org/anrov/29048376633/reviews/"),
            Target::new("Руки Вверх", "https://yandex.ru/maps/org/ruki_vverkh_/61051687701/reviews/"),
            Target::new("Vkuss Суши", "https://yandex.ru/maps/org/vkuss_sushi/116784392153/reviews/"),
            Target::new("Эребуни", "https://yandex.ru/maps/org/erebuni/242006151730/reviews/"),
            Target::new("Ялта", "https://yandex.ru/maps/org/yalta/1782833264/reviews/"),
            Target::new("Калитка Парк", "https://yandex.ru/maps/org/kalitka_park/5082803970/reviews/"),
        ]
    }

    /// Configured targets, or the default list when none are given.
    pub fn effective_targets(&self) -> Vec<Target> {
        if self.targets.is_empty() {
            Self::default_targets()
        } else {
            self.targets.clone()
        }
    }

    /// Checks that must pass before a browser session is acquired.
    pub fn validate(&self) -> Result<()> {
        self.scoring.validate().context("Invalid scoring policy")?;

        if self.run.max_entities == Some(0) {
            anyhow::bail!("max_entities must be at least 1");
        }
        if self.traversal.review_selector.trim().is_empty() {
            anyhow::bail!("traversal.review_selector must not be empty");
        }
        for target in &self.targets {
            if !(target.url.starts_with("http://") || target.url.starts_with("https://")) {
                anyhow::bail!("Target URL must be http(s): {}", target.url);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.run.output_dir, PathBuf::from("output"));
        assert_eq!(config.run.inter_entity_pause_ms, 5000);
        assert_eq!(config.scoring.threshold, 3);
        assert_eq!(config.effective_targets().len(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "run": {"max_entities": 2},
                "targets": [{"url": "https://example.test/a"}, {"name": "B", "url": "https://example.test/b"},
                            {"url": "https://example.test/c"}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.run.output_dir, PathBuf::from("output"));
        assert_eq!(config.traversal.max_scroll_attempts, 8);
        assert_eq!(config.run.max_entities, Some(2));
        let targets = config.effective_targets();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].name, None);
        assert_eq!(targets[1].name.as_deref(), Some("B"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.scoring.threshold = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.run.max_entities = Some(0);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.targets = vec![Target::new("x", "ftp://example.test")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_target() {
        let target = Target::parse("Напекла=https://example.test/napekla?x=1").unwrap();
        assert_eq!(target.name.as_deref(), Some("Напекла"));
        assert_eq!(target.url, "https://example.test/napekla?x=1");

        let bare = Target::parse("https://example.test/org?tab=reviews").unwrap();
        assert_eq!(bare.name, None);
        assert_eq!(bare.url, "https://example.test/org?tab=reviews");

        assert!(Target::parse("cafe=not-a-url").is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(PolicyPreset::Lenient.policy().threshold, 2);
        assert_eq!(PolicyPreset::Strict.policy().positive_weight, 2);
    }
}
