//! Search and player configuration.

use goban::Rule;
use serde::Deserialize;

/// Root-level selection parameters for one evaluation run. Child descents
/// always use [`SearchOptions::default`]; these only shape selection at the
/// root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Spread visits evenly over children instead of following a bandit rule.
    pub equally: bool,
    /// Select by UCB1 instead of PUCB.
    pub use_ucb1: bool,
    /// Maximum number of children considered; 0 means unbounded.
    pub width: i32,
    /// Temperature applied to policy priors when growing candidates.
    pub temperature: f32,
    /// Scale of the Gumbel perturbation on priors; 0 disables it.
    pub noise: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            equally: false,
            use_ucb1: false,
            width: 0,
            temperature: 1.0,
            noise: 0.0,
        }
    }
}

impl SearchOptions {
    pub fn with_equally(mut self, equally: bool) -> Self {
        self.equally = equally;
        self
    }

    pub fn with_ucb1(mut self, use_ucb1: bool) -> Self {
        self.use_ucb1 = use_ucb1;
        self
    }

    pub fn with_width(mut self, width: i32) -> Self {
        self.width = width;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_noise(mut self, noise: f32) -> Self {
        self.noise = noise;
        self
    }
}

/// Construction-time player parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Number of search worker threads.
    pub threads: usize,
    /// Board width.
    pub width: i32,
    /// Board height.
    pub height: i32,
    /// Komi points.
    pub komi: f32,
    /// Scoring rule passed through to the evaluator features.
    pub rule: Rule,
    /// Whether the superko rule is in force.
    pub superko: bool,
    /// Credit values only at descent leaves, retracting the credit a node
    /// received back when it was first evaluated as a leaf.
    pub eval_leaf_only: bool,
    /// Seed for the per-descent random streams.
    pub seed: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            width: 19,
            height: 19,
            komi: 7.5,
            rule: Rule::Chinese,
            superko: false,
            eval_leaf_only: false,
            seed: 0,
        }
    }
}

impl PlayerConfig {
    /// Small board, one thread, fixed seed: cheap and reproducible.
    pub fn for_testing() -> Self {
        Self {
            threads: 1,
            width: 9,
            height: 9,
            seed: 42,
            ..Self::default()
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_board(mut self, width: i32, height: i32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_komi(mut self, komi: f32) -> Self {
        self.komi = komi;
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_leaf_only(mut self, eval_leaf_only: bool) -> Self {
        self.eval_leaf_only = eval_leaf_only;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_search_options() {
        let options = SearchOptions::default();
        assert!(!options.equally);
        assert!(!options.use_ucb1);
        assert_eq!(options.width, 0);
        assert!((options.temperature - 1.0).abs() < 1e-6);
        assert!(options.noise.abs() < 1e-6);
    }

    #[test]
    fn builder_chains() {
        let options = SearchOptions::default()
            .with_ucb1(true)
            .with_width(8)
            .with_noise(0.5);
        assert!(options.use_ucb1);
        assert_eq!(options.width, 8);
        assert!((options.noise - 0.5).abs() < 1e-6);

        let config = PlayerConfig::default().with_threads(4).with_komi(6.5);
        assert_eq!(config.threads, 4);
        assert!((config.komi - 6.5).abs() < 1e-6);
    }

    #[test]
    fn player_config_parses_from_toml() {
        let config: PlayerConfig = toml::from_str(
            r#"
            threads = 2
            width = 13
            height = 13
            komi = 6.5
            rule = "Japanese"
            superko = true
            "#,
        )
        .unwrap();
        assert_eq!(config.threads, 2);
        assert_eq!(config.width, 13);
        assert_eq!(config.rule, Rule::Japanese);
        assert!(config.superko);
        // Omitted keys keep their defaults.
        assert_eq!(config.seed, 0);
        assert!(!config.eval_leaf_only);
    }

    #[test]
    fn search_options_parse_from_toml() {
        let options: SearchOptions = toml::from_str("temperature = 0.5\nnoise = 1.0").unwrap();
        assert!((options.temperature - 0.5).abs() < 1e-6);
        assert!((options.noise - 1.0).abs() < 1e-6);
        assert!(!options.equally);
    }
}
