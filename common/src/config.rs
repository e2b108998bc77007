use eyre::{bail, Result};

/// Thresholds shared by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Tokens with fewer characters are discarded.
    pub min_token_len: usize,
    /// Tokens found in more documents are dropped before aggregation.
    pub max_doc_freq: Option<usize>,
    /// Inverted entries with more documents are not expanded into pairs.
    pub max_pair_fanout: usize,
    /// Pairs scoring below this are not emitted.
    pub min_score: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_token_len: 1,
            max_doc_freq: None,
            max_pair_fanout: 1000,
            min_score: 0.0,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.min_token_len == 0 {
            bail!("minimum token length must be at least 1");
        }
        if self.max_doc_freq == Some(0) {
            bail!("maximum document frequency must be at least 1");
        }
        if self.max_pair_fanout < 2 {
            bail!(
                "pairwise expansion cap must be at least 2, got {}",
                self.max_pair_fanout
            );
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            bail!("minimum score must lie in [0, 1], got {}", self.min_score);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_thresholds() {
        let bad = [
            Config {
                min_token_len: 0,
                ..Config::default()
            },
            Config {
                max_doc_freq: Some(0),
                ..Config::default()
            },
            Config {
                max_pair_fanout: 1,
                ..Config::default()
            },
            Config {
                min_score: 1.5,
                ..Config::default()
            },
            Config {
                min_score: f64::NAN,
                ..Config::default()
            },
        ];
        for config in bad.iter() {
            assert!(config.validate().is_err(), "{:?}", config);
        }
    }
}
