//! Optional TOML tuning file.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use shop_advisor_system_planner::AdvisorTuning;

/// Loads tuning from `path`, or the defaults when no file is given.
///
/// Sections and keys missing from the file keep their default values.
pub(crate) fn load_tuning(path: Option<&Path>) -> Result<AdvisorTuning> {
    let Some(path) = path else {
        return Ok(AdvisorTuning::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read tuning file at {}", path.display()))?;
    parse_tuning(&contents)
        .with_context(|| format!("failed to parse tuning file at {}", path.display()))
}

fn parse_tuning(contents: &str) -> Result<AdvisorTuning> {
    toml::from_str(contents).context("tuning file is not valid TOML")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_file_means_defaults() {
        let tuning = load_tuning(None).expect("defaults");
        assert_eq!(tuning, AdvisorTuning::default());
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let tuning = parse_tuning(
            r#"
            [planner]
            pre_refresh = 5
            num_sample = 64

            [field]
            special_bonus = 2.0
            "#,
        )
        .expect("valid tuning");

        assert_eq!(tuning.planner.pre_refresh, 5);
        assert_eq!(tuning.planner.num_sample, 64);
        assert_eq!(tuning.planner.budget_threshold, 60);
        assert_eq!(tuning.field.special_bonus, 2.0);
        assert_eq!(tuning.coverage.max_radius, 20);
        assert_eq!(tuning.value.dense_targets, 6);
    }

    #[test]
    fn malformed_file_is_rejected() {
        assert!(parse_tuning("[planner\npre_refresh = ").is_err());
        assert!(parse_tuning("[planner]\npre_refresh = \"three\"").is_err());
    }
}
