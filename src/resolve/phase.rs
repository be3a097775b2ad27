//! Picks the config a command line refers to.
//!
//! A selector is either `-c <config>` or `-m <master> -b <builder>` with an
//! optional `--phase`. Builders map to a config name, an args file, or a
//! table of phases.

use crate::config::{ConfigDocument, ConfigRef};
use crate::paths::SOURCE_ROOT_PREFIX;

/// Config selection flags from the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSelector {
    pub config: Option<String>,
    pub master: Option<String>,
    pub builder: Option<String>,
    pub phase: Option<String>,
}

impl ConfigSelector {
    pub fn config(name: impl Into<String>) -> Self {
        Self {
            config: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn builder(master: impl Into<String>, builder: impl Into<String>) -> Self {
        Self {
            master: Some(master.into()),
            builder: Some(builder.into()),
            ..Self::default()
        }
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = Some(phase.into());
        self
    }

    /// True when any selection flag was given.
    pub fn is_set(&self) -> bool {
        self.config.is_some() || self.master.is_some() || self.builder.is_some()
    }
}

/// Outcome of selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigTarget {
    Config(String),
    ArgsFile(String),
}

impl ConfigTarget {
    fn from_name(name: &str) -> Self {
        if name.starts_with(SOURCE_ROOT_PREFIX) {
            ConfigTarget::ArgsFile(name.to_string())
        } else {
            ConfigTarget::Config(name.to_string())
        }
    }
}

/// Selection errors
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error("Can not specify both -c/--config and -m/--master or -b/--builder")]
    ConflictingSelectors,

    #[error("Must specify either -c/--config or (-m/--master and -b/--builder)")]
    MissingSelector,

    #[error("Must not specify a build --phase with -c/--config")]
    PhaseWithConfig,

    #[error("Master name \"{0}\" not found")]
    UnknownMaster(String),

    #[error("Builder name \"{builder}\" not found under masters[{master}]")]
    UnknownBuilder { builder: String, master: String },

    #[error("Must specify a build --phase for {builder} on {master}")]
    PhaseRequired { builder: String, master: String },

    #[error("Must not specify a build --phase for {builder} on {master}")]
    PhaseNotAllowed { builder: String, master: String },

    #[error("Phase {phase} doesn't exist for {builder} on {master}")]
    UnknownPhase {
        phase: String,
        builder: String,
        master: String,
    },
}

/// Resolve a selector to a config name or args file.
pub fn select_config(doc: &ConfigDocument, selector: &ConfigSelector) -> Result<ConfigTarget, PhaseError> {
    let by_builder = selector.master.is_some() || selector.builder.is_some();

    if let Some(config) = &selector.config {
        if by_builder {
            return Err(PhaseError::ConflictingSelectors);
        }
        if selector.phase.is_some() {
            return Err(PhaseError::PhaseWithConfig);
        }
        return Ok(ConfigTarget::Config(config.clone()));
    }

    let (Some(master), Some(builder)) = (&selector.master, &selector.builder) else {
        return Err(PhaseError::MissingSelector);
    };

    let builders = doc
        .masters
        .get(master)
        .ok_or_else(|| PhaseError::UnknownMaster(master.clone()))?;
    let config_ref = builders.get(builder).ok_or_else(|| PhaseError::UnknownBuilder {
        builder: builder.clone(),
        master: master.clone(),
    })?;

    match (config_ref, &selector.phase) {
        (ConfigRef::Phases(_), None) => Err(PhaseError::PhaseRequired {
            builder: builder.clone(),
            master: master.clone(),
        }),
        (ConfigRef::Phases(phases), Some(phase)) => phases
            .get(phase)
            .map(|name| ConfigTarget::from_name(name))
            .ok_or_else(|| PhaseError::UnknownPhase {
                phase: phase.clone(),
                builder: builder.clone(),
                master: master.clone(),
            }),
        (_, Some(_)) => Err(PhaseError::PhaseNotAllowed {
            builder: builder.clone(),
            master: master.clone(),
        }),
        (ConfigRef::Config(name), None) => Ok(ConfigTarget::Config(name.clone())),
        (ConfigRef::ArgsFile(path), None) => Ok(ConfigTarget::ArgsFile(path.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::DocumentFormat;

    fn doc() -> ConfigDocument {
        ConfigDocument::parse(
            r#"{
                "masters": {
                    "fake_master": {
                        "fake_builder": "rel_bot",
                        "fake_args_bot": "//build/args/bots/fake_master/fake_args_bot.gn",
                        "fake_multi_phase": {"phase_1": "phase_1", "phase_2": "phase_2"}
                    }
                },
                "configs": {"rel_bot": [], "phase_1": [], "phase_2": []},
                "mixins": {}
            }"#,
            DocumentFormat::Json,
        )
        .unwrap()
    }

    #[test]
    fn test_plain_builder() {
        let target = select_config(&doc(), &ConfigSelector::builder("fake_master", "fake_builder")).unwrap();
        assert_eq!(target, ConfigTarget::Config("rel_bot".to_string()));
    }

    #[test]
    fn test_args_file_builder() {
        let target = select_config(&doc(), &ConfigSelector::builder("fake_master", "fake_args_bot")).unwrap();
        assert_eq!(
            target,
            ConfigTarget::ArgsFile("//build/args/bots/fake_master/fake_args_bot.gn".to_string())
        );
    }

    #[test]
    fn test_multi_phase_requires_phase() {
        let err = select_config(&doc(), &ConfigSelector::builder("fake_master", "fake_multi_phase")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Must specify a build --phase for fake_multi_phase on fake_master"
        );
    }

    #[test]
    fn test_single_phase_rejects_phase() {
        let selector = ConfigSelector::builder("fake_master", "fake_builder").with_phase("phase_1");
        let err = select_config(&doc(), &selector).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Must not specify a build --phase for fake_builder on fake_master"
        );
    }

    #[test]
    fn test_unknown_phase() {
        let selector = ConfigSelector::builder("fake_master", "fake_multi_phase").with_phase("wrong_phase");
        let err = select_config(&doc(), &selector).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Phase wrong_phase doesn't exist for fake_multi_phase on fake_master"
        );
    }

    #[test]
    fn test_known_phase() {
        let selector = ConfigSelector::builder("fake_master", "fake_multi_phase").with_phase("phase_2");
        assert_eq!(
            select_config(&doc(), &selector).unwrap(),
            ConfigTarget::Config("phase_2".to_string())
        );
    }

    #[test]
    fn test_selector_shape_errors() {
        let both = ConfigSelector {
            config: Some("rel_bot".to_string()),
            master: Some("fake_master".to_string()),
            ..ConfigSelector::default()
        };
        assert!(matches!(select_config(&doc(), &both), Err(PhaseError::ConflictingSelectors)));
        assert!(matches!(
            select_config(&doc(), &ConfigSelector::default()),
            Err(PhaseError::MissingSelector)
        ));
        assert!(matches!(
            select_config(&doc(), &ConfigSelector::builder("nope", "fake_builder")),
            Err(PhaseError::UnknownMaster(_))
        ));
        assert!(matches!(
            select_config(&doc(), &ConfigSelector::builder("fake_master", "nope")),
            Err(PhaseError::UnknownBuilder { .. })
        ));
    }
}
