use std::path::PathBuf;

use ard_shader_gen::prelude::*;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Settings which can be shared between runs of the oven.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OvenConfig {
    pub glsl: GlslCodeGen,
    pub hlsl: HlslCodeGen,
    /// Backends to generate when none is given on the command line.
    pub backends: Vec<BackendKind>,
    /// Directory to write log files to. Only the console is used when missing.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum BackendKind {
    Glsl,
    Hlsl,
}

/// Backend choice on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Glsl,
    Hlsl,
    All,
}

impl Default for OvenConfig {
    fn default() -> Self {
        Self {
            glsl: GlslCodeGen::default(),
            hlsl: HlslCodeGen::default(),
            backends: vec![BackendKind::Glsl, BackendKind::Hlsl],
            log_dir: None,
        }
    }
}

impl OvenConfig {
    /// Builds the backends to run. The command line choice overrides the configured list.
    pub fn backends(&self, arg: Option<BackendArg>) -> Vec<ShaderBackend> {
        let kinds = match arg {
            Some(BackendArg::Glsl) => vec![BackendKind::Glsl],
            Some(BackendArg::Hlsl) => vec![BackendKind::Hlsl],
            Some(BackendArg::All) => vec![BackendKind::Glsl, BackendKind::Hlsl],
            None => self.backends.clone(),
        };

        kinds
            .into_iter()
            .map(|kind| match kind {
                BackendKind::Glsl => ShaderBackend::Glsl(self.glsl.clone()),
                BackendKind::Hlsl => ShaderBackend::Hlsl(self.hlsl.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config() {
        let config: OvenConfig = ron::de::from_str(
            r#"(
                hlsl: (shader_model: (5, 0)),
                backends: [Hlsl],
            )"#,
        )
        .unwrap();

        assert_eq!(config.glsl.version, 330);
        assert_eq!(config.hlsl.shader_model, (5, 0));
        assert!(config.log_dir.is_none());

        let backends = config.backends(None);
        assert_eq!(backends.len(), 1);
        assert_eq!(backends[0].name(), "HLSL");
    }

    #[test]
    fn command_line_overrides_config() {
        let config = OvenConfig {
            backends: vec![BackendKind::Hlsl],
            ..Default::default()
        };

        let names: Vec<_> = config
            .backends(Some(BackendArg::All))
            .iter()
            .map(ShaderBackend::name)
            .collect();
        assert_eq!(names, vec!["GLSL", "HLSL"]);

        let names: Vec<_> = config
            .backends(Some(BackendArg::Glsl))
            .iter()
            .map(ShaderBackend::name)
            .collect();
        assert_eq!(names, vec!["GLSL"]);
    }
}
