mod config;

use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use ard_log::{info, LevelFilter};
use ard_shader_gen::prelude::*;
use ard_shader_graph::prelude::*;
use clap::Parser;
use config::{BackendArg, OvenConfig};
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the program description to bake.
    #[arg(short, long)]
    path: PathBuf,
    /// Output folder for the generated shaders. Defaults to the folder of the program.
    #[arg(short, long)]
    out: Option<PathBuf>,
    /// Oven configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Backend to generate. Overrides the configuration file.
    #[arg(short, long, value_enum)]
    backend: Option<BackendArg>,
    /// Minimum level of logged messages.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_ron::<OvenConfig>(path).context("unable to load oven config")?,
        None => OvenConfig::default(),
    };

    let filter = LevelFilter::from_str(&args.log_level)
        .map_err(|_| anyhow::anyhow!("unknown log level `{}`", args.log_level))?;
    ard_log::init(filter, config.log_dir.as_deref())?;

    info!("Loading program...");
    let program = load_ron::<ShaderProgramDesc>(&args.path)
        .context("unable to load program description")?
        .into_program()
        .context("invalid program description")?;

    let name = args
        .path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .context("program path has no file name")?;

    let out_dir = match &args.out {
        Some(path) => path.clone(),
        None => args
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("unable to create output folder {}", out_dir.display()))?;

    let backends = config.backends(args.backend);
    let jobs: Vec<_> = [ShaderStage::Vertex, ShaderStage::Pixel]
        .into_iter()
        .flat_map(|stage| backends.iter().map(move |backend| (stage, backend)))
        .collect();

    info!("Generating {} shaders...", jobs.len());
    jobs.par_iter().try_for_each(|(stage, backend)| {
        bake(&program, *stage, backend, name, &out_dir)
    })?;

    info!("Done!");
    Ok(())
}

fn bake(
    program: &ShaderProgram,
    stage: ShaderStage,
    backend: &ShaderBackend,
    name: &str,
    out_dir: &Path,
) -> Result<()> {
    let stage_name = match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Pixel => "pixel",
    };

    let source = backend
        .generate(program.graph(), program.root(stage), stage)
        .with_context(|| format!("unable to generate {} {stage_name} shader", backend.name()))?;

    let source_path = out_dir.join(format!("{name}.{stage_name}.{}", backend.extension()));
    fs::write(&source_path, source.code())
        .with_context(|| format!("unable to write {}", source_path.display()))?;

    let bindings_path = out_dir.join(format!(
        "{name}.{stage_name}.{}.bindings.ron",
        backend.extension()
    ));
    let bindings =
        ron::ser::to_string_pretty(source.bindings(), ron::ser::PrettyConfig::default())?;
    fs::write(&bindings_path, bindings)
        .with_context(|| format!("unable to write {}", bindings_path.display()))?;

    match source.profile() {
        Some(profile) => info!(
            "Wrote {} (entry `{}`, profile `{profile}`)",
            source_path.display(),
            source.entry_point()
        ),
        None => info!(
            "Wrote {} (entry `{}`)",
            source_path.display(),
            source.entry_point()
        ),
    }

    Ok(())
}

fn load_ron<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read {}", path.display()))?;
    let value = ron::de::from_str(&text)
        .with_context(|| format!("unable to parse {}", path.display()))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_program_generates() {
        let program = ron::de::from_str::<ShaderProgramDesc>(include_str!(
            "../programs/textured.ron"
        ))
        .unwrap()
        .into_program()
        .unwrap();

        for backend in OvenConfig::default().backends(None) {
            for stage in [ShaderStage::Vertex, ShaderStage::Pixel] {
                let source = backend
                    .generate(program.graph(), program.root(stage), stage)
                    .unwrap();
                assert!(!source.code().is_empty());
            }
        }
    }
}
