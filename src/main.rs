use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgGroup, Parser, ValueHint};
use deriche_gramag::{
    enums::Orientation,
    export::{ExportConfig, ExportError, export_deriche_gramag},
};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Export Deriche gradient magnitude images from a NIfTI volume"
)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "config"])))]
struct Cli {
    /// Input NIfTI volume (.nii or .nii.gz)
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,

    /// JSON export configuration, used instead of the flags below
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Filter strength; repeat for one output per value
    #[arg(long = "alpha", default_value = "2.0", conflicts_with = "config")]
    alphas: Vec<f32>,

    /// Rescale the magnitude to the intensity range of the input
    #[arg(long, conflicts_with = "config")]
    normalize: bool,

    /// Write outputs here instead of next to the input
    #[arg(long, value_hint = ValueHint::DirPath, conflicts_with = "config")]
    output_dir: Option<PathBuf>,

    /// Also save the central slice (axial, coronal or sagittal) as PNG
    #[arg(long, conflicts_with = "config")]
    preview: Option<Orientation>,
}

impl Cli {
    fn into_config(self) -> Result<ExportConfig, ExportError> {
        if let Some(path) = &self.config {
            return ExportConfig::from_json_file(path);
        }
        let mut config = ExportConfig::new(self.input.unwrap_or_default());
        config.alphas = self.alphas;
        config.normalize = self.normalize;
        config.output_dir = self.output_dir;
        config.preview = self.preview;
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let result = Cli::parse()
        .into_config()
        .and_then(|config| export_deriche_gramag(&config));
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
