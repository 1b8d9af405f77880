use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weirdgen::fluent::{FileLibrary, GenText};
use weirdgen::models::Config;
use weirdgen::Studio;

const DEFAULT_SCENE: &str = "a jealous hammer teaches velvet frogs about time";
const DEFAULT_INSTRUCTION: &str = "create an image description from this scene";

#[derive(Debug, Parser)]
#[command(name = "weirdgen")]
#[command(about = "Imagine a scene, render it, and save the image")]
struct CliArgs {
    /// Scene to imagine.
    #[arg(value_name = "SCENE", default_value = DEFAULT_SCENE)]
    scene: String,

    /// Instruction sent alongside the scene.
    #[arg(long, default_value = DEFAULT_INSTRUCTION)]
    instruction: String,

    /// Reference image to upload and describe instead of imagining from the scene.
    #[arg(long, value_name = "PATH")]
    reference: Option<PathBuf>,

    /// Filename prefix for the saved image.
    #[arg(long, default_value = "x")]
    prefix: String,
}

async fn run(args: CliArgs) -> weirdgen::Result<()> {
    let config = Config::from_env()?;
    let studio = Studio::from_config(&config);

    let text = match &args.reference {
        Some(path) => {
            let mut library = FileLibrary::load(&studio).await?;
            let file = library.upload(path).await?;
            file.describe(&args.scene).await?
        }
        None => GenText::imagine(&studio, &args.scene, &args.instruction).await?,
    };
    println!("{}", text);

    let path = text.generate().await?.save(&args.prefix)?;
    println!("{}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weirdgen=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = CliArgs::parse();
    info!("Starting weirdgen");

    match run(args).await {
        Ok(()) => {
            info!("Generation completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Generation failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_arguments() {
        let args = CliArgs::parse_from(["weirdgen"]);
        assert_eq!(args.scene, DEFAULT_SCENE);
        assert_eq!(args.instruction, DEFAULT_INSTRUCTION);
        assert_eq!(args.prefix, "x");
        assert!(args.reference.is_none());
    }

    #[test]
    fn test_reference_and_prefix_flags() {
        let args = CliArgs::parse_from([
            "weirdgen",
            "through a fisheye lens",
            "--reference",
            "cat.png",
            "--prefix",
            "cat_",
        ]);
        assert_eq!(args.scene, "through a fisheye lens");
        assert_eq!(args.reference, Some(PathBuf::from("cat.png")));
        assert_eq!(args.prefix, "cat_");
    }
}
