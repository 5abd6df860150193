//! Quill - writing suggestions from a remote model and a local worker
//!
//! Reads a passage from a file or stdin, runs the suggestion engine and
//! prints JSON on stdout. Logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quill_adapters::config::Config;
use quill_adapters::keyring;
use quill_core::suggest::WritingFormat;
use quill_engine::providers::WorkerProvider;
use quill_engine::{Analysis, SuggestionEngine};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Longest passage accepted in one call
const MAX_CONTENT_CHARS: usize = 5000;

#[derive(Parser, Debug)]
#[command(
    name = "quill",
    about = "Writing suggestions for novels, screenplays and game scripts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Suggest improvements for a passage
    Suggest {
        /// Text file to read (stdin when omitted)
        file: Option<PathBuf>,

        /// novel, screenplay or game-script
        #[arg(short, long, default_value = "novel")]
        format: String,

        /// Include processing time and token estimate
        #[arg(long)]
        metrics: bool,
    },

    /// Run a focused editorial pass
    Analyze {
        preset: Preset,

        /// Text file to read (stdin when omitted)
        file: Option<PathBuf>,

        #[arg(long)]
        genre: Option<String>,

        #[arg(long)]
        character: Option<String>,

        #[arg(long)]
        audience: Option<String>,

        #[arg(long)]
        question: Option<String>,

        /// Earlier draft to compare against (revision-review)
        #[arg(long)]
        previous: Option<PathBuf>,

        /// Source format (convert-format)
        #[arg(long, default_value = "novel")]
        from: String,

        /// Presentation format, or target format for convert-format
        #[arg(long, default_value = "novel")]
        to: String,
    },

    /// List named entities found by the local worker
    Entities {
        file: Option<PathBuf>,
    },

    /// Check that both providers respond
    Health,

    /// Store the remote API key in the credential store
    Setup,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    RewriteDialogue,
    AdaptGenre,
    CharacterArc,
    PlotHoles,
    Summarize,
    ThemeConsistency,
    Foreshadowing,
    MotivationStakes,
    SceneBreakdown,
    GenreCliches,
    AudienceTone,
    RevisionReview,
    Ask,
    TitleLogline,
    ConvertFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("quill=info".parse()?),
        )
        .init();

    let config = Config::load();
    tracing::debug!(path = %Config::config_location(), "config loaded");

    match cli.command {
        Command::Suggest {
            file,
            format,
            metrics,
        } => {
            let content = read_content(file.as_deref())?;
            let engine = SuggestionEngine::from_config(&config)?;
            let format = WritingFormat::from_label(&format);
            if metrics {
                print_json(&engine.suggest_with_metrics(&content, format).await)?;
            } else {
                print_json(&engine.get_suggestions(&content, format).await)?;
            }
        }
        Command::Analyze {
            preset,
            file,
            genre,
            character,
            audience,
            question,
            previous,
            from,
            to,
        } => {
            let content = read_content(file.as_deref())?;
            let analysis = build_analysis(
                preset,
                PresetArgs {
                    genre,
                    character,
                    audience,
                    question,
                    previous: previous.as_deref().map(read_file).transpose()?,
                    from: WritingFormat::from_label(&from),
                    to: WritingFormat::from_label(&to),
                },
            )?;
            let engine = SuggestionEngine::from_config(&config)?;
            print_json(&engine.analyze(&content, &analysis).await)?;
        }
        Command::Entities { file } => {
            let content = read_content(file.as_deref())?;
            let worker = WorkerProvider::new(config.local.clone());
            print_json(&worker.extract_entities(&content).await)?;
        }
        Command::Health => {
            let engine = SuggestionEngine::from_config(&config)?;
            print_json(&engine.health().await)?;
        }
        Command::Setup => setup_api_key(&config)?,
    }

    Ok(())
}

/// Optional preset arguments gathered from the command line
struct PresetArgs {
    genre: Option<String>,
    character: Option<String>,
    audience: Option<String>,
    question: Option<String>,
    previous: Option<String>,
    from: WritingFormat,
    to: WritingFormat,
}

fn build_analysis(preset: Preset, args: PresetArgs) -> Result<Analysis> {
    fn required(value: Option<String>, flag: &str) -> Result<String> {
        match value.map(|v| v.trim().to_string()) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => bail!("--{} is required for this analysis", flag),
        }
    }

    Ok(match preset {
        Preset::RewriteDialogue => Analysis::RewriteDialogue { format: args.to },
        Preset::AdaptGenre => Analysis::AdaptGenre {
            genre: required(args.genre, "genre")?,
        },
        Preset::CharacterArc => Analysis::CharacterArc {
            character: required(args.character, "character")?,
        },
        Preset::PlotHoles => Analysis::PlotHoles,
        Preset::Summarize => Analysis::Summarize,
        Preset::ThemeConsistency => Analysis::ThemeConsistency,
        Preset::Foreshadowing => Analysis::Foreshadowing,
        Preset::MotivationStakes => Analysis::MotivationStakes,
        Preset::SceneBreakdown => Analysis::SceneBreakdown,
        Preset::GenreCliches => Analysis::GenreCliches {
            genre: required(args.genre, "genre")?,
        },
        Preset::AudienceTone => Analysis::AudienceTone {
            audience: required(args.audience, "audience")?,
        },
        Preset::RevisionReview => Analysis::RevisionReview {
            previous_draft: required(args.previous, "previous")?,
        },
        Preset::Ask => Analysis::Ask {
            question: required(args.question, "question")?,
        },
        Preset::TitleLogline => Analysis::TitleLogline,
        Preset::ConvertFormat => Analysis::ConvertFormat {
            from: args.from,
            to: args.to,
        },
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Read the passage and enforce the caller-side limits
fn read_content(file: Option<&Path>) -> Result<String> {
    let content = match file {
        Some(path) => read_file(path)?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    if let Err(err) = validate_content(&content) {
        tracing::warn!(error = %err, "content rejected");
        return Err(err);
    }
    Ok(content)
}

fn validate_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        bail!("Content is required");
    }
    let chars = content.chars().count();
    if chars > MAX_CONTENT_CHARS {
        bail!(
            "Content too long: {} characters (maximum {})",
            chars,
            MAX_CONTENT_CHARS
        );
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

fn setup_api_key(config: &Config) -> Result<()> {
    eprint!("  Remote API key: ");
    io::stderr().flush()?;
    let mut key = String::new();
    io::stdin().read_line(&mut key).context("Failed to read API key")?;
    let key = key.trim();
    if key.is_empty() {
        bail!("No API key entered");
    }

    config.set_api_key(key).map_err(|e| anyhow::anyhow!("{}", e))?;

    let store = keyring::credentials_store_label();
    match config.get_api_key() {
        Some(_) => {
            tracing::info!(store, "API key saved and ready to use");
            Ok(())
        }
        None => {
            tracing::warn!(
                store,
                "API key was saved but cannot be read back; \
                 set GOOGLE_AI_API_KEY in the environment instead"
            );
            Err(anyhow::anyhow!("API key verification failed"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_args() -> PresetArgs {
        PresetArgs {
            genre: None,
            character: None,
            audience: None,
            question: None,
            previous: None,
            from: WritingFormat::Novel,
            to: WritingFormat::Novel,
        }
    }

    #[test]
    fn test_validate_content_limits() {
        assert!(validate_content("").is_err());
        assert!(validate_content("  \n").is_err());
        assert!(validate_content("Once upon a time.").is_ok());
        assert!(validate_content(&"é".repeat(MAX_CONTENT_CHARS)).is_ok());
        assert!(validate_content(&"a".repeat(MAX_CONTENT_CHARS + 1)).is_err());
    }

    #[test]
    fn test_presets_require_their_arguments() {
        assert!(build_analysis(Preset::AdaptGenre, no_args()).is_err());
        assert!(build_analysis(Preset::Ask, no_args()).is_err());

        let analysis = build_analysis(
            Preset::CharacterArc,
            PresetArgs {
                character: Some("Mara".into()),
                ..no_args()
            },
        )
        .unwrap();
        assert_eq!(
            analysis,
            Analysis::CharacterArc {
                character: "Mara".into()
            }
        );
    }

    #[test]
    fn test_convert_format_uses_both_formats() {
        let analysis = build_analysis(
            Preset::ConvertFormat,
            PresetArgs {
                to: WritingFormat::Screenplay,
                ..no_args()
            },
        )
        .unwrap();
        assert_eq!(analysis.format(), WritingFormat::Screenplay);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["quill", "suggest", "draft.txt", "--format", "screenplay"])
            .unwrap();
        assert!(matches!(cli.command, Command::Suggest { metrics: false, .. }));

        let cli = Cli::try_parse_from(["quill", "analyze", "plot-holes"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Analyze {
                preset: Preset::PlotHoles,
                ..
            }
        ));
    }
}
