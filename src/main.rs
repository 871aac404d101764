use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, ErrorKind, Parser, Subcommand};

use skipper::audio;
use skipper::recorded::RecordedLibrary;
use skipper::video;
use skipper::{util, AnalysisMode, Config, MediaItem, Outcome};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Introduction,
    Credits,
}

impl From<Mode> for AnalysisMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Introduction => AnalysisMode::Introduction,
            Mode::Credits => AnalysisMode::Credits,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[clap(after_help = "Displays the skipper version and the default configuration.")]
    Info,

    #[clap(
        arg_required_else_help = true,
        after_help = "Search for introductions or credits shared by a group of episodes. Each episode is described by a JSON recording holding its metadata, audio fingerprints, and silence intervals."
    )]
    Search {
        #[clap(
            required = true,
            multiple_values = true,
            value_parser = clap::value_parser!(PathBuf),
            help = "Recording files or directories of recordings to search."
        )]
        paths: Vec<PathBuf>,

        #[clap(short, long, value_enum, default_value_t = Mode::Introduction, help = "Which segment to search for. Credits mode expects each recording to carry a fingerprint of the end of the episode.")]
        mode: Mode,

        #[clap(
            short,
            long,
            value_parser = clap::value_parser!(PathBuf),
            help = "JSON configuration file. Any field that is not set keeps its default value (see 'skipper info')."
        )]
        config: Option<PathBuf>,

        #[clap(
            long,
            default_value = "false",
            action(ArgAction::SetTrue),
            help = "Fetch fingerprints and compare candidate alignments on multiple threads."
        )]
        threading: bool,

        #[clap(
            long,
            default_value = "false",
            action(ArgAction::SetTrue),
            help = "Print the search report as JSON."
        )]
        json: bool,

        #[clap(
            long,
            default_value = "false",
            action(ArgAction::SetTrue),
            help = "Do not display results of the search in stdout."
        )]
        no_display: bool,
    },

    #[clap(
        arg_required_else_help = true,
        after_help = "Find end credits by bisecting the tail of each episode for black frames. Each episode is described by a JSON recording holding its metadata and black frame timestamps."
    )]
    Credits {
        #[clap(
            required = true,
            multiple_values = true,
            value_parser = clap::value_parser!(PathBuf),
            help = "Recording files or directories of recordings to search."
        )]
        paths: Vec<PathBuf>,

        #[clap(
            short,
            long,
            value_parser = clap::value_parser!(PathBuf),
            help = "JSON configuration file. Any field that is not set keeps its default value (see 'skipper info')."
        )]
        config: Option<PathBuf>,

        #[clap(
            long,
            default_value = "false",
            action(ArgAction::SetTrue),
            help = "Print the search report as JSON."
        )]
        json: bool,

        #[clap(
            long,
            default_value = "false",
            action(ArgAction::SetTrue),
            help = "Do not display results of the search in stdout."
        )]
        no_display: bool,
    },
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

impl Cli {
    fn validate(&self) {
        let mut cmd = Cli::command();
        let config = match &self.command {
            Commands::Info => None,
            Commands::Search { config, .. } | Commands::Credits { config, .. } => config.as_ref(),
        };
        if let Some(config) = config {
            if !config.is_file() {
                cmd.error(
                    ErrorKind::InvalidValue,
                    format!("config file not found: {}", config.display()),
                )
                .exit();
            }
        }
    }

    fn load_config(path: Option<&PathBuf>) -> Config {
        let config = match path {
            Some(path) => Config::from_path(path),
            None => Ok(Config::default()),
        };
        match config.and_then(|config| config.validate().map(|_| config)) {
            Err(e) => {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
            }
            Ok(config) => config,
        }
    }

    fn load_recordings(paths: &[PathBuf]) -> RecordedLibrary {
        match RecordedLibrary::from_paths(paths) {
            Err(e) => {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
            }
            Ok(library) => library,
        }
    }
}

fn label(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Introduction => "Introduction",
        AnalysisMode::Credits => "Credits",
    }
}

fn display_outcome(
    outcome: &Outcome,
    items: &[MediaItem],
    mode: AnalysisMode,
    json: bool,
    display: bool,
) -> skipper::Result<()> {
    let report = match outcome {
        Outcome::Analyzed(report) => report,
        Outcome::TooFewItems(ids) => {
            let mut cmd = Cli::command();
            cmd.error(
                ErrorKind::InvalidValue,
                format!(
                    "need at least 2 comparable recordings, but only found {}",
                    ids.len()
                ),
            )
            .exit();
        }
        Outcome::Cancelled => {
            tracing::warn!("search was cancelled");
            return Ok(());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    if !display {
        return Ok(());
    }

    for item in items {
        if let Some(segment) = report.segments.get(&item.id) {
            println!("\n{}\n", item.id);
            println!("* {} - {}", label(mode), util::format_segment(segment));
        } else if report.without_segment.contains(&item.id) {
            println!("\n{}\n", item.id);
            println!("* {} - N/A", label(mode));
        }
    }

    Ok(())
}

fn main() -> skipper::Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let args = Cli::parse();
    args.validate();

    match args.command {
        Commands::Search {
            mode,
            ref config,
            threading,
            json,
            no_display,
            ref paths,
        } => {
            let config = Cli::load_config(config.as_ref());
            let library = Cli::load_recordings(paths);
            let items = library.items();
            let mode = AnalysisMode::from(mode);

            let analyzer = audio::Analyzer::new(config, &library, &library).with_threading(threading);
            let outcome = analyzer.run(&items, mode);
            display_outcome(&outcome, &items, mode, json, !no_display)?;
        }
        Commands::Credits {
            ref config,
            json,
            no_display,
            ref paths,
        } => {
            let config = Cli::load_config(config.as_ref());
            let library = Cli::load_recordings(paths);
            let items = library.items();

            let analyzer = video::BlackFrameAnalyzer::new(config, &library);
            let outcome = analyzer.run(&items, AnalysisMode::Credits)?;
            display_outcome(&outcome, &items, AnalysisMode::Credits, json, !no_display)?;
        }
        Commands::Info => {
            println!("skipper version: {}", env!("CARGO_PKG_VERSION"));
            println!("Default config:");
            println!("{}", serde_json::to_string_pretty(&Config::default())?);
        }
    }

    Ok(())
}
