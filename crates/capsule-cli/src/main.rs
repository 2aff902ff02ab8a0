mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::build::ConfigOverrides;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_RESOLUTION_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "capsule-pack",
    version,
    about = "Package a compiled project into self-executing capsules"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Build the empty, thin and fat capsules for a project.
    Build {
        /// Project descriptor (JSON) exported by the host build tool.
        #[arg(long, default_value = "project.json")]
        project: PathBuf,
        /// Build configuration; defaults to capsule.toml next to the descriptor.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Local repository holding the capsule runtime artifact.
        #[arg(long, default_value = "~/.m2/repository")]
        repository: String,
        #[command(flatten)]
        overrides: ConfigOverrides,
    },
    /// Show the manifest and entries of a capsule (.jar, .x or .tx).
    Inspect {
        /// Capsule archive to read.
        archive: PathBuf,
        /// Also list every archive entry.
        #[arg(long, default_value_t = false)]
        entries: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CAPSULE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Build {
            project,
            config,
            repository,
            overrides,
        } => commands::build::run(
            &project,
            config.as_deref(),
            &expand_tilde(&repository),
            &overrides,
            json_output,
        ),
        Commands::Inspect { archive, entries } => {
            commands::inspect::run(&archive, entries, json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("config error:") {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("resolution error:") {
                EXIT_RESOLUTION_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
