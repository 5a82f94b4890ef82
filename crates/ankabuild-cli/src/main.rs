mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "ankabuild",
    version,
    about = "Build and publish Anka virtual machines"
)]
struct Cli {
    /// Path to the anka executable.
    #[arg(long, default_value = "anka", global = true)]
    anka_bin: PathBuf,

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
    /// Create, configure and boot a VM from a build template.
    Build {
        /// Path to the build template.
        #[arg(default_value = "ankabuild.toml")]
        template: PathBuf,
    },
    /// Check a build template without touching any VM.
    Validate {
        /// Path to the build template.
        #[arg(default_value = "ankabuild.toml")]
        template: PathBuf,
    },
    /// Work with an Anka registry.
    Registry {
        #[command(flatten)]
        registry: RegistryArgs,
        #[command(subcommand)]
        command: RegistryCommands,
    },
}

#[derive(Debug, Args)]
struct RegistryArgs {
    /// Name of a registry remote configured in anka.
    #[arg(long)]
    remote: Option<String>,
    /// Registry URL.
    #[arg(long)]
    registry_path: Option<String>,
    /// Client certificate (PEM) for mutual TLS.
    #[arg(long, requires = "key")]
    cert: Option<PathBuf>,
    /// Client private key (PEM) for mutual TLS.
    #[arg(long, requires = "cert")]
    key: Option<PathBuf>,
    /// CA certificate (PEM) used to verify the registry.
    #[arg(long)]
    cacert: Option<PathBuf>,
    /// Skip TLS verification of the registry.
    #[arg(long, default_value_t = false)]
    insecure: bool,
}

#[derive(Debug, Subcommand)]
enum RegistryCommands {
    /// List templates stored in the registry.
    List {
        /// Query the registry REST API instead of going through anka.
        #[arg(long, default_value_t = false)]
        rest: bool,
    },
    /// Push a VM to the registry.
    Push {
        /// VM name or UUID.
        vm: String,
        /// Version tag.
        #[arg(long)]
        tag: Option<String>,
        /// Version description.
        #[arg(long)]
        description: Option<String>,
        /// Template name on the registry, if different from the VM name.
        #[arg(long)]
        remote_vm: Option<String>,
        /// Push the local template, ignoring any registry template it came from.
        #[arg(long, default_value_t = false)]
        local: bool,
    },
    /// Revert the latest version of a registry template.
    Revert {
        /// Template id.
        id: String,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
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
            tracing_subscriber::EnvFilter::try_from_env("ANKABUILD_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Build { template } => {
            commands::build::run(&template, &cli.anka_bin, json_output)
        }
        Commands::Validate { template } => commands::validate::run(&template, json_output),
        Commands::Registry { registry, command } => {
            let registry = registry.into_config();
            match command {
                RegistryCommands::List { rest } => {
                    commands::registry::list(&registry, &cli.anka_bin, rest, json_output)
                }
                RegistryCommands::Push {
                    vm,
                    tag,
                    description,
                    remote_vm,
                    local,
                } => commands::registry::push(
                    &registry,
                    &cli.anka_bin,
                    &ankabuild_client::RegistryPushParams {
                        vm_id: vm,
                        tag,
                        description,
                        remote_vm,
                        local,
                    },
                    json_output,
                ),
                RegistryCommands::Revert { id } => {
                    commands::registry::revert(&registry, &id, json_output)
                }
            }
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.code)
        }
    }
}

impl RegistryArgs {
    fn into_config(self) -> ankabuild_schema::RegistryConfig {
        ankabuild_schema::RegistryConfig {
            name: self.remote,
            url: self
                .registry_path
                .map(|u| u.trim_end_matches('/').to_owned()),
            cert: self.cert,
            key: self.key,
            cacert: self.cacert,
            insecure: self.insecure,
        }
    }
}
