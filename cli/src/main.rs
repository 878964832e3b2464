use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ogcproc_client::config::DEFAULT_BASE_URL;
use ogcproc_client::{
    fetch_json, materialize, ClientConfig, Endpoint, Endpoints, ExecutionOutcome, JobClient,
    JobStatus, ReqwestTransport,
};
use ogcproc_core::config::DEFAULT_EXECUTABLE;
use ogcproc_core::{
    command_template, compile_process, decode, parse_tokens, CompileOptions, CompiledTool,
};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};
use url::Url;

#[derive(Parser)]
#[command(name = "ogcproc")]
#[command(about = "Compile OGC API Processes descriptions into form parameters and run remote jobs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a process description into a tool descriptor
    Compile {
        /// Process description JSON file
        #[arg(required_unless_present_any = ["url", "process"])]
        input: Option<PathBuf>,

        /// Fetch the process description from this URL instead of a file
        #[arg(long, conflicts_with_all = ["input", "process"])]
        url: Option<String>,

        /// Fetch the description of this process from the server at --base-url
        #[arg(long, conflicts_with = "input")]
        process: Option<String>,

        /// Root of the processes API
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Bearer token for fetching the description
        #[arg(long)]
        token: Option<String>,

        /// Output tool descriptor file (defaults to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Max nesting depth for object schemas and enum extraction
        #[arg(long, default_value_t = 32)]
        max_depth: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Print the command-line template of a compiled tool
    Command {
        /// Tool descriptor file from `compile`
        tool: PathBuf,

        /// Executable placed at the head of the template
        #[arg(long, default_value = DEFAULT_EXECUTABLE)]
        executable: String,
    },

    /// Decode submitted arguments, run the job and write its outputs
    Execute {
        /// Tool descriptor file from `compile`
        #[arg(long)]
        tool: PathBuf,

        /// Root of the processes API
        #[arg(long, default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Seconds between job status polls
        #[arg(long, default_value_t = 20)]
        poll_interval: u64,

        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 120)]
        request_timeout: u64,

        /// Bearer token sent with every request
        #[arg(long)]
        token: Option<String>,

        /// Print the decoded invocation instead of submitting it
        #[arg(long)]
        dry_run: bool,

        /// Output format for --dry-run
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,

        /// Alternating `key value` arguments
        #[arg(last = true)]
        args: Vec<String>,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormat {
    Pretty,
    Compact,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for JSON
    let log_level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Compile {
            input,
            url,
            process,
            base_url,
            token,
            output,
            max_depth,
            format,
        } => {
            let config = ClientConfig {
                base_url,
                token,
                ..ClientConfig::default()
            };
            let description: serde_json::Value = match (input, url, process) {
                (Some(path), _, _) => read_json(&path, "process description")?,
                (None, Some(url), _) => {
                    let url = Url::parse(&url).with_context(|| format!("Invalid URL: {url}"))?;
                    fetch_description(&config, &url)?
                }
                (None, None, Some(process_id)) => {
                    let url = Endpoints::new(&config.base_url)?.url(Endpoint::Process {
                        process_id: &process_id,
                    })?;
                    fetch_description(&config, &url)?
                }
                (None, None, None) => bail!("No process description given"),
            };

            let options = CompileOptions {
                max_depth,
                ..CompileOptions::default()
            };
            let tool = compile_process(&description, &options)
                .map_err(|e| anyhow::Error::from(e).context("Compilation failed"))?;

            for diagnostic in &tool.diagnostics {
                eprintln!("Warning: {} ({})", diagnostic.message, diagnostic.path);
            }

            write_json(&tool, output.as_ref(), format)?;
        }
        Commands::Command { tool, executable } => {
            let tool: CompiledTool = read_json(&tool, "tool descriptor")?;
            let options = CompileOptions {
                executable,
                ..CompileOptions::default()
            };
            println!("{}", command_template(&tool, &options));
        }
        Commands::Execute {
            tool,
            base_url,
            poll_interval,
            request_timeout,
            token,
            dry_run,
            format,
            args,
        } => {
            let tool: CompiledTool = read_json(&tool, "tool descriptor")?;
            let args = parse_tokens(args).context("Invalid argument list")?;
            let invocation = decode(&args, &tool).context("Failed to decode arguments")?;

            if dry_run {
                write_json(&invocation, None, format)?;
                return Ok(());
            }

            let config = ClientConfig {
                base_url,
                poll_interval,
                request_timeout,
                token,
            };
            let client = JobClient::from_config(&config)?;
            let (response, job) = match client.execute(&invocation)? {
                ExecutionOutcome::Completed { response, job } => (response, job),
                ExecutionOutcome::Rejected { status, message } => {
                    bail!("Execution request rejected (HTTP {status}): {message}")
                }
            };

            if response.is_success() {
                let written =
                    materialize(&response, invocation.payload.response, &invocation.targets)
                        .context("Failed to write outputs")?;
                for path in written {
                    info!(path = %path.display(), "wrote output");
                }
            } else {
                warn!(status = response.status, "final response is not a success, nothing written");
            }

            if let Some(job) = job.filter(|j| j.status == JobStatus::Failed) {
                bail!("Job {} failed", job.job_id);
            }
            if !response.is_success() {
                bail!("Results request returned HTTP {}", response.status);
            }
        }
    }

    Ok(())
}

fn fetch_description(config: &ClientConfig, url: &Url) -> Result<serde_json::Value> {
    let transport = ReqwestTransport::new(config)?;
    fetch_json(&transport, url)
        .with_context(|| format!("Failed to fetch process description from {url}"))
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open {what} file: {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader)
        .with_context(|| format!("Failed to parse {what} from: {}", path.display()))
}

fn write_json<T: serde::Serialize>(
    val: &T,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let mut writer: Box<dyn Write> = if let Some(p) = path {
        let file = File::create(p)
            .with_context(|| format!("Failed to create output file: {}", p.display()))?;
        Box::new(BufWriter::new(file))
    } else {
        Box::new(BufWriter::new(io::stdout()))
    };

    match format {
        OutputFormat::Pretty => {
            serde_json::to_writer_pretty(&mut writer, val).context("Failed to write JSON")?;
        }
        OutputFormat::Compact => {
            serde_json::to_writer(&mut writer, val).context("Failed to write JSON")?;
        }
    }

    writeln!(writer).context("Failed to write trailing newline")?;

    Ok(())
}
