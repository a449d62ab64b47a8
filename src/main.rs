//! Event Stream Agent - Standalone Binary
//!
//! Provisions the devtime event stream stack in every requested AWS region,
//! after verifying CloudTrail is enabled in all of them.
//!
//! ## Usage
//!
//! ```bash
//! # Set up the event stream from a config file returned by the control plane
//! event-stream-agent setup --config event-stream.json --aws-profile devtime
//!
//! # Same, from flags, provisioning up to 4 regions at a time
//! event-stream-agent setup --region us-east-1,us-west-2 --stack-name cc-events \
//!     --template-url https://example.s3.amazonaws.com/events.json \
//!     --queue-arn arn:aws:sqs:us-east-1:123456789012:devtime --parallelism 4
//!
//! # Only verify CloudTrail
//! event-stream-agent check --config event-stream.json
//!
//! # Show what would happen, as JSON
//! event-stream-agent setup --config event-stream.json --dry-run --output json
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use event_stream_agent::event_stream::{
    setup_event_stream, EventStreamConfig, SetupOptions, SetupOutcome,
};
use event_stream_agent::EventStreamAgent;

/// Event Stream Agent - Provision the devtime event stream across AWS regions
#[derive(Parser, Debug)]
#[command(name = "event-stream-agent", version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format
    #[arg(long, value_enum, default_value = "text", global = true, env = "EVENT_STREAM_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or update the event stream stack in every region
    Setup {
        #[command(flatten)]
        target: TargetArgs,

        /// Maximum number of regions provisioned at once
        #[arg(long, default_value = "1", env = "EVENT_STREAM_PARALLELISM")]
        parallelism: usize,

        /// Probe stacks and report the planned action without changing anything
        #[arg(long, default_value = "false")]
        dry_run: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Only verify that CloudTrail is enabled in every region
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },
}

/// Deployment target: config file, per-field overrides and AWS profile
#[derive(Args, Debug, Default)]
struct TargetArgs {
    /// JSON event stream config (flags below override its fields)
    #[arg(long, env = "EVENT_STREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Target region (repeatable or comma separated)
    #[arg(long = "region", value_delimiter = ',', env = "EVENT_STREAM_REGIONS")]
    regions: Vec<String>,

    /// Stack name, identical in every region
    #[arg(long, env = "EVENT_STREAM_STACK_NAME")]
    stack_name: Option<String>,

    /// CloudFormation template URL
    #[arg(long, env = "EVENT_STREAM_TEMPLATE_URL")]
    template_url: Option<String>,

    /// Devtime queue ARN
    #[arg(long, env = "EVENT_STREAM_QUEUE_ARN")]
    queue_arn: Option<String>,

    /// Topic name
    #[arg(long, env = "EVENT_STREAM_TOPIC_NAME")]
    topic_name: Option<String>,

    /// Monitor rule name
    #[arg(long, env = "EVENT_STREAM_MONITOR_RULE")]
    monitor_rule: Option<String>,

    /// Version recorded on the stack
    #[arg(long, env = "EVENT_STREAM_VERSION")]
    stack_version: Option<String>,

    /// AWS profile name (empty uses the default credential chain)
    #[arg(long, default_value = "", env = "AWS_PROFILE")]
    aws_profile: String,

    /// AWS shared credentials file holding the profile
    #[arg(long, env = "AWS_SHARED_CREDENTIALS_FILE")]
    aws_profile_path: Option<PathBuf>,
}

impl TargetArgs {
    /// Load the config file, if any, and apply flag overrides on top
    fn load_config(&self) -> Result<EventStreamConfig> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => EventStreamConfig::default(),
        };

        if !self.regions.is_empty() {
            config.regions = self.regions.clone();
        }

        let overrides = [
            (&self.stack_name, &mut config.stack_name),
            (&self.template_url, &mut config.template_url),
            (&self.queue_arn, &mut config.devtime_queue_arn),
            (&self.topic_name, &mut config.topic_name),
            (&self.monitor_rule, &mut config.monitor_rule),
            (&self.stack_version, &mut config.version),
        ];
        for (value, field) in overrides {
            if let Some(value) = value {
                *field = value.clone();
            }
        }

        Ok(config)
    }
}

fn read_config(path: &Path) -> Result<EventStreamConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,event_stream_agent={}", level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn render(outcome: &SetupOutcome, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Text => println!("{}", outcome.display()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&outcome.summary()).context("Failed to serialize result")?
        ),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    match cli.command {
        Commands::Setup {
            target,
            parallelism,
            dry_run,
            output,
        } => {
            let config = target.load_config()?;
            let options = SetupOptions::default()
                .parallelism(parallelism)
                .dry_run(dry_run);

            info!(
                stack_name = %config.stack_name,
                regions = config.regions.len(),
                profile = %target.aws_profile,
                "Starting Event Stream Agent"
            );

            let outcome = setup_event_stream(
                &target.aws_profile,
                target.aws_profile_path.as_deref(),
                &config,
                options,
            )
            .await;

            render(&outcome, output)?;

            Ok(if outcome.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Commands::Check { target } => {
            let config = target.load_config()?;
            config.validate()?;

            let agent = EventStreamAgent::connect(
                &target.aws_profile,
                target.aws_profile_path.as_deref(),
                SetupOptions::default(),
            )
            .await
            .context("Failed to open AWS session")?;

            agent.check_preconditions(&config).await?;

            println!(
                "CloudTrail is enabled in every region: {}",
                config.regions.join(", ")
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}
