use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::time::Duration;

/// Which pattern(s) the demo walks through.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    All,
    Pool,
    Pipeline,
    Fan,
    Rate,
    Broadcast,
}

impl Pattern {
    pub fn includes(self, other: Self) -> bool {
        self == Self::All || self == other
    }
}

/// Runtime configuration for the `conflux-demo` binary.
///
/// Every value can come from a CLI flag, an environment variable, or a `.env`
/// file in the working directory (loaded before parsing).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "conflux-demo",
    version,
    about = "Walks through worker pools, pipelines, fan-out/fan-in, rate limiting and broadcast"
)]
pub struct CliArgs {
    /// Pattern to demonstrate.
    ///
    /// Environment variable: `PATTERN`
    #[arg(long, env = "PATTERN", value_enum, default_value_t = Pattern::All)]
    pub pattern: Pattern,

    /// Number of workers for the worker pool and fan-out demos.
    ///
    /// Defaults to the number of logical CPUs.
    ///
    /// Environment variable: `WORKERS`
    #[arg(long, env = "WORKERS")]
    pub workers: Option<usize>,

    /// Jobs submitted to the worker pool.
    ///
    /// Environment variable: `JOBS`
    #[arg(long, env = "JOBS", default_value_t = 6)]
    pub jobs: usize,

    /// Simulated work per job, in milliseconds.
    ///
    /// Environment variable: `JOB_DELAY_MS`
    #[arg(long, env = "JOB_DELAY_MS", default_value_t = 200)]
    pub job_delay_ms: u64,

    /// Rate limiter admissions per second.
    ///
    /// Environment variable: `RATE`
    #[arg(long, env = "RATE", default_value_t = 2)]
    pub rate: u32,

    /// Requests pushed through the rate limiter.
    ///
    /// Environment variable: `REQUESTS`
    #[arg(long, env = "REQUESTS", default_value_t = 5)]
    pub requests: usize,

    /// Broadcast subscribers.
    ///
    /// Environment variable: `SUBSCRIBERS`
    #[arg(long, env = "SUBSCRIBERS", default_value_t = 2)]
    pub subscribers: usize,

    /// Buffer capacity of each broadcast subscriber.
    ///
    /// Environment variable: `SUBSCRIBER_BUFFER`
    #[arg(long, env = "SUBSCRIBER_BUFFER", default_value_t = 10)]
    pub subscriber_buffer: usize,

    /// Messages broadcast to the subscribers.
    ///
    /// Environment variable: `MESSAGES`
    #[arg(long, env = "MESSAGES", default_value_t = 3)]
    pub messages: usize,

    /// Overall deadline for the demo, in seconds. Ctrl+C cancels earlier.
    ///
    /// Environment variable: `TIMEOUT_SECS`
    #[arg(long, env = "TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DemoConfig {
    pub pattern: Pattern,
    pub workers: usize,
    pub jobs: usize,
    pub job_delay: Duration,
    pub rate: u32,
    pub requests: usize,
    pub subscribers: usize,
    pub subscriber_buffer: usize,
    pub messages: usize,
    pub timeout: Duration,
}

impl TryFrom<CliArgs> for DemoConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let workers = args.workers.unwrap_or_else(num_cpus::get);

        if workers == 0 {
            bail!("WORKERS must be greater than 0");
        }
        if args.rate == 0 {
            bail!("RATE must be greater than 0");
        }
        if args.subscriber_buffer == 0 {
            bail!("SUBSCRIBER_BUFFER must be greater than 0");
        }
        if args.timeout_secs == 0 {
            bail!("TIMEOUT_SECS must be greater than 0");
        }

        Ok(Self {
            pattern: args.pattern,
            workers,
            jobs: args.jobs,
            job_delay: Duration::from_millis(args.job_delay_ms),
            rate: args.rate,
            requests: args.requests,
            subscribers: args.subscribers,
            subscriber_buffer: args.subscriber_buffer,
            messages: args.messages,
            timeout: Duration::from_secs(args.timeout_secs),
        })
    }
}
