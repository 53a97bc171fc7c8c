use anyhow::ensure;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[clap(name = "wordquizzle-server")]
pub struct Opts {
    /// TCP port the reactor listens on for client control connections.
    pub tcp_port: u16,

    /// UDP port used for discovery broadcasts and match invitations.
    pub udp_port: u16,

    /// Length of a match, in minutes, from the moment both players join.
    pub match_minutes: u64,

    /// How long an invited player has to accept a match, in seconds.
    pub invitation_seconds: u64,

    /// Number of words drawn for a single match.
    pub num_words: usize,

    /// Size of the bounded worker pool.
    pub worker_threads: usize,

    /// Where to keep `Database.json` and other runtime state.
    #[clap(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Base URL of the translation service used by the fetcher.
    #[clap(
        long,
        default_value = "https://api.mymemory.translated.net/get"
    )]
    pub translator_url: String,

    /// Emit logs as JSON instead of the default human-readable format.
    #[clap(long)]
    pub json_logs: bool,

    /// Increase log verbosity; repeat for more (-v, -vv, -vvv).
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Opts {
    /// Parses `std::env::args()`, exiting with code 1 and a usage line on
    /// any unrecognised or malformed argument, per this server's CLI
    /// contract (unlike clap's own default of exit code 2).
    pub fn read() -> Opts {
        Opts::try_parse().unwrap_or_else(|e| {
            eprint!("{e}");
            std::process::exit(1);
        })
    }
}

/// Validated server configuration, derived from [`Opts`].
///
/// Parsing `Opts` never fails beyond clap's own usage errors; the domain
/// constraints from the external interface (ports above the well-known
/// range, a worker pool able to host at least one match) are enforced here
/// so a misconfigured server fails fast, before any socket is bound.
#[derive(Debug, Clone)]
pub struct Config {
    pub tcp_port: u16,
    pub udp_port: u16,
    pub match_minutes: u64,
    pub invitation_seconds: u64,
    pub num_words: usize,
    pub worker_threads: usize,
    pub data_dir: PathBuf,
    pub translator_url: String,
    pub json_logs: bool,
    pub verbose: u8,
}

impl TryFrom<Opts> for Config {
    type Error = anyhow::Error;

    fn try_from(opts: Opts) -> Result<Self> {
        ensure!(opts.tcp_port > 1024, "tcp_port must be > 1024");
        ensure!(opts.udp_port > 1024, "udp_port must be > 1024");
        ensure!(opts.tcp_port != opts.udp_port, "tcp_port and udp_port must differ");
        ensure!(opts.match_minutes > 0, "match_minutes must be positive");
        ensure!(opts.invitation_seconds > 0, "invitation_seconds must be positive");
        ensure!(opts.num_words > 0, "num_words must be positive");
        ensure!(opts.worker_threads >= 4, "worker_threads must be >= 4");

        Ok(Config {
            tcp_port: opts.tcp_port,
            udp_port: opts.udp_port,
            match_minutes: opts.match_minutes,
            invitation_seconds: opts.invitation_seconds,
            num_words: opts.num_words,
            worker_threads: opts.worker_threads,
            data_dir: opts.data_dir,
            translator_url: opts.translator_url,
            json_logs: opts.json_logs,
            verbose: opts.verbose,
        })
    }
}
