use clap::{Args, Parser, Subcommand};

/// Splitswap route tool
///
/// Encodes and decodes routes in their wire format, checks them against the execution rules and
/// dry runs them against in-memory reference venues.
#[derive(Parser, PartialEq, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    global_args: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn args(&self) -> GlobalArgs {
        self.global_args.clone()
    }

    pub fn command(&self) -> Command {
        self.command.clone()
    }
}

#[derive(Subcommand, Clone, PartialEq, Debug)]
pub enum Command {
    /// Encodes a YAML route into its hex wire format.
    Encode(EncodeArgs),
    /// Decodes a hex encoded route and prints it as YAML.
    Decode(DecodeArgs),
    /// Checks a YAML route against the pre-execution rules.
    Validate(ValidateArgs),
    /// Executes a scenario against reference venues and prints the outcome as JSON.
    Simulate(SimulateArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct EncodeArgs {
    /// Path to the YAML route.
    pub route: String,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DecodeArgs {
    /// Hex encoded route, with or without 0x prefix.
    pub data: String,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ValidateArgs {
    /// Path to the YAML route.
    pub route: String,

    /// Unix timestamp to check the deadline against. Defaults to the current time.
    #[clap(long)]
    pub now: Option<u64>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SimulateArgs {
    /// Path to the YAML scenario.
    #[clap(env = "ROUTER_SCENARIO")]
    pub scenario: String,
}
