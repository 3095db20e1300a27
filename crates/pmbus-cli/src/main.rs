use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use glob::glob;
use tracing_subscriber::EnvFilter;

use pmbus_core::{
    BusConfig, CommandDescriptor, CommandKey, CommandTable, DeviceRegistry, DuplicatePolicy,
    LiteralError, MemoryTransport, TableError, format_binary, format_hex, make_listing,
    parse_byte, to_unsigned,
};

mod script;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("PMBUS_BUILD_COMMIT"),
    ", ",
    env!("PMBUS_BUILD_DATE"),
    ")"
);

const LITERAL_HINT: &str =
    "use 0b + 8 binary digits, 0x + 2 hex digits, or a base-10 value in -128..=255";

#[derive(Parser, Debug)]
#[command(name = "pmbus")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Inspect PMBus command tables and drive simulated devices.",
    long_about = None,
    after_help = "Examples:\n  pmbus byte 0x8B\n  pmbus commands tables/q48sc12050.csv\n  pmbus encode custom.csv VOUT_COMMAND 12.5\n  pmbus decode custom.csv 0x8B 0x10 0xE9\n  pmbus run bus.json script.txt"
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a byte literal in signed, unsigned, hex and binary form.
    Byte {
        /// 0b + 8 binary digits, 0x + 2 hex digits, or a base-10 value
        #[arg(allow_hyphen_values = true)]
        literal: String,
    },
    /// List the commands of a table, ordered by register address.
    #[command(alias = "list")]
    Commands {
        /// Command table path (a glob pattern must match exactly one file)
        table: PathBuf,

        /// Print the listing as JSON
        #[arg(long)]
        json: bool,

        /// Fail on duplicate names or addresses instead of keeping the later row
        #[arg(long)]
        strict: bool,
    },
    /// Encode a value for a linear command; prints the wire bytes [LSByte, MSByte].
    Encode {
        /// Command table path (a glob pattern must match exactly one file)
        table: PathBuf,
        /// Command name or register address
        command: String,
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Decode the wire bytes of a linear command into a value.
    Decode {
        /// Command table path (a glob pattern must match exactly one file)
        table: PathBuf,
        /// Command name or register address
        command: String,
        /// Least significant byte (first on the wire)
        #[arg(allow_hyphen_values = true)]
        lsb: String,
        /// Most significant byte
        #[arg(allow_hyphen_values = true)]
        msb: String,
    },
    /// Run an instruction script against the devices of a bus configuration.
    #[command(
        after_help = "Instructions (one per line, # starts a comment):\n  write <command> (-a <device> | -i <index>) [-v <value> | -b <bytes>... (MSByte first)] [-l <loops> | -t <ms>]\n  read <command> (-a <device> | -i <index>)\n  devices\n\nDevices are simulated in memory; the script is read from stdin when no file is given."
    )]
    Run {
        /// Bus configuration (JSON)
        config: PathBuf,
        /// Instruction script; stdin when omitted
        script: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Byte { literal } => cmd_byte(&literal),
        Commands::Commands {
            table,
            json,
            strict,
        } => cmd_commands(&table, json, strict),
        Commands::Encode {
            table,
            command,
            value,
        } => cmd_encode(&table, &command, value),
        Commands::Decode {
            table,
            command,
            lsb,
            msb,
        } => cmd_decode(&table, &command, &lsb, &msb),
        Commands::Run { config, script } => cmd_run(&config, script.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    pub(crate) fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{:#}", err), None)
    }
}

impl From<TableError> for CliError {
    fn from(err: TableError) -> Self {
        let hint = match &err {
            TableError::CommandNotFound { .. } => {
                Some("use `pmbus commands <table>` to list available commands".to_string())
            }
            TableError::Row { .. } => Some(
                "rows need 10 comma-separated fields: name,address,read,write,bytes,linear,exponent,mantissa_bits,exponent_bits,signed"
                    .to_string(),
            ),
            TableError::DuplicateKey { .. } => {
                Some("drop --strict to let later rows replace earlier ones".to_string())
            }
            TableError::Io { .. } => None,
        };
        CliError::new(err.to_string(), hint)
    }
}

impl From<LiteralError> for CliError {
    fn from(err: LiteralError) -> Self {
        CliError::new(err.to_string(), Some(LITERAL_HINT.to_string()))
    }
}

fn cmd_byte(literal: &str) -> Result<(), CliError> {
    let value = parse_byte(literal)?;
    println!("signed:   {}", value);
    println!("unsigned: {}", to_unsigned(value));
    println!("hex:      {}", format_hex(value));
    println!("binary:   {}", format_binary(value));
    Ok(())
}

fn cmd_commands(table: &Path, json: bool, strict: bool) -> Result<(), CliError> {
    let policy = if strict {
        DuplicatePolicy::Reject
    } else {
        DuplicatePolicy::LastWins
    };
    let table = load_table(table, policy)?;

    if json {
        let listing = make_listing(&table);
        let json = serde_json::to_string_pretty(&listing).context("JSON serialization failed")?;
        println!("{}", json);
        return Ok(());
    }

    println!(
        "{:<8} {:<24} {:<6} {:<5} FORMAT",
        "ADDRESS", "NAME", "ACCESS", "BYTES"
    );
    for descriptor in table.iter() {
        println!(
            "{:<8} {:<24} {:<6} {:<5} {}",
            descriptor.address_hex(),
            descriptor.name(),
            access(descriptor),
            descriptor.num_data_bytes(),
            format_label(descriptor)
        );
    }
    let shadowed = table.shadowed_keys();
    if !shadowed.is_empty() {
        eprintln!(
            "{} key(s) replaced by later rows: {}",
            shadowed.len(),
            shadowed
                .iter()
                .map(|shadowed| format!("{} (line {})", shadowed.key, shadowed.line))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    Ok(())
}

fn cmd_encode(table: &Path, command: &str, value: f64) -> Result<(), CliError> {
    let table = load_table(table, DuplicatePolicy::LastWins)?;
    let descriptor = table.get(CommandKey::parse(command))?;
    let bytes = pmbus_core::encode(descriptor, value).map_err(|err| {
        CliError::new(
            err.to_string(),
            Some("only linear commands take values; check exponent and bit widths".to_string()),
        )
    })?;
    println!("{}", script::format_bytes(&bytes));
    Ok(())
}

fn cmd_decode(table: &Path, command: &str, lsb: &str, msb: &str) -> Result<(), CliError> {
    let table = load_table(table, DuplicatePolicy::LastWins)?;
    let descriptor = table.get(CommandKey::parse(command))?;
    let bytes = [to_unsigned(parse_byte(lsb)?), to_unsigned(parse_byte(msb)?)];
    let value = pmbus_core::decode(descriptor, bytes)
        .map_err(|err| CliError::new(err.to_string(), None))?;
    println!("{}", value);
    Ok(())
}

fn cmd_run(config: &Path, script_path: Option<&Path>) -> Result<(), CliError> {
    let config_path = resolve_input_path(config)?;
    validate_input_file(&config_path)?;
    let config = BusConfig::from_path(&config_path).map_err(|err| {
        CliError::new(
            err.to_string(),
            Some("see `pmbus run --help` for the configuration format".to_string()),
        )
    })?;
    let bus = config
        .build_bus(&DeviceRegistry::with_builtin(), MemoryTransport::new)
        .map_err(|err| {
            CliError::new(
                err.to_string(),
                Some(format!(
                    "known device types: {}",
                    DeviceRegistry::with_builtin()
                        .types()
                        .map(|(tag, _)| tag)
                        .collect::<Vec<_>>()
                        .join(", ")
                )),
            )
        })?;

    let text = match script_path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read script: {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read script from stdin")?;
            text
        }
    };

    let mut runner = script::ScriptRunner::new(bus);
    let summary = runner.run(&text, &mut io::stdout().lock());
    if summary.failed > 0 {
        return Err(CliError::new(
            format!(
                "{} of {} instructions failed",
                summary.failed, summary.executed
            ),
            Some("errors are listed above with their line numbers".to_string()),
        ));
    }
    Ok(())
}

fn load_table(table: &Path, policy: DuplicatePolicy) -> Result<CommandTable, CliError> {
    let resolved = resolve_input_path(table)?;
    validate_input_file(&resolved)?;
    Ok(CommandTable::open_with(&resolved, policy)?)
}

fn access(descriptor: &CommandDescriptor) -> &'static str {
    match (descriptor.is_read_enabled(), descriptor.is_write_enabled()) {
        (true, true) => "rw",
        (true, false) => "r",
        (false, true) => "w",
        (false, false) => "-",
    }
}

fn format_label(descriptor: &CommandDescriptor) -> String {
    match descriptor.linear_format() {
        Some(format) => format!(
            "linear exp={} mantissa={} exponent_bits={} {}",
            format.exponent,
            format.mantissa_bits,
            format.exponent_bits,
            if format.signed { "signed" } else { "unsigned" }
        ),
        None => "raw".to_string(),
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("check the path; glob patterns must be quoted".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            None,
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern".to_string()),
        ));
    }
    if matches.len() > 1 {
        let mut message = format!(
            "multiple files match pattern '{}' ({} matches)",
            pattern,
            matches.len()
        );
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>();
        message.push_str("; matches: ");
        message.push_str(&listed.join(", "));
        if matches.len() > 3 {
            message.push_str(", ...");
        }
        return Err(CliError::new(
            message,
            Some("narrow the pattern to a single file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
