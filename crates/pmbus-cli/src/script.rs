//! Line-oriented instruction scripts for `pmbus run`.
//!
//! Each non-empty line is one instruction, tokenized on whitespace and parsed
//! with clap. A failing line is reported on stderr with its line number and
//! the script continues; the caller decides the exit status from the summary.
//! Devices are picked by address (`-a`) or by index in address order (`-i`).

use std::io::Write;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use pmbus_core::registry::check_device_address;
use pmbus_core::{Bus, CommandKey, MemoryTransport, Payload, Reading, parse_byte, to_unsigned};

use crate::CliError;

const COMMENT: char = '#';

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct Line {
    #[command(subcommand)]
    instruction: Instruction,
}

#[derive(Subcommand, Debug)]
enum Instruction {
    /// Write a command to a device.
    Write(WriteArgs),
    /// Read a command from a device.
    Read(ReadArgs),
    /// List configured devices.
    Devices,
}

/// Target device, by address or by position in address order.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct DeviceSelection {
    /// Device address
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Index of the device among the configured ones, in address order
    #[arg(short = 'i', long)]
    index: Option<usize>,
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Command name or register address
    command: String,

    #[command(flatten)]
    device: DeviceSelection,

    /// Value for a linear command
    #[arg(short = 'v', long, allow_negative_numbers = true, conflicts_with = "bytes")]
    value: Option<f64>,

    /// Raw data bytes, MSByte first
    #[arg(short = 'b', long, num_args = 1.., allow_negative_numbers = true)]
    bytes: Option<Vec<String>>,

    /// Number of consecutive writes
    #[arg(
        short = 'l',
        long,
        value_parser = clap::value_parser!(u32).range(1..),
        conflicts_with = "time"
    )]
    loops: Option<u32>,

    /// Keep sending the write for this many milliseconds
    #[arg(short = 't', long)]
    time: Option<u64>,
}

#[derive(Args, Debug)]
struct ReadArgs {
    /// Command name or register address
    command: String,

    #[command(flatten)]
    device: DeviceSelection,
}

/// Outcome counts of one script run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub(crate) executed: usize,
    pub(crate) failed: usize,
}

pub(crate) struct ScriptRunner {
    bus: Bus<MemoryTransport>,
}

impl ScriptRunner {
    pub(crate) fn new(bus: Bus<MemoryTransport>) -> Self {
        ScriptRunner { bus }
    }

    /// Execute every instruction in `text`, writing results to `out`.
    pub(crate) fn run<W: Write>(&mut self, text: &str, out: &mut W) -> RunSummary {
        let mut summary = RunSummary::default();
        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let content = line.split(COMMENT).next().unwrap_or_default().trim();
            if content.is_empty() {
                continue;
            }
            summary.executed += 1;
            if let Err(err) = self.execute(content, out) {
                summary.failed += 1;
                eprintln!("error: line {}: {}", line_no, err.message);
                if let Some(hint) = err.hint {
                    eprintln!("hint: {}", hint);
                }
            }
        }
        debug!(
            executed = summary.executed,
            failed = summary.failed,
            "script finished"
        );
        summary
    }

    fn execute<W: Write>(&mut self, content: &str, out: &mut W) -> Result<(), CliError> {
        let line = Line::try_parse_from(content.split_whitespace()).map_err(|err| {
            CliError::new(
                first_line(&err.to_string()),
                Some("see `pmbus run --help` for the instruction grammar".to_string()),
            )
        })?;

        let output = match line.instruction {
            Instruction::Write(args) => self.write(args)?,
            Instruction::Read(args) => self.read(args)?,
            Instruction::Devices => self.devices(),
        };
        for row in output {
            writeln!(out, "{}", row)
                .map_err(|err| CliError::new(format!("failed to write output: {}", err), None))?;
        }
        Ok(())
    }

    fn write(&mut self, args: WriteArgs) -> Result<Vec<String>, CliError> {
        let address = self.select(&args.device)?;
        let payload = match (args.value, args.bytes) {
            (Some(value), _) => Payload::Value(value),
            (None, Some(bytes)) => Payload::Raw(wire_order(&bytes)?),
            (None, None) => Payload::Raw(Vec::new()),
        };

        let session = self.bus.get_mut(address).map_err(session_error)?;
        let key = CommandKey::parse(&args.command);
        let mut sent_count = 0u64;
        match args.time {
            Some(millis) => {
                let deadline = Instant::now() + Duration::from_millis(millis);
                loop {
                    session
                        .write(key.clone(), payload.clone())
                        .map_err(session_error)?;
                    sent_count += 1;
                    if Instant::now() >= deadline {
                        break;
                    }
                }
            }
            None => {
                for _ in 0..args.loops.unwrap_or(1) {
                    session
                        .write(key.clone(), payload.clone())
                        .map_err(session_error)?;
                    sent_count += 1;
                }
            }
        }

        let sent = session
            .transport()
            .writes()
            .last()
            .map(|write| format_bytes(&write.data))
            .unwrap_or_default();
        let mut row = format!("{} {} <- {}", hex(address), args.command, sent);
        if sent_count != 1 {
            row.push_str(&format!(" (x{})", sent_count));
        }
        Ok(vec![row])
    }

    fn read(&mut self, args: ReadArgs) -> Result<Vec<String>, CliError> {
        let address = self.select(&args.device)?;
        let session = self.bus.get_mut(address).map_err(session_error)?;
        let reading = session
            .read(CommandKey::parse(&args.command))
            .map_err(session_error)?;
        let shown = match reading {
            Reading::Value(value) => value.to_string(),
            Reading::Raw(bytes) => {
                let mut msb_first = bytes;
                msb_first.reverse();
                format_bytes(&msb_first)
            }
        };
        Ok(vec![format!("{} {} = {}", hex(address), args.command, shown)])
    }

    fn select(&self, device: &DeviceSelection) -> Result<u8, CliError> {
        match (&device.address, device.index) {
            (Some(text), _) => parse_device_address(text),
            (None, Some(index)) => self.bus.address_at(index).map_err(session_error),
            (None, None) => Err(CliError::new(
                "one of --address or --index is required".to_string(),
                None,
            )),
        }
    }

    fn devices(&self) -> Vec<String> {
        self.bus
            .iter()
            .map(|session| {
                format!(
                    "{} {} ({} commands)",
                    hex(session.address()),
                    session.table().origin(),
                    session.table().len()
                )
            })
            .collect()
    }
}

/// Render bytes as `[0x10, 0xe9]`.
pub(crate) fn format_bytes(bytes: &[u8]) -> String {
    let items = bytes
        .iter()
        .map(|byte| format!("{:#04x}", byte))
        .collect::<Vec<_>>();
    format!("[{}]", items.join(", "))
}

/// Parse MSByte-first literals into wire order (LSByte first).
fn wire_order(literals: &[String]) -> Result<Vec<u8>, CliError> {
    let mut bytes = literals
        .iter()
        .map(|literal| parse_byte(literal).map(to_unsigned))
        .collect::<Result<Vec<_>, _>>()?;
    bytes.reverse();
    Ok(bytes)
}

fn parse_device_address(text: &str) -> Result<u8, CliError> {
    let address = to_unsigned(parse_byte(text)?);
    check_device_address(address).map_err(session_error)
}

fn session_error(err: impl std::fmt::Display) -> CliError {
    CliError::new(err.to_string(), None)
}

fn hex(address: u8) -> String {
    format!("{:#04x}", address)
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default();
    line.strip_prefix("error: ").unwrap_or(line).to_string()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pmbus_core::{Bus, CommandTable, DeviceSession, MemoryTransport};

    use super::{RunSummary, ScriptRunner, format_bytes, wire_order};

    const TABLE: &str = "\
header
OPERATION,0x01,T,T,1,F,0,0,0,F
CLEAR_FAULTS,0x03,F,T,0,F,0,0,0,F
VOUT_COMMAND,0x21,T,T,2,T,-3,11,5,F
STATUS_WORD,0x79,T,T,2,F,0,0,0,F
";

    fn runner() -> ScriptRunner {
        let table = Arc::new(CommandTable::parse(TABLE, "script.csv").unwrap());
        let mut bus = Bus::new();
        bus.add(DeviceSession::new(0x29, table, MemoryTransport::new(0x29)))
            .unwrap();
        ScriptRunner::new(bus)
    }

    fn run(runner: &mut ScriptRunner, text: &str) -> (RunSummary, String) {
        let mut out = Vec::new();
        let summary = runner.run(text, &mut out);
        (summary, String::from_utf8(out).unwrap())
    }

    #[test]
    fn write_then_read_value() {
        let mut runner = runner();
        let (summary, out) = run(
            &mut runner,
            "write VOUT_COMMAND -a 0x29 -v 34\nread VOUT_COMMAND -a 0x29\n",
        );
        assert_eq!(
            summary,
            RunSummary {
                executed: 2,
                failed: 0
            }
        );
        assert_eq!(
            out,
            "0x29 VOUT_COMMAND <- [0x10, 0xe9]\n0x29 VOUT_COMMAND = 34\n"
        );
    }

    #[test]
    fn raw_bytes_are_given_msbyte_first() {
        let mut runner = runner();
        let (summary, out) = run(
            &mut runner,
            "write STATUS_WORD -a 41 -b 0x12 0x34\nread 0x79 -a 0x29",
        );
        assert_eq!(summary.failed, 0);
        assert_eq!(
            out,
            "0x29 STATUS_WORD <- [0x34, 0x12]\n0x29 0x79 = [0x12, 0x34]\n"
        );
    }

    #[test]
    fn comments_blank_lines_and_loops() {
        let mut runner = runner();
        let (summary, out) = run(
            &mut runner,
            "# clear twice\n\nwrite CLEAR_FAULTS -a 0x29 -l 2 # send byte\n",
        );
        assert_eq!(summary.executed, 1);
        assert_eq!(out, "0x29 CLEAR_FAULTS <- [] (x2)\n");
        let session = runner.bus.get(0x29).unwrap();
        assert_eq!(session.transport().writes().len(), 2);
    }

    #[test]
    fn devices_can_be_selected_by_index() {
        let mut runner = runner();
        let (summary, out) = run(
            &mut runner,
            "write VOUT_COMMAND -i 0 -v 12\nread VOUT_COMMAND -i 0\nread VOUT_COMMAND -i 1\nread VOUT_COMMAND -i 0 -a 0x29\nread VOUT_COMMAND\n",
        );
        assert_eq!(
            summary,
            RunSummary {
                executed: 5,
                failed: 3
            }
        );
        assert_eq!(
            out,
            "0x29 VOUT_COMMAND <- [0x60, 0xe8]\n0x29 VOUT_COMMAND = 12\n"
        );
    }

    #[test]
    fn timed_writes_repeat_until_the_deadline() {
        let mut runner = runner();
        let (summary, out) = run(&mut runner, "write OPERATION -a 0x29 -b 0x80 -t 0\n");
        assert_eq!(summary.failed, 0);
        assert_eq!(out, "0x29 OPERATION <- [0x80]\n");

        let (summary, out) = run(&mut runner, "write OPERATION -a 0x29 -b 0x80 -t 5\n");
        assert_eq!(summary.failed, 0);
        assert!(out.starts_with("0x29 OPERATION <- [0x80]"));
        let writes = runner.bus.get(0x29).unwrap().transport().writes().len();
        assert!(writes >= 2);
    }

    #[test]
    fn loops_and_time_conflict() {
        let mut runner = runner();
        let (summary, _) = run(&mut runner, "write OPERATION -a 0x29 -b 0x80 -l 2 -t 5");
        assert_eq!(summary.failed, 1);
        assert!(runner.bus.get(0x29).unwrap().transport().writes().is_empty());
    }

    #[test]
    fn failing_lines_do_not_stop_the_script() {
        let mut runner = runner();
        let (summary, out) = run(
            &mut runner,
            "read VOUT_COMMAND -a 0x30\nwrite OPERATION -a 0x29 -v 1\nbogus\nwrite OPERATION -a 0x29 -b 0x80\n",
        );
        assert_eq!(
            summary,
            RunSummary {
                executed: 4,
                failed: 3
            }
        );
        assert_eq!(out, "0x29 OPERATION <- [0x80]\n");
    }

    #[test]
    fn devices_lists_configured_addresses() {
        let mut runner = runner();
        let (_, out) = run(&mut runner, "devices");
        assert_eq!(out, "0x29 script.csv (4 commands)\n");
    }

    #[test]
    fn value_and_bytes_conflict() {
        let mut runner = runner();
        let (summary, _) = run(&mut runner, "write OPERATION -a 0x29 -v 1 -b 0x01");
        assert_eq!(summary.failed, 1);
    }

    #[test]
    fn byte_helpers() {
        assert_eq!(format_bytes(&[0x00, 0x18]), "[0x00, 0x18]");
        assert_eq!(
            wire_order(&["0x12".to_string(), "255".to_string()]).unwrap(),
            vec![0xFF, 0x12]
        );
        assert!(wire_order(&["0x1".to_string()]).is_err());
    }
}
