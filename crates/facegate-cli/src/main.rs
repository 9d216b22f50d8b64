//! `facegate`: operator front end for the access-control terminal.

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use facegate_biometric::Gallery;
use facegate_core::constants::DEFAULT_BAUD_RATE;
use facegate_hardware::{ConnectionState, SerialLink};
use facegate_protocol::{StreamParser, encode, to_hex};
use facegate_terminal::config::DEFAULT_CONFIG_FILE;
use facegate_terminal::{
    AuditLog, CaptureSource, DecisionPipeline, FileCapture, IdentityResolver, PipelineError,
    RemoteLogSink, TerminalConfig, resolver,
};
use image::RgbImage;
use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// How often the operator loop checks for Ctrl-C while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "facegate", version)]
#[command(about = "Face-matching access-control terminal")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// More logging (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one decision attempt
    Login {
        /// Probe image; defaults to the configured capture file
        #[arg(short, long)]
        probe: Option<PathBuf>,
    },
    /// Enroll a person
    Register {
        #[arg(short, long)]
        name: String,
        /// Image to enroll; defaults to the configured capture file
        #[arg(short, long)]
        image: Option<PathBuf>,
    },
    /// Interactive operator loop on stdin (login, register NAME, status, quit)
    Run,
    /// Print decision frames arriving on a serial port
    Monitor {
        #[arg(short, long)]
        port: String,
        #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
        baud: u32,
    },
    /// List serial ports
    Ports,
    /// Print the wire bytes of a frame
    Encode {
        /// Command code (decimal or 0x-prefixed hex)
        #[arg(short, long, value_parser = parse_command)]
        command: u8,
        /// UTF-8 payload
        #[arg(short, long, default_value = "")]
        payload: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Ports => list_ports(),
        Commands::Encode { command, payload } => {
            let frame = encode(command, payload.as_bytes())?;
            println!("{}", to_hex(&frame));
            Ok(())
        }
        Commands::Monitor { port, baud } => monitor(&port, baud),
        Commands::Register { name, image } => {
            let config = TerminalConfig::load(&cli.config)?;
            let raster = match image {
                Some(path) => load_image(&path)?,
                None => FileCapture::new(&config.capture.probe_file).latest()?,
            };
            register(&config, &name, &raster)
        }
        Commands::Login { probe } => {
            let config = TerminalConfig::load(&cli.config)?;
            let terminal = Terminal::start(&config)?;
            let probe = match probe {
                Some(path) => FileCapture::new(path).latest(),
                None => FileCapture::new(&config.capture.probe_file).latest(),
            };
            let probe = probe
                .map_err(|e| warn!("No probe: {}", e))
                .ok();

            terminal.login(probe);
            terminal.stop();
            Ok(())
        }
        Commands::Run => {
            let config = TerminalConfig::load(&cli.config)?;
            run(&config)
        }
    }
}

fn setup_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn parse_command(value: &str) -> std::result::Result<u8, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid command code {value:?}: {e}"))
}

fn load_image(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).with_context(|| format!("cannot read {}", path.display()))?;
    Ok(image.to_rgb8())
}

/// The pipeline plus the remote log worker it feeds.
struct Terminal {
    pipeline: DecisionPipeline<Box<dyn IdentityResolver>>,
    remote_log: Option<Arc<RemoteLogSink>>,
}

impl Terminal {
    fn start(config: &TerminalConfig) -> Result<Self> {
        let mut link = SerialLink::new().with_read_timeout(config.serial.read_timeout());
        if link.open(&config.serial.port, config.serial.baud) != ConnectionState::Open {
            warn!(
                "Door controller unavailable on {}; decisions will not be signalled",
                config.serial.port
            );
        }

        let mut pipeline = DecisionPipeline::new(
            resolver::from_config(config),
            link,
            AuditLog::new(&config.storage.audit_log),
        );

        let mut remote_log = None;
        if let Some(address) = &config.remote_log.address {
            let sink = RemoteLogSink::spawn(
                address.clone(),
                config.remote_log.source.clone(),
                config.remote_log.queue_capacity,
            )
            .context("cannot start remote log worker")?;
            let sink = Arc::new(sink);
            pipeline = pipeline.with_sink(Arc::clone(&sink));
            remote_log = Some(sink);
        }

        Ok(Self {
            pipeline,
            remote_log,
        })
    }

    fn login(&self, probe: Option<RgbImage>) {
        match self.pipeline.attempt(probe) {
            Ok(decision) => {
                println!("{}", decision.message);
                debug!(
                    "score {:.4}, frame sent: {}, audited: {}",
                    decision.result.score, decision.frame_sent, decision.audited
                );
            }
            Err(PipelineError::Busy) => println!("Busy, try again."),
        }
    }

    /// Close the serial link and let queued status messages go out.
    fn stop(self) {
        self.pipeline.shutdown();
        drop(self.pipeline);

        if let Some(sink) = self.remote_log {
            match Arc::try_unwrap(sink) {
                Ok(sink) => sink.close(),
                Err(_) => debug!("Remote log still shared; not waiting for it"),
            }
        }
    }
}

fn register(config: &TerminalConfig, name: &str, raster: &RgbImage) -> Result<()> {
    let gallery = Gallery::new(&config.storage.enrollment_dir);
    let identity = gallery.register(name, raster)?;
    println!("User '{identity}' registered successfully");
    Ok(())
}

fn run(config: &TerminalConfig) -> Result<()> {
    let running = install_ctrl_c_handler()?;
    let lines = spawn_stdin_reader()?;
    let terminal = Terminal::start(config)?;
    info!("Ready. Commands: login, register NAME, status, quit");

    let outcome = operate(&terminal, config, &lines, &running);
    terminal.stop();
    outcome
}

/// Set up a Ctrl-C handler that clears the returned flag.
fn install_ctrl_c_handler() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("cannot install Ctrl-C handler")?;
    Ok(running)
}

/// Forward stdin lines so the operator loop can wait with a timeout.
fn spawn_stdin_reader() -> Result<Receiver<io::Result<String>>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("facegate-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("cannot start stdin reader")?;
    Ok(rx)
}

#[derive(Debug, PartialEq, Eq)]
enum OperatorCommand<'a> {
    Empty,
    Login,
    Register(&'a str),
    Status,
    Quit,
    Unknown(&'a str),
}

fn parse_line(line: &str) -> OperatorCommand<'_> {
    let line = line.trim();
    let (command, argument) = match line.split_once(char::is_whitespace) {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    match command {
        "" => OperatorCommand::Empty,
        "login" => OperatorCommand::Login,
        "register" => OperatorCommand::Register(argument),
        "status" => OperatorCommand::Status,
        "quit" | "exit" => OperatorCommand::Quit,
        other => OperatorCommand::Unknown(other),
    }
}

/// Serve operator commands until `quit`, end of input or `running` clears.
fn operate(
    terminal: &Terminal,
    config: &TerminalConfig,
    lines: &Receiver<io::Result<String>>,
    running: &AtomicBool,
) -> Result<()> {
    let mut capture = FileCapture::new(&config.capture.probe_file);

    while running.load(Ordering::SeqCst) {
        let line = match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => line.context("cannot read stdin")?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };

        match parse_line(&line) {
            OperatorCommand::Empty => continue,
            OperatorCommand::Login => {
                let probe = capture
                    .latest()
                    .map_err(|e| warn!("No probe: {}", e))
                    .ok();
                terminal.login(probe);
            }
            OperatorCommand::Register(name) => match capture.latest() {
                Ok(raster) => {
                    if let Err(e) = register(config, name, &raster) {
                        println!("Registration failed: {e}");
                    }
                }
                Err(e) => println!("Registration failed: {e}"),
            },
            OperatorCommand::Status => {
                println!("Serial link: {}", terminal.pipeline.link_state());
            }
            OperatorCommand::Quit => return Ok(()),
            OperatorCommand::Unknown(other) => println!("Unknown command {other:?}"),
        }
        io::stdout().flush()?;
    }

    info!("Interrupted, shutting down");
    Ok(())
}

fn list_ports() -> Result<()> {
    let ports = facegate_hardware::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{:<20} {}", port.name, port.kind);
    }
    Ok(())
}

fn monitor(port: &str, baud: u32) -> Result<()> {
    let mut reader = facegate_hardware::open_reader(port, baud, Duration::from_millis(200))?;
    let mut parser = StreamParser::new();
    let mut buf = [0u8; 256];
    info!("Listening on {} at {} baud", port, baud);

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => bail!("{port} closed"),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                continue;
            }
            Err(e) => return Err(e).with_context(|| format!("reading {port}")),
        };

        parser.feed(&buf[..n]);
        for item in parser.drain() {
            match item {
                Ok(frame) => println!("{frame}  [{}]", to_hex(&frame.to_bytes())),
                Err(e) => warn!("Discarding malformed frame: {}", e),
            }
        }
    }
}
