//! sitool: convert PSI/SI signaling tables between representations.
//!
//! Input files load into one section store by extension (`.bin` binary
//! sections, `.xml`, `.json`); the accumulated content converts to any of
//! the three forms.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use sitool_tables::{Charset, Dialect, DuplicatePolicy, LogReport, SectionFile, TableContext};

/// sitool - PSI/SI signaling table converter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input files (.bin, .xml or .json), loaded in order
    files: Vec<PathBuf>,

    /// Write the XML rendition to this path
    #[arg(long, value_name = "PATH")]
    xml: Option<PathBuf>,

    /// Write the JSON rendition to this path
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Write the binary rendition to this path
    #[arg(long, value_name = "PATH")]
    bin: Option<PathBuf>,

    /// Default character set for string fields
    #[arg(long, value_enum, default_value = "latin1")]
    charset: CharsetArg,

    /// Standards dialect governing defaults
    #[arg(long, value_enum, default_value = "dvb")]
    dialect: DialectArg,

    /// Keep the first copy when a section number repeats within a version
    #[arg(long)]
    first_wins: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Character set selection.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CharsetArg {
    /// Latin-1
    Latin1,
    /// UTF-8
    Utf8,
    /// Shift_JIS
    ShiftJis,
}

impl From<CharsetArg> for Charset {
    fn from(value: CharsetArg) -> Self {
        match value {
            CharsetArg::Latin1 => Charset::Latin1,
            CharsetArg::Utf8 => Charset::Utf8,
            CharsetArg::ShiftJis => Charset::ShiftJis,
        }
    }
}

/// Standards dialect selection.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum DialectArg {
    /// DVB (ETSI EN 300 468)
    Dvb,
    /// ISDB (ARIB STD-B10)
    Isdb,
    /// ATSC (A/65)
    Atsc,
}

impl From<DialectArg> for Dialect {
    fn from(value: DialectArg) -> Self {
        match value {
            DialectArg::Dvb => Dialect::Dvb,
            DialectArg::Isdb => Dialect::Isdb,
            DialectArg::Atsc => Dialect::Atsc,
        }
    }
}

/// Load one input by extension. Returns false when the file type is not
/// recognized and the file was skipped.
fn load_file(file: &mut SectionFile, path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("bin") => {
            info!("loading binary file {}", path.display());
            let data = std::fs::read(path)?;
            file.load_binary(&data)?;
        }
        Some("xml") => {
            info!("loading XML file {}", path.display());
            let text = std::fs::read_to_string(path)?;
            file.load_xml(&text)?;
        }
        Some("json") => {
            info!("loading JSON file {}", path.display());
            let text = std::fs::read_to_string(path)?;
            file.load_json(&text)?;
        }
        _ => {
            error!("unknown file type {}, ignored", path.display());
            return Ok(false);
        }
    }
    Ok(true)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let context = TableContext::for_dialect(Arc::new(LogReport), args.dialect.into())
        .with_charset(args.charset.into());
    let mut file = SectionFile::new(context);
    if args.first_wins {
        file.set_duplicate_policy(DuplicatePolicy::FirstWins);
    }

    for path in &args.files {
        match load_file(&mut file, path) {
            Ok(true) => info!(
                "after {}: {} bytes, {} sections, {} tables",
                path.display(),
                file.binary_size(),
                file.sections_count(),
                file.tables_count()
            ),
            Ok(false) => {}
            Err(e) => {
                error!("{}: {e}", path.display());
                return Err(e);
            }
        }
    }

    let mut wrote_output = false;
    if let Some(path) = &args.xml {
        std::fs::write(path, file.to_xml()?)?;
        info!("wrote XML to {}", path.display());
        wrote_output = true;
    }
    if let Some(path) = &args.json {
        std::fs::write(path, file.to_json()?)?;
        info!("wrote JSON to {}", path.display());
        wrote_output = true;
    }
    if let Some(path) = &args.bin {
        std::fs::write(path, file.save_binary())?;
        info!("wrote binary to {}", path.display());
        wrote_output = true;
    }

    if !wrote_output {
        println!("---- XML file content ----");
        println!("{}", file.to_xml()?);
        println!("---- JSON file content ----");
        println!("{}", file.to_json()?);
    }
    Ok(())
}
