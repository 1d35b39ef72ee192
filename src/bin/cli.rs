//! rochefort CLI Client
//!
//! Command-line interface for interacting with a rochefort service.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use rochefort::protocol::parse_offset;
use rochefort::{
    AppendRequest, Client, ClientConfig, DeleteRequest, Frame, GetMultiRequest,
    GetRequest, ModifyRequest, Namespace, OffsetEncoding, Position, Query, Result, ScanRequest,
    SearchRequest, StatsRequest,
};

/// rochefort CLI
#[derive(Parser, Debug)]
#[command(name = "rochefort-cli")]
#[command(about = "CLI for the rochefort append + offset service")]
#[command(version)]
struct Args {
    /// Service base URL
    #[arg(short, long, default_value = "http://localhost:8000/")]
    url: String,

    /// Namespace (empty selects the default namespace)
    #[arg(short, long, default_value = "")]
    namespace: String,

    /// Read timeout in milliseconds
    #[arg(long, default_value = "1000")]
    timeout_ms: u64,

    /// Send getMulti offsets as CSV instead of binary
    #[arg(long)]
    csv: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a record and print its offset
    Append {
        /// Record contents (use --file for binary data)
        data: Option<String>,

        /// Read the record from a file
        #[arg(long, conflicts_with = "data")]
        file: Option<PathBuf>,

        /// Bytes to reserve for later in-place growth
        #[arg(long)]
        alloc_size: Option<u32>,

        /// Tag to index the record under (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Overwrite part of a record
    Modify {
        offset: String,

        /// Start position, -1 appends at the current end
        #[arg(allow_hyphen_values = true)]
        position: i64,

        data: String,

        /// Truncate the record to the end of this write
        #[arg(long)]
        reset_length: bool,
    },

    /// Fetch one record
    Get { offset: String },

    /// Fetch several records
    GetMulti {
        #[arg(required = true)]
        offsets: Vec<String>,
    },

    /// Stream every record in the namespace
    Scan,

    /// Stream records matching a JSON tag query, e.g. '{"or":[{"tag":"a"},{"tag":"b"}]}'
    Search { query: String },

    /// Drop the namespace
    Delete,

    /// Print namespace counters as JSON
    Stats,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,rochefort=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let encoding = if args.csv {
        OffsetEncoding::Csv
    } else {
        OffsetEncoding::Binary
    };
    let config = ClientConfig::builder()
        .base_url(&args.url)
        .read_timeout_ms(args.timeout_ms)
        .offset_encoding(encoding)
        .build();

    tracing::debug!("rochefort-cli v{} -> {}", rochefort::VERSION, config.base_url);

    let client = Client::connect(config)?;
    let namespace = Namespace::new(args.namespace);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Commands::Append {
            data,
            file,
            alloc_size,
            tags,
        } => {
            let data = match (data, file) {
                (_, Some(path)) => std::fs::read(path)?,
                (Some(text), None) => text.into_bytes(),
                (None, None) => Vec::new(),
            };
            let mut request = AppendRequest::new(namespace, data).tags(tags);
            if let Some(size) = alloc_size {
                request = request.alloc_size(size);
            }
            let offset = client.append(&request)?;
            writeln!(out, "{}", offset)?;
        }
        Commands::Modify {
            offset,
            position,
            data,
            reset_length,
        } => {
            let request = ModifyRequest::new(
                namespace,
                parse_offset(&offset)?,
                Position::from_wire(position)?,
                data.into_bytes(),
            )
            .reset_length(reset_length);
            writeln!(out, "{}", client.modify(&request)?)?;
        }
        Commands::Get { offset } => {
            let data = client.get(&GetRequest::new(namespace, parse_offset(&offset)?))?;
            out.write_all(&data)?;
        }
        Commands::GetMulti { offsets } => {
            let offsets = offsets
                .iter()
                .map(|raw| parse_offset(raw))
                .collect::<Result<Vec<_>>>()?;
            for payload in client.get_multi(&GetMultiRequest::new(namespace, offsets))? {
                writeln!(out, "{}", String::from_utf8_lossy(&payload))?;
            }
        }
        Commands::Scan => {
            for frame in client.scan(&ScanRequest::new(namespace))? {
                print_frame(&mut out, &frame?)?;
            }
        }
        Commands::Search { query } => {
            let query = Query::from_json(query.as_bytes())?;
            for frame in client.search(&SearchRequest::new(namespace, query))? {
                print_frame(&mut out, &frame?)?;
            }
        }
        Commands::Delete => {
            writeln!(out, "{}", client.delete(&DeleteRequest::new(namespace))?)?;
        }
        Commands::Stats => {
            let stats = client.stats(&StatsRequest::new(namespace))?;
            writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
        }
    }

    Ok(())
}

/// One line per frame: offset, length, payload (lossy UTF-8)
fn print_frame(out: &mut impl Write, frame: &Frame) -> io::Result<()> {
    let offset = frame.offset.map(|o| o.to_string()).unwrap_or_default();
    writeln!(
        out,
        "{}\t{}\t{}",
        offset,
        frame.length,
        String::from_utf8_lossy(&frame.payload)
    )
}
