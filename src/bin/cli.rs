//! VeroKV CLI Client
//!
//! Command-line interface for interacting with VeroKV. With a subcommand it
//! runs one command; without one it starts an interactive prompt that sends
//! each line as a command and prints the reply.

use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::TcpStream;

use bytes::Bytes;
use clap::{Parser, Subcommand};
use verokv::protocol::{decode_command, read_reply, write_command, Command, Verb};
use verokv::Result;

/// VeroKV CLI
#[derive(Parser, Debug)]
#[command(name = "verokv-cli")]
#[command(about = "CLI for the VeroKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6381")]
    server: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,
    },

    /// Delete one or more keys
    Del {
        /// The keys to delete
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Ping the server
    Ping,
}

impl Commands {
    fn into_command(self) -> Command {
        match self {
            Commands::Get { key } => Command::get(key),
            Commands::Set { key, value } => Command::set(key, value),
            Commands::Del { keys } => Command::del(keys),
            Commands::Ping => Command::new(Verb::Ping, Vec::<Bytes>::new()),
        }
    }
}

struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one command and print its reply; `false` once the server is gone
    fn roundtrip(&mut self, command: &Command) -> Result<bool> {
        write_command(&mut self.writer, command)?;
        match read_reply(&mut self.reader)? {
            Some(reply) => {
                println!("{}", reply);
                Ok(true)
            }
            None => {
                println!("(connection closed)");
                Ok(false)
            }
        }
    }
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Could not connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let outcome = match args.command {
        Some(command) => client.roundtrip(&command.into_command()).map(|_| ()),
        None => repl(&mut client),
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn repl(client: &mut Client) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        print!("verokv> ");
        io::stdout().flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let command = decode_command(line.trim_end().as_bytes());
        if !client.roundtrip(&command)? || command.is_terminal() {
            return Ok(());
        }
    }
}
