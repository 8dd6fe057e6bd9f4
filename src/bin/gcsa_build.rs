use gcsa::builder;
use gcsa::internal;
use gcsa::support::{Alphabet, KMer, Key};

use simple_sds::serialize::Serialize;

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Error, ErrorKind};
use std::time::Instant;
use std::{env, io, process};

use getopts::Options;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start = Instant::now();
    let config = Config::new().map_err(|x| x.to_string())?;

    let filename = config.filename.as_ref().unwrap();
    if config.verbose {
        eprintln!("Loading kmers from {}", filename);
    }
    let alpha = Alphabet::new();
    let (mut kmers, kmer_length) = load_kmers(filename, &alpha).map_err(|x| x.to_string())?;
    if config.verbose {
        eprintln!("{} kmers of length {}", kmers.len(), kmer_length);
    }

    let graph = builder::build(&mut kmers, kmer_length, &alpha);
    if config.verbose {
        eprintln!("{} unique keys", graph.lcp.total_keys());
        eprintln!("{} path nodes, maximum order {}", graph.len(), graph.order);
        eprintln!("{} edges", graph.alphabet.total());
        if !graph.fully_sorted() {
            eprintln!("Some path labels are still ambiguous at the order cap");
        }
    }

    if let Some(output) = config.output.as_ref() {
        write_lcp(&graph, output).map_err(|x| x.to_string())?;
        if config.verbose {
            eprintln!("LCP support written to {}", output);
        }
    }

    if config.verbose {
        eprintln!("Construction finished in {:.3} seconds", start.elapsed().as_secs_f64());
        internal::report_memory_usage();
        eprintln!();
    }
    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    filename: Option<String>,
    output: Option<String>,
    verbose: bool,
}

impl Config {
    pub fn new() -> Result<Config, String> {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("o", "output", "write the LCP support to a file", "FILE");
        opts.optflag("v", "verbose", "print progress information");
        let matches = opts.parse(&args[1..]).map_err(|x| x.to_string())?;

        let mut config = Config {
            filename: None,
            output: None,
            verbose: false,
        };
        if matches.opt_present("h") {
            let header = format!("Usage: {} [options] kmers.txt", program);
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        if let Some(s) = matches.opt_str("o") {
            config.output = Some(s);
        }
        if matches.opt_present("v") {
            config.verbose = true;
        }

        if !matches.free.is_empty() {
            config.filename = Some(matches.free[0].clone());
        } else {
            let header = format!("Usage: {} [options] kmers.txt", program);
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        }

        Ok(config)
    }
}

//-----------------------------------------------------------------------------

// Reads the text kmer format: one line per kmer, with one record per
// destination token. All kmers must have the same length.
fn load_kmers(filename: &str, alpha: &Alphabet) -> io::Result<(Vec<KMer>, usize)> {
    let file = File::open(filename).map_err(|e| {
        Error::new(e.kind(), format!("Cannot open input file {}: {}", filename, e))
    })?;
    let reader = BufReader::new(file);

    let mut kmers: Vec<KMer> = Vec::new();
    let mut kmer_length = 0;
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        if kmer_length == 0 {
            kmer_length = tokens[0].len();
            if kmer_length > Key::MAX_LENGTH {
                return Err(Error::new(ErrorKind::InvalidData,
                    format!("Line {}: kmer length {} is larger than {}", number + 1, kmer_length, Key::MAX_LENGTH)));
            }
        } else if tokens[0].len() != kmer_length {
            return Err(Error::new(ErrorKind::InvalidData,
                format!("Line {}: kmer {} does not have length {}", number + 1, tokens[0], kmer_length)));
        }
        for successor in 4..tokens.len() {
            let kmer = KMer::new(&tokens, alpha, successor).map_err(|e| {
                Error::new(ErrorKind::InvalidData, format!("Line {}: {}", number + 1, e))
            })?;
            kmers.push(kmer);
        }
    }
    Ok((kmers, kmer_length))
}

fn write_lcp(graph: &builder::PathGraph, filename: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    let mut file = options.create(true).write(true).truncate(true).open(filename)?;
    graph.lcp.serialize(&mut file)?;
    Ok(())
}

//-----------------------------------------------------------------------------
