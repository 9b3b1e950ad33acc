use std::fs;
use std::path::PathBuf;

use seqlab::fetch::{self, FetchRequest, NcbiClient};
use seqlab::gel::{self, FragmentParams, GelParams};
use seqlab::logger;
use seqlab::repeats::{self, RepeatParams};
use seqlab::seq::{self, Sequence};
use seqlab::tm;

use anyhow::{anyhow, Context};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "seqlab",
    about = "Small DNA exercises: composition, Tm, ASCII gels and repeat finding"
)]
struct Opt {
    /// Seed for the random number generator
    #[structopt(long, global = true)]
    seed: Option<u64>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[structopt(short, long, parse(from_occurrences), global = true)]
    verbose: u8,

    /// NCBI E-utilities API key
    #[structopt(long, env = "NCBI_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
struct FetchOpt {
    /// Shortest acceptable sequence from NCBI
    #[structopt(long, default_value = "1000")]
    seq_min: usize,

    /// Longest acceptable sequence from NCBI
    #[structopt(long, default_value = "3000")]
    seq_max: usize,

    #[structopt(long, default_value = "100")]
    retmax: usize,
}

impl FetchOpt {
    fn request(&self) -> FetchRequest {
        FetchRequest {
            min_len: self.seq_min,
            max_len: self.seq_max,
            retmax: self.retmax,
        }
    }
}

#[derive(Debug, StructOpt)]
enum Command {
    /// Random DNA with nucleotide and CG dinucleotide percentages
    Composition {
        #[structopt(short, long, default_value = "200")]
        length: usize,

        /// Also write the report to this file
        #[structopt(short, long, parse(from_os_str))]
        output: Option<PathBuf>,
    },

    /// Melting temperature of one sequence
    Tm {
        sequence: String,

        /// [Na+] in mol/L
        #[structopt(long, default_value = "0.01")]
        na: f64,
    },

    /// Melting temperature along a FASTA sequence
    TmWindow {
        #[structopt(parse(from_os_str))]
        input: PathBuf,

        #[structopt(short, long, default_value = "8")]
        window: usize,

        #[structopt(long, default_value = "0.01")]
        na: f64,
    },

    /// ASCII gel of random fragments cut from a fetched sequence
    Gel {
        #[structopt(flatten)]
        fetch: FetchOpt,

        /// Number of sample lanes
        #[structopt(short = "n", long, default_value = "10")]
        fragments: usize,

        #[structopt(long, default_value = "100")]
        frag_min: usize,

        #[structopt(long, default_value = "300")]
        frag_max: usize,

        #[structopt(long, default_value = "40")]
        height: usize,

        #[structopt(long, default_value = "7")]
        lane_width: usize,

        #[structopt(long)]
        smear: bool,
    },

    /// Repeated substrings of a sequence
    Repeats {
        #[structopt(flatten)]
        fetch: FetchOpt,

        /// Read the sequence from a FASTA file instead of NCBI
        #[structopt(short, long, parse(from_os_str))]
        input: Option<PathBuf>,

        #[structopt(long, default_value = "3")]
        min_len: usize,

        #[structopt(long, default_value = "6")]
        max_len: usize,

        #[structopt(long, default_value = "2")]
        min_reps: usize,

        /// Patterns shown in the report
        #[structopt(long, default_value = "20")]
        limit: usize,
    },

    /// Most frequent repeat in each of several fetched genomes
    TopRepeat {
        #[structopt(short = "n", long, default_value = "10")]
        genomes: usize,

        #[structopt(long, default_value = "1000")]
        seq_min: usize,

        #[structopt(long, default_value = "15000")]
        seq_max: usize,

        #[structopt(long, default_value = "100")]
        retmax: usize,

        #[structopt(long, default_value = "3")]
        min_len: usize,

        #[structopt(long, default_value = "10")]
        max_len: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    logger::init_logger(logger::level_for_verbosity(opt.verbose))
        .map_err(|e| anyhow!("cannot install logger: {}", e))?;

    let mut rng = match opt.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    match &opt.cmd {
        Command::Composition { length, output } => {
            let dna = seq::random_dna(*length, &mut rng);
            let report = seq::composition_report(&dna);
            print!("{}", report);
            if let Some(path) = output {
                fs::write(path, &report).with_context(|| format!("writing {}", path.display()))?;
                info!("report written to {}", path.display());
            }
        }
        Command::Tm { sequence, na } => {
            let sequence = Sequence::new(sequence.trim())?;
            println!("tm1= {} C", tm::tm_wallace(sequence.as_bytes()));
            println!("tm2= {:.2} C", tm::tm_salt_adjusted(sequence.as_bytes(), *na)?);
        }
        Command::TmWindow { input, window, na } => {
            let sequence = seq::read_fasta_file(input)
                .with_context(|| format!("reading {}", input.display()))?;
            let rows = tm::sliding_window_tm(&sequence, *window, *na)?;
            print!("{}", tm::format_window_table(&rows));
        }
        Command::Gel {
            fetch: fetch_opt,
            fragments,
            frag_min,
            frag_max,
            height,
            lane_width,
            smear,
        } => {
            let client = NcbiClient::new(opt.api_key.clone())?;
            let fetched = fetch::fetch_or_synthesize(&client, &fetch_opt.request(), &mut rng);
            let frag_params = FragmentParams {
                count: *fragments,
                min_len: *frag_min,
                max_len: *frag_max,
            };
            let samples =
                gel::sample_fragments(fetched.sequence.as_bytes(), &frag_params, &mut rng)?;
            let gel_params = GelParams {
                height: *height,
                lane_width: *lane_width,
                smear: *smear,
                ..GelParams::default()
            };
            let lengths: Vec<usize> = samples.iter().map(|f| f.length).collect();
            let rendered = gel::render_gel(&lengths, &gel_params, &mut rng)?;

            println!("Sequence: {}", fetched.accession);
            println!("Sequence length: {} bp", fetched.sequence.len());
            println!("Sample fragments (lane -> length bp):");
            for (i, f) in samples.iter().enumerate() {
                println!("  Lane {}: {} bp (start {})", i + 1, f.length, f.start);
            }
            println!(
                "\nASCII gel (Lane 0 = Ladder, Lanes 1-{} = Samples):\n",
                samples.len()
            );
            println!("{}", rendered);
            println!("\n{}", gel::GEL_LEGEND);
        }
        Command::Repeats {
            fetch: fetch_opt,
            input,
            min_len,
            max_len,
            min_reps,
            limit,
        } => {
            let sequence = match input {
                Some(path) => {
                    let record = seq::read_fasta_record(path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    println!("Using sequence: {}", record.header);
                    Sequence::new(record.sequence)
                        .with_context(|| format!("no usable bases in {}", path.display()))?
                }
                None => {
                    let client = NcbiClient::new(opt.api_key.clone())?;
                    let fetched =
                        fetch::fetch_or_synthesize(&client, &fetch_opt.request(), &mut rng);
                    println!("Using sequence: {}", fetched.accession);
                    fetched.sequence
                }
            };
            println!("Sequence length: {} nucleotides", sequence.len());

            let params = RepeatParams {
                min_len: *min_len,
                max_len: *max_len,
                min_reps: *min_reps,
            };
            let found = repeats::find_repeats(sequence.as_bytes(), &params)?;
            print!("{}", repeats::format_repeat_report(sequence.len(), &found, *limit));
            println!("\nTotal unique repetitive patterns found: {}", found.len());
        }
        Command::TopRepeat {
            genomes,
            seq_min,
            seq_max,
            retmax,
            min_len,
            max_len,
        } => {
            let client = NcbiClient::new(opt.api_key.clone())?;
            let request = FetchRequest {
                min_len: *seq_min,
                max_len: *seq_max,
                retmax: *retmax,
            };
            println!("Fetching {} genome sequences...", genomes);
            let mut sequences = Vec::with_capacity(*genomes);
            for i in 0..*genomes {
                let fetched = fetch::fetch_or_synthesize(&client, &request, &mut rng);
                let label: String = fetched.accession.chars().take(50).collect();
                println!("  Downloaded genome {}/{}: {}...", i + 1, genomes, label);
                sequences.push(fetched.sequence);
            }

            let survey = repeats::survey_most_frequent(&sequences, *min_len, *max_len);
            for (i, top) in survey.iter().enumerate() {
                match top {
                    Some(top) => println!(
                        "Genome {}: Most frequent repeat '{}' appears {} times",
                        i + 1,
                        top.pattern,
                        top.count
                    ),
                    None => println!("Genome {}: no repeated substring", i + 1),
                }
            }
        }
    }

    Ok(())
}
