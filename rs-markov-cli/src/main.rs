use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::info;

use rs_markov_core::codec::{self, packed};
use rs_markov_core::corpus::{Corpus, CorpusOptions};
use rs_markov_core::model::{Alphabet, FrequencyModel, GenerationInput, Generator, ModelConfig, StartSeed};
use rs_markov_core::{persistence, statistics};

/// Character-level Markov text model: train, generate, encode and decode.
#[derive(Parser, Debug)]
#[command(name = "rs-markov", version, about)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Train a model on one or more text files and save it
	Train(TrainArgs),
	/// Generate random text from a saved model
	Generate(GenerateArgs),
	/// Encode text as a rank sequence
	Encode(TextArgs),
	/// Decode a rank sequence back to text
	Decode(DecodeArgs),
	/// Encode text and pack the ranks into a compact binary file
	Pack(PackArgs),
	/// Unpack a binary file produced by `pack` and decode it
	Unpack(UnpackArgs),
	/// Print model statistics
	Stats(ModelArgs),
	/// Chi-square tests of how much the next symbol depends on its context
	Dependence(DependenceArgs),
}

#[derive(Args, Debug)]
struct ModelArgs {
	/// Path of the saved model
	#[arg(short, long, default_value = "model.bin")]
	model: PathBuf,
}

#[derive(Args, Debug)]
struct TrainArgs {
	/// Training files, concatenated with a space in between
	#[arg(required = true)]
	corpus: Vec<PathBuf>,

	/// Output path of the model
	#[arg(short, long, default_value = "model.bin")]
	output: PathBuf,

	/// Maximum context length
	#[arg(short = 'n', long, default_value_t = 5)]
	order: usize,

	/// Symbols of the model, in ranking order
	#[arg(short, long, default_value = Alphabet::BASIC)]
	alphabet: String,

	/// Only store full-order n-grams, without fallback to shorter contexts
	#[arg(long)]
	no_backoff: bool,

	/// Keep only the text between the Project Gutenberg `***` markers
	#[arg(long)]
	strip_gutenberg: bool,

	/// Replace accented letters and typographic quotes by ASCII
	#[arg(long)]
	replace_accents: bool,
}

#[derive(Args, Debug)]
struct GenerateArgs {
	#[command(flatten)]
	model: ModelArgs,

	/// Number of symbols to generate, seed included
	#[arg(short, long, default_value_t = 200)]
	length: usize,

	/// Custom seed text
	#[arg(short, long, conflicts_with = "corpus_seed")]
	seed: Option<String>,

	/// Start from the beginning of the training text
	#[arg(long)]
	corpus_seed: bool,
}

#[derive(Args, Debug)]
struct TextArgs {
	#[command(flatten)]
	model: ModelArgs,

	/// Text to encode; read from stdin when absent
	text: Option<String>,
}

#[derive(Args, Debug)]
struct DecodeArgs {
	#[command(flatten)]
	model: ModelArgs,

	/// Ranks, separated by spaces or commas; read from stdin when absent
	ranks: Vec<String>,
}

#[derive(Args, Debug)]
struct PackArgs {
	#[command(flatten)]
	text: TextArgs,

	/// Output file
	#[arg(short, long)]
	output: PathBuf,
}

#[derive(Args, Debug)]
struct DependenceArgs {
	#[command(flatten)]
	model: ModelArgs,

	/// Only test this context; every stored context otherwise
	#[arg(short, long)]
	context: Option<String>,

	/// Significance level below which a test is reported as rejected
	#[arg(long, default_value_t = 0.05)]
	significance: f64,
}

#[derive(Args, Debug)]
struct UnpackArgs {
	#[command(flatten)]
	model: ModelArgs,

	/// File produced by `pack`
	input: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::init();
	let cli = Cli::parse();

	match cli.command {
		Command::Train(args) => train(args),
		Command::Generate(args) => generate(args),
		Command::Encode(args) => {
			let model = persistence::load_from_path(&args.model.model)?;
			let ranks = codec::encode(&model, &read_text(args.text)?)?;
			println!("{}", join_ranks(&ranks));
			Ok(())
		}
		Command::Decode(args) => {
			let model = persistence::load_from_path(&args.model.model)?;
			let ranks = parse_ranks(&args.ranks)?;
			print!("{}", codec::decode(&model, &ranks)?);
			Ok(())
		}
		Command::Pack(args) => {
			let model = persistence::load_from_path(&args.text.model.model)?;
			let bytes = packed::compress(&model, &read_text(args.text.text)?)?;
			fs::write(&args.output, &bytes)?;
			info!("wrote {} bytes to {}", bytes.len(), args.output.display());
			Ok(())
		}
		Command::Unpack(args) => {
			let model = persistence::load_from_path(&args.model.model)?;
			let bytes = fs::read(&args.input)?;
			print!("{}", packed::decompress(&model, &bytes)?);
			Ok(())
		}
		Command::Stats(args) => stats(args),
		Command::Dependence(args) => dependence(args),
	}
}

fn train(args: TrainArgs) -> Result<(), Box<dyn std::error::Error>> {
	let config = ModelConfig::new(args.order, &args.alphabet, !args.no_backoff)?;
	let options = CorpusOptions { strip_gutenberg: args.strip_gutenberg, replace_accents: args.replace_accents };
	let text = Corpus::Files(args.corpus).read(&options)?;

	let model = FrequencyModel::trained(config, &text)?;
	persistence::save_to_path(&model, &args.output)?;
	println!("Trained model saved to {}", args.output.display());
	Ok(())
}

fn generate(args: GenerateArgs) -> Result<(), Box<dyn std::error::Error>> {
	let model = persistence::load_from_path(&args.model.model)?;

	let start_seed = match (args.seed, args.corpus_seed) {
		(Some(seed), _) => StartSeed::Custom(seed),
		(None, true) => StartSeed::Corpus,
		(None, false) => StartSeed::Empty,
	};
	let input = GenerationInput::new(args.length)?.with_seed(start_seed);

	println!("{}", Generator::new(&model).generate(&input)?);
	Ok(())
}

fn stats(args: ModelArgs) -> Result<(), Box<dyn std::error::Error>> {
	let model = persistence::load_from_path(&args.model)?;
	let table = model.counts()?;

	println!("order: {}", model.order());
	println!("backoff: {}", model.backoff());
	println!("alphabet: {:?}", model.alphabet().as_string());
	println!("distinct n-grams: {}", table.len());
	println!("count -> n-grams");
	for (count, ngrams) in table.histogram() {
		println!("{count}\t{ngrams}");
	}
	Ok(())
}

fn dependence(args: DependenceArgs) -> Result<(), Box<dyn std::error::Error>> {
	let model = persistence::load_from_path(&args.model.model)?;

	let Some(context) = args.context else {
		let results = statistics::all_independent(&model)?;
		println!("context\tchi2\tdf\tp-value\tdependent");
		for (context, test) in &results {
			println!("{context:?}\t{:.3}\t{}\t{:.3e}\t{}", test.statistic, test.degrees_of_freedom, test.p_value, test.rejects(args.significance));
		}
		info!("tested {} contexts", results.len());
		return Ok(());
	};

	let uniform = statistics::is_uniform(&model, &context)?;
	println!("uniform: chi2 {:.3}, df {}, p {:.3e}, rejected: {}", uniform.statistic, uniform.degrees_of_freedom, uniform.p_value, uniform.rejects(args.significance));
	if !context.is_empty() {
		let independent = statistics::is_independent(&model, &context)?;
		println!("independent: chi2 {:.3}, df {}, p {:.3e}, rejected: {}", independent.statistic, independent.degrees_of_freedom, independent.p_value, independent.rejects(args.significance));
	}
	Ok(())
}

/// Returns the argument text, or the whole of stdin when absent.
fn read_text(text: Option<String>) -> io::Result<String> {
	match text {
		Some(text) => Ok(text),
		None => {
			let mut buffer = String::new();
			io::stdin().read_to_string(&mut buffer)?;
			Ok(buffer)
		}
	}
}

fn join_ranks(ranks: &[usize]) -> String {
	ranks.iter().map(|rank| rank.to_string()).collect::<Vec<_>>().join(" ")
}

/// Parses ranks from arguments, or from stdin when there are none.
fn parse_ranks(args: &[String]) -> Result<Vec<usize>, Box<dyn std::error::Error>> {
	let input = if args.is_empty() { read_text(None)? } else { args.join(" ") };
	let ranks = input
		.split(|c: char| c == ',' || c.is_whitespace())
		.filter(|token| !token.is_empty())
		.map(str::parse::<usize>)
		.collect::<Result<Vec<_>, _>>()?;
	Ok(ranks)
}
