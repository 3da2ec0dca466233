use clap::{Parser, Subcommand};
use std::path::PathBuf;

use brine_convgen::builtin::{drop_fields, time_to_int64, Rename, ReverseStruct, StripComments, StripTags};
use brine_convgen::{
    curry, derive, generate, load_struct_file, parse_signature, Compose, ConvertError, FieldExpressionKind,
    Function, MapFields, Pipeline, Struct, StructMapper,
};
use tracing::info;

mod logging;

#[derive(Parser)]
#[command(name = "bconv")]
#[command(about = "Derive record types and generate converter, comparer and friends for them", long_about = None)]
struct Cli {
    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a new struct from a JSON record description
    Derive {
        /// Input record `.json` file
        #[arg(short, long)]
        input: PathBuf,

        /// Name of the derived struct
        #[arg(long)]
        rename: Option<String>,

        /// Store `time.Time` fields as Unix nanoseconds
        #[arg(long)]
        time_to_int64: bool,

        /// Drop a field (repeatable)
        #[arg(long = "drop")]
        drop: Vec<String>,

        #[arg(long)]
        strip_tags: bool,

        #[arg(long)]
        strip_comments: bool,

        /// Also print the converter back to the input
        #[arg(long)]
        reverse: bool,

        /// Signature template for the converter from the input (e.g. `$FromTo$To($from $From) $To`)
        #[arg(long)]
        func: Option<String>,
    },

    /// Generate one function for a record (or a pair of records)
    Gen {
        /// Input record `.json` file
        #[arg(short, long)]
        input: PathBuf,

        /// Second record for binary kinds; defaults to the input
        #[arg(long)]
        other: Option<PathBuf>,

        /// converter, comparer, copier, orderer, zeroer or truther
        #[arg(short, long)]
        kind: FieldExpressionKind,

        /// Signature template; defaults to the kind's own
        #[arg(short, long)]
        signature: Option<String>,
    },

    /// Fix one argument of a function to a literal
    Curry {
        /// Signature of the function to wrap, e.g. `Lerp(a, b, t float64) float64`
        #[arg(long)]
        signature: String,

        /// Body of the function to wrap
        #[arg(long, default_value = "")]
        body: String,

        /// Zero-based index of the argument to fix
        #[arg(long)]
        index: usize,

        /// Literal the argument is fixed to
        #[arg(long)]
        value: String,

        /// Name of the wrapper; defaults to `{Name}With{Arg}`
        #[arg(long)]
        name: Option<String>,
    },
}

fn derive_pipeline(
    rename: Option<&str>,
    time_as_int64: bool,
    drop: &[String],
    strip_tags: bool,
    strip_comments: bool,
) -> Pipeline {
    let mut fields = Compose::new();
    if time_as_int64 {
        fields = fields.then(time_to_int64());
    }
    if !drop.is_empty() {
        let names: Vec<&str> = drop.iter().map(String::as_str).collect();
        fields = fields.then(drop_fields(&names));
    }

    let mut pipeline = Pipeline::new().then(MapFields(fields));
    if strip_tags {
        pipeline = pipeline.then(StripTags);
    }
    if strip_comments {
        pipeline = pipeline.then(StripComments);
    }
    if let Some(name) = rename {
        pipeline = pipeline.then(Rename::new(name));
    }
    pipeline
}

fn run(command: &Commands) -> Result<String, ConvertError> {
    match command {
        Commands::Derive {
            input,
            rename,
            time_to_int64: as_int64,
            drop,
            strip_tags,
            strip_comments,
            reverse,
            func,
        } => {
            let source = load_struct_file(input)?;
            let pipeline = derive_pipeline(rename.as_deref(), *as_int64, drop, *strip_tags, *strip_comments);
            let derived = derive(&source, &pipeline)?;
            info!(from = %source.name, to = %derived.name, "derived struct");

            let mut out = derived.to_string();
            if let Some(template) = func {
                let f = generate(FieldExpressionKind::Converter, Some(template), &[&derived, &source])?;
                out.push('\n');
                out.push_str(&f.to_string());
            }
            if *reverse {
                let back = ReverseStruct.map(derived.clone());
                let f = generate(FieldExpressionKind::Converter, None, &[&back, &derived])?;
                out.push('\n');
                out.push_str(&f.to_string());
            }
            Ok(out)
        }

        Commands::Gen { input, other, kind, signature } => {
            let record = load_struct_file(input)?;
            let other: Option<Struct> = other.as_ref().map(load_struct_file).transpose()?;
            let f = if kind.is_binary() {
                generate(*kind, signature.as_deref(), &[&record, other.as_ref().unwrap_or(&record)])?
            } else {
                generate(*kind, signature.as_deref(), &[&record])?
            };
            info!(%kind, function = %f.signature.name, "generated function");
            Ok(f.to_string())
        }

        Commands::Curry { signature, body, index, value, name } => {
            let inner = Function::new(parse_signature(signature)?, body);
            let mut f = curry(inner.clone(), *index, value)?;
            if let Some(name) = name {
                f.signature.comment = f.signature.comment.replacen(&f.signature.name, name, 1);
                f.signature.name = name.clone();
            }
            let mut out = String::new();
            if !inner.body.is_empty() {
                out.push_str(&inner.to_string());
                out.push('\n');
            }
            out.push_str(&f.to_string());
            Ok(out)
        }
    }
}

fn main() -> Result<(), ConvertError> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let out = run(&cli.command)?;
    print!("{}", out);
    Ok(())
}
