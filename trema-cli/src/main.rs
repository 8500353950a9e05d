use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trema::CsvOptions;
use trema_cli::{
    AnalyzeContext, load_analysis, print_report, run_export, run_import,
    validation::parse_separator,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,

    /// Log what the analyzer decides for every key (to stderr)
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Options for reading a translator's CSV file against a database.
#[derive(ClapArgs, Debug)]
struct InputArgs {
    /// The database JSON snapshot
    #[arg(long)]
    db: String,

    /// The CSV file to import
    #[arg(short, long)]
    input: String,

    /// CSV field separator
    #[arg(long, default_value = ";")]
    separator: String,

    /// Encoding of the CSV file (e.g. utf-8, windows-1252)
    #[arg(long)]
    encoding: Option<String>,

    /// Keep the database master text when the file carries a different one
    #[arg(long)]
    keep_db_master: bool,
}

impl InputArgs {
    fn context(&self) -> Result<AnalyzeContext, String> {
        let mut csv = CsvOptions::new().with_separator(parse_separator(&self.separator)?);
        if let Some(encoding) = &self.encoding {
            csv = csv.with_encoding(encoding);
        }
        Ok(AnalyzeContext {
            db: self.db.clone(),
            input: self.input.clone(),
            csv,
            keep_db_master: self.keep_db_master,
        })
    }
}

/// Supported subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the changes a CSV file would make to the database.
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply the accepted changes of a CSV file and write the database.
    Import {
        #[command(flatten)]
        input: InputArgs,

        /// Where to write the updated database
        #[arg(short, long)]
        output: String,

        /// Also apply conflicting changes that are accepted by default
        #[arg(long)]
        include_conflicting: bool,
    },

    /// Export one language of the database as CSV.
    Export {
        /// The database JSON snapshot
        #[arg(long)]
        db: String,

        /// The language to export
        #[arg(short, long)]
        lang: String,

        /// The CSV file to write
        #[arg(short, long)]
        output: String,

        /// Only export values with these statuses (comma separated)
        #[arg(long)]
        status: Option<String>,

        /// CSV field separator
        #[arg(long, default_value = ";")]
        separator: String,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "trema=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(commands: Commands) -> Result<(), String> {
    match commands {
        Commands::Analyze { input, json } => {
            let (_, analysis) = load_analysis(&input.context()?)?;
            print_report(&analysis, json)
        }
        Commands::Import {
            input,
            output,
            include_conflicting,
        } => {
            let applied = run_import(&input.context()?, &output, include_conflicting)?;
            info!(applied, output = output.as_str(), "database written");
            println!("Applied {} changes, wrote {}", applied, output);
            Ok(())
        }
        Commands::Export {
            db,
            lang,
            output,
            status,
            separator,
        } => {
            let options = CsvOptions::new().with_separator(parse_separator(&separator)?);
            let rows = run_export(&db, &lang, &output, status.as_deref(), &options)?;
            println!("Exported {} values for {} to {}", rows, lang, output);
            Ok(())
        }
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(args.commands) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
