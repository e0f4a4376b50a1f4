use clap::{Parser, Subcommand};

/// A voting compass: matches the answers of a respondent with the positions of the candidates.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, global = true, takes_value = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Reads the candidate survey export and writes the candidate dataset.
    Ingest {
        /// (file path) The JSON configuration of the compass.
        #[clap(short, long, value_parser)]
        config: String,
        /// (file path, optional) Where to write the dataset. Overrides the datasetPath
        /// of the configuration.
        #[clap(short, long, value_parser)]
        out: Option<String>,
    },
    /// Matches a respondent against all the candidates of the dataset.
    Evaluate {
        /// (file path) The JSON configuration of the compass.
        #[clap(short, long, value_parser)]
        config: String,
        /// (JSON array, or file path) The answers of the respondent, one number in [-1, 1]
        /// per statement. A file may also contain a request body {"answers": [...]}.
        #[clap(short, long, value_parser)]
        answers: String,
        /// (file path, 'stdout' or empty) Where to write the results in JSON format.
        #[clap(short, long, value_parser)]
        out: Option<String>,
        /// (file path) A reference file with the expected results in JSON format. If provided,
        /// the results must match it.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
        /// ('asc' or 'desc') If specified, prints the candidates ranked by compatibility.
        #[clap(long, value_parser)]
        sort: Option<String>,
        /// If passed, stores the results in the results directory and prints their id.
        #[clap(long, takes_value = false)]
        save: bool,
    },
    /// Prints results previously stored with `evaluate --save`.
    Show {
        /// (file path) The JSON configuration of the compass.
        #[clap(short, long, value_parser)]
        config: String,
        /// The id printed when the results were saved.
        #[clap(long, value_parser)]
        result_id: String,
    },
}
