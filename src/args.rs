use clap::Parser;

/// Ranks the candidates of each item of a human evaluation from pairwise judgments.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, '-' or empty) The file containing the pairwise judgments, or '-' for the standard input.
    /// Setting this option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path, optional) A configuration file in JSON format. See the manual for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (default wmt) The type of the input: 'wmt' or 'ans2csv'.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (ans2csv only) Only keep the judgments with this source language.
    #[clap(long, value_parser)]
    pub src_lang: Option<String>,

    /// (ans2csv only) Only keep the judgments with this target language.
    #[clap(long, value_parser)]
    pub tgt_lang: Option<String>,

    /// (default candidateOrder) How to choose between rankings that are equally good:
    /// 'candidateOrder' or 'random'.
    #[clap(long, value_parser)]
    pub tiebreak: Option<String>,

    /// (number) The seed of the 'random' tiebreak mode.
    #[clap(long, value_parser)]
    pub seed: Option<String>,

    /// (default 20) Items with more candidates are not ranked.
    #[clap(long, value_parser)]
    pub max_candidates: Option<usize>,

    /// (milliseconds, optional) Time budget to rank a single item.
    #[clap(long, value_parser)]
    pub item_timeout_ms: Option<u64>,

    /// (default: number of CPUs) The number of items ranked in parallel.
    #[clap(short, long, value_parser)]
    pub workers: Option<usize>,

    /// (file path, 'stdout' or empty) Where to write the ranking in CSV format. Defaults to the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, optional) If specified, the summary of the run will be written in JSON format to the given location.
    #[clap(long, value_parser)]
    pub summary: Option<String>,

    /// (file path, optional) A reference ranking in CSV format. If provided, wmtrank will
    /// check that the produced ranking matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard error.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
