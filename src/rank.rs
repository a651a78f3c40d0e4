use log::{debug, error, info, warn};

use mfas_ranking::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use text_diff::print_diff;

use crate::args::Args;
use crate::rank::config_reader::*;
use crate::rank::io_common::*;

mod config_reader;
mod io_common;
mod io_csv;

#[derive(Debug, Snafu)]
pub enum RankError {
    #[snafu(display("Error opening file {path}"))]
    OpeningInput { source: io::Error, path: String },
    #[snafu(display("Error reading the header of the input"))]
    CsvHeader { source: csv::Error },
    #[snafu(display("Column {column} is required by the {format} format but is missing"))]
    MissingColumn { column: String, format: String },
    #[snafu(display("Error opening configuration file {path}"))]
    OpeningJson { source: io::Error, path: String },
    #[snafu(display("Error parsing configuration"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error serializing the ranking"))]
    WritingCsv { source: csv::Error },
    #[snafu(display("Error writing to {path}"))]
    WritingOutput { source: io::Error, path: String },
    #[snafu(display("Error serializing the summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error starting the worker pool"))]
    WorkerPool { source: rayon::ThreadPoolBuildError },
    #[snafu(display("The ranking differs from the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RankResult<T> = Result<T, RankError>;

/// Everything needed for one run, after merging the command line and the configuration file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RunSettings {
    /// A path, or None for the standard input.
    pub input: Option<String>,
    pub format: InputFormat,
    pub languages: LanguageFilter,
    pub rules: RankingRules,
    /// None uses one worker per CPU.
    pub workers: Option<usize>,
    /// A path, or None for the standard output.
    pub output: Option<String>,
    pub summary: Option<String>,
    pub reference: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct FailedItem {
    #[serde(rename = "itemId")]
    pub item_id: u64,
    pub error: String,
}

/// What happened during a run.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct RunSummary {
    #[serde(rename = "rowsRead")]
    pub rows_read: u64,
    #[serde(rename = "rowsFiltered")]
    pub rows_filtered: u64,
    #[serde(rename = "rowsSkipped")]
    pub rows_skipped: u64,
    #[serde(rename = "skippedByReason")]
    pub skipped_by_reason: BTreeMap<String, u64>,
    pub judgments: u64,
    #[serde(rename = "itemsRanked")]
    pub items_ranked: u64,
    #[serde(rename = "itemsFailed")]
    pub items_failed: Vec<FailedItem>,
}

impl RunSummary {
    fn new(report: &IngestReport) -> RunSummary {
        RunSummary {
            rows_read: report.rows_read,
            rows_filtered: report.rows_filtered,
            rows_skipped: report.rows_skipped(),
            skipped_by_reason: report
                .skipped
                .iter()
                .map(|(reason, count)| (reason.to_string(), *count))
                .collect(),
            judgments: report.num_judgments() as u64,
            items_ranked: 0,
            items_failed: Vec::new(),
        }
    }
}

fn validate_format(provider: Option<&str>) -> RankResult<InputFormat> {
    match provider {
        None | Some("wmt") => Ok(InputFormat::Wmt),
        Some("ans2csv") => Ok(InputFormat::Ans2Csv),
        Some(x) => whatever!("Input type {:?} not implemented", x),
    }
}

fn validate_rules(rules: &RulesSettings) -> RankResult<RankingRules> {
    let res = RankingRules {
        tiebreak_mode: match rules.tiebreak_mode.as_deref() {
            None | Some("candidateOrder") | Some("useCandidateOrder") => {
                TieBreakMode::UseCandidateOrder
            }
            Some("random") => {
                let seed = match rules.random_seed.clone().map(|s| s.parse::<u32>()) {
                    Some(Result::Ok(x)) => x,
                    x => {
                        whatever!(
                            "The random tiebreak mode requires a numeric seed, found {:?}",
                            x
                        )
                    }
                };
                TieBreakMode::Random(seed)
            }
            Some(x) => {
                whatever!("Cannot use tiebreak mode {:?} (not implemented)", x)
            }
        },
        max_candidates: match rules.max_candidates {
            None => RankingRules::DEFAULT_RULES.max_candidates,
            Some(x) if x > 0 && x <= MAX_SUPPORTED_CANDIDATES => x,
            Some(x) => {
                whatever!(
                    "maxCandidates must be between 1 and {}, found {}",
                    MAX_SUPPORTED_CANDIDATES,
                    x
                )
            }
        },
        time_limit: rules.item_timeout_ms.map(Duration::from_millis),
    };
    Ok(res)
}

/// Merges the command line arguments with the configuration file, if any.
/// The command line takes precedence.
pub fn settings_from_args(args: &Args) -> RankResult<RunSettings> {
    let config: RankConfig = match &args.config {
        Some(p) => read_config(p)?,
        None => RankConfig::default(),
    };
    info!("config: {:?}", config);

    let rules_settings = RulesSettings {
        tiebreak_mode: args.tiebreak.clone().or(config.rules.tiebreak_mode),
        random_seed: args.seed.clone().or(config.rules.random_seed),
        max_candidates: args.max_candidates.or(config.rules.max_candidates),
        item_timeout_ms: args.item_timeout_ms.or(config.rules.item_timeout_ms),
    };
    let rules = validate_rules(&rules_settings)?;

    let format = validate_format(
        args.input_type
            .as_deref()
            .or(config.input.provider.as_deref()),
    )?;
    let languages = LanguageFilter {
        source: args.src_lang.clone().or(config.input.source_language),
        target: args.tgt_lang.clone().or(config.input.target_language),
    };
    if languages.is_active() && format.columns().languages.is_none() {
        whatever!(
            "The {} format has no language columns, cannot filter by language",
            format.name()
        );
    }

    let workers = args.workers.or(config.workers);
    if workers == Some(0) {
        whatever!("The number of workers must be positive");
    }

    let input = match args.input.clone().or(config.input.file_path) {
        Some(p) if p == "-" => None,
        x => x,
    };
    if input.is_none() && args.config.is_none() && args.input.is_none() {
        info!("No input file given, reading from the standard input");
    }
    let output = match args.out.clone().or(config.output_file) {
        Some(p) if p == "-" || p == "stdout" => None,
        x => x,
    };

    Ok(RunSettings {
        input,
        format,
        languages,
        rules,
        workers,
        output,
        summary: args.summary.clone(),
        reference: args.reference.clone(),
    })
}

/// Ranks every item on a pool of workers. The results are sorted by item id,
/// whatever the order in which the workers finished.
fn rank_all_items(
    judgments_by_item: &BTreeMap<u64, Vec<Judgment>>,
    rules: &RankingRules,
    workers: Option<usize>,
) -> RankResult<Vec<(u64, Result<Vec<RankedRow>, RankingErrors>)>> {
    let mut pool_builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = workers {
        pool_builder = pool_builder.num_threads(n);
    }
    let pool = pool_builder.build().context(WorkerPoolSnafu {})?;
    info!(
        "Ranking {} items with {} workers",
        judgments_by_item.len(),
        pool.current_num_threads()
    );

    let items: Vec<(&u64, &Vec<Judgment>)> = judgments_by_item.iter().collect();
    let mut results: Vec<(u64, Result<Vec<RankedRow>, RankingErrors>)> = pool.install(|| {
        items
            .par_iter()
            .map(|(item_id, judgments)| (**item_id, rank_item(**item_id, judgments, rules)))
            .collect()
    });
    results.sort_by_key(|(item_id, _)| *item_id);
    Ok(results)
}

fn ranking_to_csv(rows: &[RankedRow]) -> RankResult<String> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    wtr.write_record(["item_id", "candidate_id", "rank"])
        .context(WritingCsvSnafu {})?;
    for r in rows.iter() {
        wtr.write_record(&[r.item_id.to_string(), r.candidate.clone(), r.rank.to_string()])
            .context(WritingCsvSnafu {})?;
    }
    wtr.flush().context(WritingOutputSnafu {
        path: "<buffer>".to_string(),
    })?;
    let bytes = wtr
        .into_inner()
        .map_err(|e| io::Error::new(e.error().kind(), e.error().to_string()))
        .context(WritingOutputSnafu {
            path: "<buffer>".to_string(),
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads the judgments, ranks all the items and returns the ranking in CSV format.
///
/// Rows that cannot be read and items that cannot be ranked are reported in the summary,
/// they do not stop the run.
pub fn rank_reader<R: Read>(reader: R, settings: &RunSettings) -> RankResult<(String, RunSummary)> {
    let report = io_csv::read_judgments(reader, settings.format, &settings.languages)?;
    let mut summary = RunSummary::new(&report);

    let results = rank_all_items(&report.judgments_by_item, &settings.rules, settings.workers)?;
    let mut rows: Vec<RankedRow> = Vec::new();
    for (item_id, res) in results {
        match res {
            Ok(item_rows) => {
                debug!("item {}: {:?}", item_id, item_rows);
                summary.items_ranked += 1;
                rows.extend(item_rows);
            }
            Err(e) => {
                error!("item {}: ranking failed, the item is left out: {}", item_id, e);
                summary.items_failed.push(FailedItem {
                    item_id,
                    error: e.to_string(),
                });
            }
        }
    }
    Ok((ranking_to_csv(&rows)?, summary))
}

fn print_summary(summary: &RunSummary) {
    info!("summary: {:?}", summary);
    eprintln!(
        "Read: {} rows, {} filtered, {} skipped",
        summary.rows_read, summary.rows_filtered, summary.rows_skipped
    );
    for (reason, count) in summary.skipped_by_reason.iter() {
        eprintln!("  skipped ({}): {}", reason, count);
    }
    eprintln!(
        "Ranked: {} items from {} judgments, {} failed",
        summary.items_ranked,
        summary.judgments,
        summary.items_failed.len()
    );
    for f in summary.items_failed.iter() {
        eprintln!("  failed item {}: {}", f.item_id, f.error);
    }
}

fn check_reference(reference_path: &str, ranking: &str) -> RankResult<()> {
    let reference = fs::read_to_string(reference_path).context(OpeningInputSnafu {
        path: reference_path.to_string(),
    })?;
    if reference != ranking {
        warn!("Found differences with the reference ranking");
        print_diff(reference.as_str(), ranking, "\n");
        return ReferenceMismatchSnafu {
            path: reference_path.to_string(),
        }
        .fail();
    }
    info!("The ranking matches the reference {}", reference_path);
    Ok(())
}

pub fn run_ranking(settings: &RunSettings) -> RankResult<RunSummary> {
    let (ranking, summary) = match &settings.input {
        Some(path) => {
            info!(
                "Attempting to read judgment file {:?} ({})",
                path,
                simplify_file_name(path)
            );
            let file = fs::File::open(path).context(OpeningInputSnafu { path: path.clone() })?;
            rank_reader(io::BufReader::new(file), settings)?
        }
        None => rank_reader(io::stdin().lock(), settings)?,
    };

    match &settings.output {
        Some(path) => {
            fs::write(path, ranking.as_bytes()).context(WritingOutputSnafu { path: path.clone() })?
        }
        None => io::stdout()
            .lock()
            .write_all(ranking.as_bytes())
            .context(WritingOutputSnafu {
                path: "stdout".to_string(),
            })?,
    }

    print_summary(&summary);
    if let Some(path) = &settings.summary {
        let pretty = serde_json::to_string_pretty(&summary).context(WritingJsonSnafu {})?;
        fs::write(path, pretty).context(WritingOutputSnafu { path: path.clone() })?;
    }

    if let Some(reference_path) = &settings.reference {
        check_reference(reference_path, &ranking)?;
    }
    Ok(summary)
}

pub fn run(args: &Args) -> RankResult<()> {
    let settings = settings_from_args(args)?;
    info!("settings: {:?}", settings);
    run_ranking(&settings)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(format: InputFormat) -> RunSettings {
        RunSettings {
            input: None,
            format,
            languages: LanguageFilter::default(),
            rules: RankingRules::DEFAULT_RULES,
            workers: Some(3),
            output: None,
            summary: None,
            reference: None,
        }
    }

    fn args() -> Args {
        Args {
            input: None,
            config: None,
            input_type: None,
            src_lang: None,
            tgt_lang: None,
            tiebreak: None,
            seed: None,
            max_candidates: None,
            item_timeout_ms: None,
            workers: None,
            out: None,
            summary: None,
            reference: None,
            verbose: false,
        }
    }

    const WMT_DATA: &str = "segmentId,judgeId,system1,system2,cmp\n\
                            7,J1,sysX,sysY,<\n\
                            7,J2,sysX,sysY,<\n\
                            7,J1,sysY,sysZ,<\n";

    #[test]
    fn end_to_end() {
        let (out, summary) = rank_reader(WMT_DATA.as_bytes(), &settings(InputFormat::Wmt)).unwrap();
        assert_eq!(
            out,
            "item_id,candidate_id,rank\n7,sysX,1\n7,sysY,2\n7,sysZ,3\n"
        );
        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.judgments, 3);
        assert_eq!(summary.items_ranked, 1);
        assert!(summary.items_failed.is_empty());
    }

    #[test]
    fn items_sorted_and_output_stable() {
        let mut data = "segmentId,judgeId,system1,system2,cmp\n".to_string();
        for item in [12, 3, 40, 7, 1, 25, 9, 18] {
            data.push_str(&format!("{},J1,b,a,1\n", item));
            data.push_str(&format!("{},J2,c,b,=\n", item));
            data.push_str(&format!("{},J3,a,c,2\n", item));
            data.push_str(&format!("{},J3,c,d,>\n", item));
        }
        let s = settings(InputFormat::Wmt);
        let (out1, _) = rank_reader(data.as_bytes(), &s).unwrap();
        let (out2, _) = rank_reader(data.as_bytes(), &s).unwrap();
        assert_eq!(out1, out2);

        let items: Vec<u64> = out1
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap().parse::<u64>().unwrap())
            .collect();
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(items, sorted);
        assert_eq!(items.len(), 8 * 4);
    }

    #[test]
    fn failed_item_left_out() {
        let mut data = "segmentId,judgeId,system1,system2,cmp\n".to_string();
        data.push_str("1,J1,A,B,<\n");
        for i in 0..4 {
            data.push_str(&format!("2,J1,s{},s{},<\n", i, i + 1));
        }
        let mut s = settings(InputFormat::Wmt);
        s.rules.max_candidates = 3;
        let (out, summary) = rank_reader(data.as_bytes(), &s).unwrap();
        assert_eq!(out, "item_id,candidate_id,rank\n1,A,1\n1,B,2\n");
        assert_eq!(summary.items_ranked, 1);
        assert_eq!(summary.items_failed.len(), 1);
        assert_eq!(summary.items_failed[0].item_id, 2);
    }

    #[test]
    fn malformed_rows_do_not_fail_the_run() {
        let data = "segmentId,judgeId,system1,system2,cmp\n\
                    7,J1,sysX,sysY,<\n\
                    seven,J1,sysX,sysY,<\n\
                    7,J1,sysY,sysZ,?\n";
        let (out, summary) = rank_reader(data.as_bytes(), &settings(InputFormat::Wmt)).unwrap();
        assert_eq!(out, "item_id,candidate_id,rank\n7,sysX,1\n7,sysY,2\n");
        assert_eq!(summary.rows_skipped, 2);
        assert_eq!(summary.skipped_by_reason.get("invalid item id"), Some(&1));
        assert_eq!(summary.skipped_by_reason.get("invalid outcome"), Some(&1));
    }

    #[test]
    fn empty_input_has_header() {
        let data = "segmentId,judgeId,system1,system2,cmp\n";
        let (out, summary) = rank_reader(data.as_bytes(), &settings(InputFormat::Wmt)).unwrap();
        assert_eq!(out, "item_id,candidate_id,rank\n");
        assert_eq!(summary.items_ranked, 0);
    }

    #[test]
    fn ans2csv_end_to_end() {
        let data = "srclang,trglang,srcIndex,documentId,segmentId,judgeId,system1Number,system1Id,system2Number,system2Id,rank\n\
                    en,de,5,d1,1,J1,1,online-B,2,uedin,2\n\
                    en,de,5,d1,1,J2,1,online-B,2,uedin,2\n\
                    en,cs,5,d1,1,J2,1,online-B,2,uedin,1\n";
        let mut s = settings(InputFormat::Ans2Csv);
        s.languages = LanguageFilter {
            source: Some("en".to_string()),
            target: Some("de".to_string()),
        };
        let (out, summary) = rank_reader(data.as_bytes(), &s).unwrap();
        assert_eq!(out, "item_id,candidate_id,rank\n5,uedin,1\n5,online-B,2\n");
        assert_eq!(summary.rows_filtered, 1);
    }

    #[test]
    fn summary_json() {
        let (_, summary) = rank_reader(WMT_DATA.as_bytes(), &settings(InputFormat::Wmt)).unwrap();
        let js = serde_json::to_value(&summary).unwrap();
        assert_eq!(js["rowsRead"], 3);
        assert_eq!(js["itemsRanked"], 1);
        assert!(js["itemsFailed"].as_array().unwrap().is_empty());
    }

    // A fresh directory for the files of one test.
    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("wmtrank-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn file_settings(dir: &Path) -> RunSettings {
        let input = dir.join("judgments.csv");
        fs::write(&input, WMT_DATA).unwrap();
        RunSettings {
            input: Some(input.display().to_string()),
            output: Some(dir.join("ranking.csv").display().to_string()),
            summary: Some(dir.join("summary.json").display().to_string()),
            ..settings(InputFormat::Wmt)
        }
    }

    const WMT_RANKING: &str = "item_id,candidate_id,rank\n7,sysX,1\n7,sysY,2\n7,sysZ,3\n";

    #[test]
    fn run_writes_ranking_and_summary() {
        let dir = scratch_dir("summary");
        let s = file_settings(&dir);
        let summary = run_ranking(&s).unwrap();
        assert_eq!(summary.items_ranked, 1);
        assert_eq!(
            fs::read_to_string(dir.join("ranking.csv")).unwrap(),
            WMT_RANKING
        );

        let written = fs::read_to_string(dir.join("summary.json")).unwrap();
        assert!(written.contains('\n'));
        let js: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(js["rowsRead"], 3);
        assert_eq!(js["judgments"], 3);
        assert_eq!(js["itemsRanked"], 1);
        assert!(js["itemsFailed"].as_array().unwrap().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn run_matches_reference() {
        let dir = scratch_dir("reference-ok");
        let reference = dir.join("expected.csv");
        fs::write(&reference, WMT_RANKING).unwrap();
        let s = RunSettings {
            reference: Some(reference.display().to_string()),
            ..file_settings(&dir)
        };
        assert!(run_ranking(&s).is_ok());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn run_reports_reference_mismatch() {
        let dir = scratch_dir("reference-diff");
        let reference = dir.join("expected.csv");
        fs::write(
            &reference,
            "item_id,candidate_id,rank\n7,sysY,1\n7,sysX,2\n7,sysZ,3\n",
        )
        .unwrap();
        let s = RunSettings {
            reference: Some(reference.display().to_string()),
            ..file_settings(&dir)
        };
        let res = run_ranking(&s);
        assert!(matches!(res, Err(RankError::ReferenceMismatch { .. })));
        // The ranking and the summary are written before the comparison.
        assert_eq!(
            fs::read_to_string(dir.join("ranking.csv")).unwrap(),
            WMT_RANKING
        );
        assert!(dir.join("summary.json").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_reference_is_an_error() {
        let dir = scratch_dir("reference-missing");
        let res = check_reference(
            &dir.join("nope.csv").display().to_string(),
            WMT_RANKING,
        );
        assert!(matches!(res, Err(RankError::OpeningInput { .. })));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rules_validation() {
        let r = validate_rules(&RulesSettings::default()).unwrap();
        assert_eq!(r, RankingRules::DEFAULT_RULES);

        let r = validate_rules(&RulesSettings {
            tiebreak_mode: Some("random".to_string()),
            random_seed: Some("17".to_string()),
            max_candidates: Some(10),
            item_timeout_ms: Some(250),
        })
        .unwrap();
        assert_eq!(r.tiebreak_mode, TieBreakMode::Random(17));
        assert_eq!(r.max_candidates, 10);
        assert_eq!(r.time_limit, Some(Duration::from_millis(250)));

        assert!(validate_rules(&RulesSettings {
            tiebreak_mode: Some("random".to_string()),
            ..RulesSettings::default()
        })
        .is_err());
        assert!(validate_rules(&RulesSettings {
            tiebreak_mode: Some("coinFlip".to_string()),
            ..RulesSettings::default()
        })
        .is_err());
        assert!(validate_rules(&RulesSettings {
            max_candidates: Some(0),
            ..RulesSettings::default()
        })
        .is_err());
    }

    #[test]
    fn settings_merge() {
        let mut a = args();
        a.input = Some("-".to_string());
        a.input_type = Some("ans2csv".to_string());
        a.src_lang = Some("en".to_string());
        a.out = Some("stdout".to_string());
        a.workers = Some(2);
        let s = settings_from_args(&a).unwrap();
        assert_eq!(s.input, None);
        assert_eq!(s.output, None);
        assert_eq!(s.format, InputFormat::Ans2Csv);
        assert_eq!(s.languages.source, Some("en".to_string()));
        assert_eq!(s.workers, Some(2));
    }

    #[test]
    fn settings_reject_language_filter_on_wmt() {
        let mut a = args();
        a.tgt_lang = Some("de".to_string());
        assert!(settings_from_args(&a).is_err());
    }

    #[test]
    fn settings_reject_unknown_format() {
        let mut a = args();
        a.input_type = Some("xlsx".to_string());
        assert!(settings_from_args(&a).is_err());
    }
}
