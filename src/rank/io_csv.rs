// Primitives for reading judgment files in CSV format.

use std::io::Read;

use csv::StringRecord;
use mfas_ranking::{Judgment, Outcome};

use crate::rank::{
    io_common::{InputFormat, IngestReport, LanguageFilter, SkipReason},
    *,
};

// Positions of the columns in the header of a file.
struct ColumnIndices {
    item: usize,
    judge: Option<usize>,
    candidate_a: usize,
    candidate_b: usize,
    outcome: usize,
    languages: Option<(usize, usize)>,
}

/// Reads all the judgments of a file.
///
/// Rows that cannot be understood are skipped and counted in the report. Only a
/// missing column in the header (or an unreadable header) is an error.
pub fn read_judgments<R: Read>(
    reader: R,
    format: InputFormat,
    languages: &LanguageFilter,
) -> RankResult<IngestReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let header = rdr.headers().context(CsvHeaderSnafu {})?.clone();
    debug!("read_judgments: header: {:?}", header);
    let indices = find_columns(&header, format)?;

    let mut report = IngestReport::default();
    for (idx, line_r) in rdr.records().enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        report.rows_read += 1;
        let line = match line_r {
            Ok(l) => l,
            Err(e) => {
                warn!("read_judgments: line {}: cannot read line: {}", lineno, e);
                report.add_skipped(SkipReason::UnreadableLine);
                continue;
            }
        };

        if let Some((src_idx, tgt_idx)) = indices.languages {
            if languages.is_active() {
                let src = line.get(src_idx).unwrap_or("");
                let tgt = line.get(tgt_idx).unwrap_or("");
                if !languages.accepts(src, tgt) {
                    report.rows_filtered += 1;
                    continue;
                }
            }
        }

        match parse_judgment(&line, &header, &indices) {
            Ok(judgment) => {
                debug!("read_judgments: line {}: {:?}", lineno, judgment);
                report.add_judgment(judgment);
            }
            Err(reason) => {
                warn!(
                    "read_judgments: line {}: skipping row {:?}: {}",
                    lineno, line, reason
                );
                report.add_skipped(reason);
            }
        }
    }

    info!(
        "read_judgments: {} rows, {} judgments over {} items, {} filtered, {} skipped",
        report.rows_read,
        report.num_judgments(),
        report.judgments_by_item.len(),
        report.rows_filtered,
        report.rows_skipped()
    );
    Ok(report)
}

fn find_columns(header: &StringRecord, format: InputFormat) -> RankResult<ColumnIndices> {
    let columns = format.columns();
    let find = |name: &str| -> RankResult<usize> {
        header
            .iter()
            .position(|h| h == name)
            .context(MissingColumnSnafu {
                column: name.to_string(),
                format: format.name().to_string(),
            })
    };
    let judge = if columns.judge_required {
        Some(find(columns.judge)?)
    } else {
        header.iter().position(|h| h == columns.judge)
    };
    let languages = match columns.languages {
        Some((src, tgt)) => Some((find(src)?, find(tgt)?)),
        None => None,
    };
    Ok(ColumnIndices {
        item: find(columns.item)?,
        judge,
        candidate_a: find(columns.candidate_a)?,
        candidate_b: find(columns.candidate_b)?,
        outcome: find(columns.outcome)?,
        languages,
    })
}

fn parse_judgment(
    line: &StringRecord,
    header: &StringRecord,
    indices: &ColumnIndices,
) -> Result<Judgment, SkipReason> {
    let field = |idx: usize| get_field(line, header, idx);

    let item_id = field(indices.item)?
        .parse::<u64>()
        .map_err(|_| SkipReason::InvalidItemId)?;
    let judge_id = match indices.judge {
        Some(idx) => field(idx)?.to_string(),
        None => String::new(),
    };
    let candidate_a = field(indices.candidate_a)?;
    let candidate_b = field(indices.candidate_b)?;
    let outcome = Outcome::parse(field(indices.outcome)?).map_err(|_| SkipReason::InvalidOutcome)?;

    if candidate_a.is_empty() || candidate_b.is_empty() {
        return Err(SkipReason::EmptyCandidate);
    }
    if candidate_a == candidate_b {
        return Err(SkipReason::SelfComparison);
    }

    Ok(Judgment {
        item_id,
        judge_id,
        candidate_a: candidate_a.to_string(),
        candidate_b: candidate_b.to_string(),
        outcome,
    })
}

fn get_field<'a>(
    line: &'a StringRecord,
    header: &StringRecord,
    idx: usize,
) -> Result<&'a str, SkipReason> {
    line.get(idx)
        .ok_or_else(|| SkipReason::MissingField(header.get(idx).unwrap_or("").to_string()))
}
