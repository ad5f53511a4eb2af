use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::experiments::NaturalExperiment;
use crate::parser::NewickParser;
use crate::tree::Tree;

const SPECIES_COLUMN: &str = "Species";
const TOTAL_COLUMN: &str = "Total";

const RESULTS_HEADER: [&str; 6] = [
    "SpeciesA",
    "RateA",
    "SpeciesB",
    "RateB",
    "Difference",
    "Divergence(MYA)",
];

fn is_gz(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

fn open_text<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let p = path.as_ref();
    let file = File::open(p).map_err(|source| Error::Read {
        path: p.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn Read> = if is_gz(p) {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// First non-empty line of `text`, trimmed. The `;` terminator is left for
/// the parser to remove.
pub fn first_tree_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

/// Read the first non-empty line of a tree file (gzip-compressed if the
/// path ends in `.gz`), trimmed like [`first_tree_line`].
pub fn read_tree_line<P: AsRef<Path>>(path: P) -> Result<String> {
    let p = path.as_ref();
    let reader = open_text(p)?;
    for line in reader.lines() {
        let line = line.map_err(|source| Error::Read {
            path: p.to_path_buf(),
            source,
        })?;
        if let Some(tree) = first_tree_line(&line) {
            return Ok(tree.to_string());
        }
    }
    Err(Error::NoTree(p.to_path_buf()))
}

/// Parse the first tree found in `text`.
pub fn tree_from_str(text: &str) -> Result<Tree> {
    let line = first_tree_line(text).unwrap_or_default();
    Ok(NewickParser::new().parse(line)?)
}

/// Read and parse the single tree stored in `path`.
pub fn load_tree<P: AsRef<Path>>(path: P) -> Result<Tree> {
    let line = read_tree_line(&path)?;
    debug!(path = ?path.as_ref(), bytes = line.len(), "read tree line");
    Ok(NewickParser::new().parse(&line)?)
}

/// Which incidence column of the rate table to compare.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum RateColumn {
    #[default]
    Neoplasia,
    Malignancy,
}

impl RateColumn {
    pub fn header(self) -> &'static str {
        match self {
            RateColumn::Neoplasia => "NeoplasiaRate",
            RateColumn::Malignancy => "MalignancyRate",
        }
    }
}

/// One species' cancer incidence, keyed by the name used in the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct CancerRate {
    pub name: String,
    pub rate: f64,
    /// Number of records the rate was computed from, when the table has it.
    pub total: Option<u32>,
}

impl CancerRate {
    /// Spaces in `name` become underscores so that "Canis lupus" matches the
    /// tree label `Canis_lupus`.
    pub fn new(name: &str, rate: f64, total: Option<u32>) -> Self {
        CancerRate {
            name: name.trim().replace(' ', "_"),
            rate,
            total,
        }
    }
}

/// Split one table row. Delimiters inside double quotes belong to the field.
fn split_fields(line: &str, delimiter: char) -> Vec<&str> {
    fn clean(field: &str) -> &str {
        field.trim().trim_matches('"').trim()
    }

    let mut fields = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (pos, c) in line.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == delimiter && !quoted {
            fields.push(clean(&line[start..pos]));
            start = pos + c.len_utf8();
        }
    }
    fields.push(clean(&line[start..]));
    fields
}

fn column_index(header: &[&str], column: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| *h == column)
        .ok_or_else(|| Error::MissingColumn {
            column: column.to_string(),
        })
}

/// Parse a rate table held in memory.
///
/// The first non-empty line is the header. Fields are tab-separated when the
/// header contains a tab, comma-separated otherwise. Rows without a species
/// or with a non-numeric rate are skipped.
pub fn parse_cancer_rates(content: &str, column: RateColumn) -> Result<Vec<CancerRate>> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());
    let header_line = lines.next().ok_or(Error::EmptyTable)?;
    let delimiter = if header_line.contains('\t') { '\t' } else { ',' };
    let header = split_fields(header_line, delimiter);

    let species_idx = column_index(&header, SPECIES_COLUMN)?;
    let rate_idx = column_index(&header, column.header())?;
    let total_idx = header.iter().position(|h| *h == TOTAL_COLUMN);

    let mut skipped = 0usize;
    let rates = lines
        .filter_map(|line| {
            let fields = split_fields(line, delimiter);
            let species = fields.get(species_idx).filter(|s| !s.is_empty());
            let rate = fields.get(rate_idx).and_then(|r| r.parse::<f64>().ok());
            match (species, rate) {
                (Some(species), Some(rate)) if rate.is_finite() => {
                    let total = total_idx
                        .and_then(|idx| fields.get(idx))
                        .and_then(|t| t.parse::<u32>().ok());
                    Some(CancerRate::new(species, rate, total))
                }
                _ => {
                    skipped += 1;
                    debug!(line, "skipping rate row");
                    None
                }
            }
        })
        .collect::<Vec<_>>();

    if skipped > 0 {
        warn!(skipped, column = column.header(), "rows without a usable rate were skipped");
    }
    Ok(rates)
}

/// Read the cancer rate table at `path` (gzip-compressed if it ends in `.gz`).
pub fn read_cancer_rates<P: AsRef<Path>>(path: P, column: RateColumn) -> Result<Vec<CancerRate>> {
    let p = path.as_ref();
    let mut content = String::new();
    open_text(p)?
        .read_to_string(&mut content)
        .map_err(|source| Error::Read {
            path: p.to_path_buf(),
            source,
        })?;
    parse_cancer_rates(&content, column)
}

/// Write the results table as CSV.
///
/// `None` or `-` writes to stdout. A path ending in `.gz` is gzip-compressed.
pub fn write_results_csv(path: Option<&Path>, results: &[NaturalExperiment]) -> Result<()> {
    let target = match path {
        Some(p) if p.as_os_str() != "-" => Some(p.to_path_buf()),
        _ => None,
    };
    let label = target
        .as_ref()
        .map_or_else(|| "stdout".to_string(), |p| p.display().to_string());

    write_results(target, results).map_err(|source| Error::Write {
        target: label,
        source,
    })
}

fn write_results(target: Option<PathBuf>, results: &[NaturalExperiment]) -> io::Result<()> {
    let mut out: Box<dyn Write> = match target {
        None => Box::new(BufWriter::new(io::stdout().lock())),
        Some(p) if is_gz(&p) => {
            let enc = GzEncoder::new(File::create(&p)?, Compression::default());
            Box::new(BufWriter::new(enc))
        }
        Some(p) => Box::new(BufWriter::new(File::create(&p)?)),
    };

    writeln!(&mut out, "{}", RESULTS_HEADER.iter().join(","))?;
    for row in results {
        writeln!(
            &mut out,
            "{},{},{},{},{},{}",
            row.species_a, row.rate_a, row.species_b, row.rate_b, row.difference, row.divergence
        )?;
    }

    out.flush()?;
    Ok(())
}
