use std::{
    fmt,
    io::{self, BufRead},
    num::ParseIntError,
    str::Utf8Error,
};

use thiserror::Error;

/// Variant ids longer than this mark the whole file as corrupt.
pub const MAX_VARIANT_ID_LEN: usize = 20;

/// A single normalized genotype observation from a direct-to-consumer export.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub variant_id: String,
    /// `0` for formats that carry no chromosome column.
    pub chromosome: u8,
    pub position: u64,
    pub genotype: String,
}

impl Record {
    fn new(variant_id: &str, chromosome: u8, position: u64, genotype: &str) -> Self {
        Self {
            variant_id: variant_id.to_uppercase(),
            chromosome,
            position,
            genotype: genotype.to_uppercase(),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.variant_id, self.chromosome, self.position, self.genotype
        )
    }
}

/// The vendor layouts understood by the parser, in dispatch order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// `rsid<TAB>chromosome<TAB>position<TAB>genotype`
    #[serde(rename = "23andme")]
    TwentyThreeAndMe,
    /// Quoted CSV, five-column tab with split alleles, or four-column space form.
    Illumina,
    /// `rsid<TAB>genotype`, no chromosome or position.
    Iyg,
    /// `Name,Variation,Chromosome,Position,Strand,YourCode`
    DecodeMe,
}

impl Format {
    pub const ALL: [Format; 4] = [
        Format::TwentyThreeAndMe,
        Format::Illumina,
        Format::Iyg,
        Format::DecodeMe,
    ];

    /// File-name suffix that selects this format (the `*` of the glob is implied).
    pub fn suffix(self) -> &'static str {
        match self {
            Format::TwentyThreeAndMe => "23andme.txt",
            Format::Illumina => "illumina.txt",
            Format::Iyg => "IYG.txt",
            Format::DecodeMe => "decodeme.txt",
        }
    }

    /// Short label used when summarizing files by type.
    pub fn label(self) -> &'static str {
        match self {
            Format::TwentyThreeAndMe => "23andme",
            Format::Illumina => "illumina",
            Format::Iyg => "iyg",
            Format::DecodeMe => "decodeme",
        }
    }

    /// Pick the parser for a file name. A trailing `.gz` or `.zip` is ignored so
    /// compressed exports dispatch like their plain counterparts.
    pub fn detect(file_name: &str) -> Option<Self> {
        let mut name = file_name;
        loop {
            if let Some(stripped) = name.strip_suffix(".gz") {
                name = stripped;
            } else if let Some(stripped) = name.strip_suffix(".zip") {
                name = stripped;
            } else {
                break;
            }
        }
        Self::ALL
            .into_iter()
            .find(|format| name.ends_with(format.suffix()))
    }

    /// Parse one non-comment line. Malformed input is an ordinary `Err`, never a panic.
    pub fn parse_line(self, line: &str) -> Result<Record, ParseErrorKind> {
        let line = line.trim();
        match self {
            Format::TwentyThreeAndMe => {
                let fields = split_fields(line, '\t', 4)?;
                build(fields[0], fields[1], fields[2], fields[3])
            }
            Format::Illumina => parse_illumina(line),
            Format::Iyg => {
                let fields = split_fields(line, '\t', 2)?;
                let (variant_id, genotype) = (strip_quotes(fields[0]), strip_quotes(fields[1]));
                check_variant_id(variant_id)?;
                require(genotype, "genotype")?;
                Ok(Record::new(variant_id, 0, 0, genotype))
            }
            Format::DecodeMe => {
                let fields = split_fields(line, ',', 6)?;
                build(fields[0], fields[2], fields[3], fields[5])
            }
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn parse_illumina(line: &str) -> Result<Record, ParseErrorKind> {
    if line.starts_with('"') {
        // "rs3094315","1","742429","AA"
        let fields: Vec<&str> = line.split(',').map(|f| strip_quotes(f.trim())).collect();
        if fields.len() != 4 {
            return Err(ParseErrorKind::FieldCount {
                expected: 4,
                found: fields.len(),
            });
        }
        return build(fields[0], fields[1], fields[2], fields[3]);
    }

    let tabbed: Vec<&str> = line.split('\t').map(str::trim).collect();
    if tabbed.len() == 5 {
        // rs4477212<TAB>1<TAB>82154<TAB>T<TAB>T
        let genotype = format!("{}{}", tabbed[3], tabbed[4]);
        return build(tabbed[0], tabbed[1], tabbed[2], &genotype);
    }

    // rs11240777 1 788822 AA
    let fields = split_fields(line, ' ', 4)?;
    build(fields[0], fields[1], fields[2], fields[3])
}

fn split_fields(line: &str, separator: char, expected: usize) -> Result<Vec<&str>, ParseErrorKind> {
    let fields: Vec<&str> = line.split(separator).map(str::trim).collect();
    if fields.len() == expected {
        Ok(fields)
    } else {
        Err(ParseErrorKind::FieldCount {
            expected,
            found: fields.len(),
        })
    }
}

fn build(
    variant_id: &str,
    chromosome: &str,
    position: &str,
    genotype: &str,
) -> Result<Record, ParseErrorKind> {
    check_variant_id(variant_id)?;
    let chromosome = chromosome
        .parse::<u8>()
        .map_err(ParseErrorKind::InvalidChromosome)?;
    let position = position
        .parse::<u64>()
        .map_err(ParseErrorKind::InvalidPosition)?;
    require(genotype, "genotype")?;
    Ok(Record::new(variant_id, chromosome, position, genotype))
}

fn check_variant_id(variant_id: &str) -> Result<(), ParseErrorKind> {
    require(variant_id, "variant id")?;
    let len = variant_id.chars().count();
    if len > MAX_VARIANT_ID_LEN {
        return Err(ParseErrorKind::VariantIdTooLong(len));
    }
    Ok(())
}

fn require(value: &str, field: &'static str) -> Result<(), ParseErrorKind> {
    if value.is_empty() {
        Err(ParseErrorKind::MissingField(field))
    } else {
        Ok(())
    }
}

fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

/// A line that could not be turned into a [`Record`].
#[derive(Debug, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    pub line: u64,
    pub raw: String,
    #[source]
    pub kind: ParseErrorKind,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("invalid chromosome: {0}")]
    InvalidChromosome(ParseIntError),
    #[error("invalid position: {0}")]
    InvalidPosition(ParseIntError),
    #[error("missing {0} field")]
    MissingField(&'static str),
    #[error("variant id is {0} characters long, more than {MAX_VARIANT_ID_LEN}")]
    VariantIdTooLong(usize),
    #[error("line is not valid UTF-8: {0}")]
    InvalidUtf8(Utf8Error),
}

impl ParseErrorKind {
    /// Corruption abandons the rest of the file rather than just the line.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, ParseErrorKind::VariantIdTooLong(_))
    }
}

/// Classification of one physical line.
#[derive(Debug)]
pub enum Line {
    Comment,
    Blank,
    Parsed(Record),
    Malformed(ParseError),
}

/// Streams the lines of a genotype export through one format's parser.
///
/// Lines are read as bytes; a line that is not UTF-8 is malformed, it does not
/// end the stream. Only I/O failures surface as `Err`.
pub struct Reader<R> {
    inner: R,
    format: Format,
    line: u64,
    buf: Vec<u8>,
}

impl<R> Reader<R>
where
    R: BufRead,
{
    pub fn new(inner: R, format: Format) -> Self {
        Self {
            inner,
            format,
            line: 0,
            buf: Vec::new(),
        }
    }

    /// Number of physical lines consumed so far, comments included.
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    fn malformed(&self, raw: String, kind: ParseErrorKind) -> Line {
        Line::Malformed(ParseError {
            line: self.line,
            raw,
            kind,
        })
    }
}

impl<R> Iterator for Reader<R>
where
    R: BufRead,
{
    type Item = io::Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.inner.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line += 1;
                let mut bytes = self.buf.as_slice();
                while let [rest @ .., b'\n' | b'\r'] = bytes {
                    bytes = rest;
                }
                if bytes.starts_with(b"#") {
                    return Some(Ok(Line::Comment));
                }

                let text = match std::str::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(e) => {
                        let raw = String::from_utf8_lossy(bytes).into_owned();
                        return Some(Ok(self.malformed(raw, ParseErrorKind::InvalidUtf8(e))));
                    }
                };
                if text.trim().is_empty() {
                    return Some(Ok(Line::Blank));
                }

                Some(Ok(match self.format.parse_line(text) {
                    Ok(record) => Line::Parsed(record),
                    Err(kind) => self.malformed(text.to_string(), kind),
                }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
