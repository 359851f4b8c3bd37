use crate::libs::error::LiveMapError;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

lazy_static! {
    static ref RE_LOCUS: Regex =
        Regex::new(r"^\s*(?P<chr>[^\s:]+):(?P<start>[\d,]+)-(?P<end>[\d,]+)\s*$").unwrap();
}

/// The genomic window under inspection. Immutable once built; a new window is
/// a new `Locus`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locus {
    pub chr: String,
    pub genomic_start: u64,
    pub genomic_end: u64,
}

impl Locus {
    pub fn new(chr: impl Into<String>, genomic_start: u64, genomic_end: u64) -> Self {
        Self {
            chr: chr.into(),
            genomic_start,
            genomic_end,
        }
    }

    /// Base pairs in the window, `0` when the ends are swapped.
    pub fn span(&self) -> u64 {
        self.genomic_end.saturating_sub(self.genomic_start)
    }

    /// Base pairs covered by one bin when the window is split into `trace_length` bins.
    pub fn bin_size(&self, trace_length: usize) -> f64 {
        if trace_length == 0 {
            return 0.0;
        }
        self.span() as f64 / trace_length as f64
    }

    /// Index of the bin holding `genomic_start` on a whole-chromosome grid
    pub fn start_bin(&self, bin_size: f64) -> u64 {
        if bin_size <= 0.0 {
            return 0;
        }
        (self.genomic_start as f64 / bin_size).floor() as u64
    }

    /// Maps a genomic position inside the window to its bin.
    /// Returns `None` outside the window.
    ///
    /// ```
    /// use livemap::libs::locus::Locus;
    /// let locus = Locus::new("chr1", 1000, 1400);
    /// assert_eq!(locus.bin_of(1000, 4), Some(0));
    /// assert_eq!(locus.bin_of(1399, 4), Some(3));
    /// assert_eq!(locus.bin_of(1400, 4), Some(3));
    /// assert_eq!(locus.bin_of(999, 4), None);
    /// ```
    pub fn bin_of(&self, position: u64, trace_length: usize) -> Option<usize> {
        if position < self.genomic_start || position > self.genomic_end || trace_length == 0 {
            return None;
        }
        let bin = ((position - self.genomic_start) as f64 / self.bin_size(trace_length)) as usize;
        Some(bin.min(trace_length - 1))
    }
}

impl FromStr for Locus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = RE_LOCUS
            .captures(s)
            .ok_or_else(|| anyhow::anyhow!("Malformed locus [{}], expected chr:start-end", s))?;
        let start: u64 = caps["start"].replace(',', "").parse()?;
        let end: u64 = caps["end"].replace(',', "").parse()?;
        if start >= end {
            anyhow::bail!("Locus [{}] must have start < end", s);
        }

        Ok(Locus::new(&caps["chr"], start, end))
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chr, self.genomic_start, self.genomic_end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chromosome {
    pub name: String,
    pub size: u64,
}

/// Chromosome names and sizes, in file order.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    pub id: String,
    chromosomes: Vec<Chromosome>,
}

impl Genome {
    pub fn new(id: impl Into<String>, chromosomes: Vec<Chromosome>) -> Self {
        Self {
            id: id.into(),
            chromosomes,
        }
    }

    /// Reads a `chrom.sizes` file: `name<TAB>size` per line.
    pub fn from_sizes<R: BufRead>(id: &str, reader: R) -> anyhow::Result<Self> {
        let mut chromosomes = vec![];
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(name), Some(size)) = (fields.next(), fields.next()) else {
                anyhow::bail!("Malformed chrom.sizes line [{}]", line);
            };
            chromosomes.push(Chromosome {
                name: name.to_string(),
                size: size.parse()?,
            });
        }

        Ok(Self::new(id, chromosomes))
    }

    /// A genome holding only the chromosome of `locus`
    pub fn for_locus(locus: &Locus) -> Self {
        Self::new(
            "custom",
            vec![Chromosome {
                name: locus.chr.clone(),
                size: locus.genomic_end,
            }],
        )
    }

    pub fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn get_chromosome(&self, name: &str) -> Option<&Chromosome> {
        self.chromosomes.iter().find(|c| c.name == name)
    }

    pub fn ensure_supported(&self, locus: &Locus) -> Result<&Chromosome, LiveMapError> {
        self.get_chromosome(&locus.chr)
            .ok_or_else(|| LiveMapError::UnsupportedLocus(locus.chr.clone()))
    }
}
