//! Trace ensembles: the 3D structures a live map is computed from.
//!
//! An ensemble file lists one point per line:
//!
//! ```text
//! #locus chr1:1000-1400
//! trace   bin x   y   z
//! t1      0   1.0 2.0 3.0
//! t1      1   nan nan nan
//! ```
//!
//! * `nan`, `NA` or `.` in any coordinate marks the point missing
//! * bins never listed for a trace are missing too
//! * the trace length is one more than the largest bin seen in the file

use crate::libs::locus::Locus;
use indexmap::IndexMap;
use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use std::io::BufRead;

pub type Point = Point3<f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub name: String,
    /// One slot per genomic bin; `None` where the structure has no position
    pub points: Vec<Option<Point>>,
}

impl Trace {
    pub fn new(name: impl Into<String>, points: Vec<Option<Point>>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Serializable form, coordinates as `[x, y, z]`
    pub fn vertex_list(&self) -> Vec<Option<[f64; 3]>> {
        self.points
            .iter()
            .map(|p| p.map(|p| [p.x, p.y, p.z]))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: Point,
    pub radius: f64,
}

/// Center of the axis-aligned box around the present points; the radius is half
/// of its diagonal.
pub fn trace_bounds(trace: &Trace) -> Bounds {
    let present: Vec<&Point> = trace.points.iter().flatten().collect();
    if present.is_empty() {
        return Bounds {
            center: Point::origin(),
            radius: 0.0,
        };
    }

    let mut min = Vector3::repeat(f64::INFINITY);
    let mut max = Vector3::repeat(f64::NEG_INFINITY);
    for p in present {
        min = min.inf(&p.coords);
        max = max.sup(&p.coords);
    }

    Bounds {
        center: Point::from((min + max) / 2.0),
        radius: (max - min).norm() / 2.0,
    }
}

/// Read-only view of the structures behind a live map.
pub trait EnsembleSource {
    fn current_trace(&self) -> Option<&Trace>;

    fn locus(&self) -> Option<&Locus>;

    fn live_map_trace_length(&self) -> usize;

    fn live_map_vertex_lists(&self) -> Vec<Vec<Option<[f64; 3]>>>;

    fn bounds(&self, trace: &Trace) -> Bounds {
        trace_bounds(trace)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ensemble {
    traces: Vec<Trace>,
    locus: Option<Locus>,
    current: usize,
}

impl Ensemble {
    /// All traces are padded with missing points to the longest one.
    pub fn new(mut traces: Vec<Trace>, locus: Option<Locus>) -> Self {
        let trace_length = traces.iter().map(|t| t.len()).max().unwrap_or(0);
        for trace in traces.iter_mut() {
            trace.points.resize(trace_length, None);
        }

        Self {
            traces,
            locus,
            current: 0,
        }
    }

    pub fn from_reader<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        let mut locus = None;
        let mut points_of: IndexMap<String, Vec<Option<Point>>> = IndexMap::new();

        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(rest) = line.strip_prefix("#locus") {
                locus = Some(rest.trim().parse::<Locus>()?);
                continue;
            }
            if line.starts_with('#') {
                continue;
            }

            let Some((name, bin, x, y, z)) = line.split_whitespace().collect_tuple() else {
                anyhow::bail!("Line {}: expected 5 fields, got [{}]", lineno + 1, line);
            };
            let Ok(bin) = bin.parse::<usize>() else {
                // header row
                continue;
            };

            let point = match (parse_coord(x)?, parse_coord(y)?, parse_coord(z)?) {
                (Some(x), Some(y), Some(z)) => Some(Point::new(x, y, z)),
                _ => None,
            };

            let points = points_of.entry(name.to_string()).or_default();
            if points.len() <= bin {
                points.resize(bin + 1, None);
            }
            points[bin] = point;
        }

        let traces = points_of
            .into_iter()
            .map(|(name, points)| Trace::new(name, points))
            .collect();

        Ok(Self::new(traces, locus))
    }

    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn set_locus(&mut self, locus: Locus) {
        self.locus = Some(locus);
    }

    /// Selects the current trace by name. Returns `false` if no trace matches.
    pub fn select_trace(&mut self, name: &str) -> bool {
        match self.traces.iter().position(|t| t.name == name) {
            Some(idx) => {
                self.current = idx;
                true
            }
            None => false,
        }
    }
}

fn parse_coord(s: &str) -> anyhow::Result<Option<f64>> {
    match s {
        "nan" | "NaN" | "NA" | "." => Ok(None),
        _ => {
            let v: f64 = s
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid coordinate [{}]", s))?;
            Ok(if v.is_finite() { Some(v) } else { None })
        }
    }
}

impl EnsembleSource for Ensemble {
    fn current_trace(&self) -> Option<&Trace> {
        self.traces.get(self.current)
    }

    fn locus(&self) -> Option<&Locus> {
        self.locus.as_ref()
    }

    fn live_map_trace_length(&self) -> usize {
        self.traces.first().map(|t| t.len()).unwrap_or(0)
    }

    fn live_map_vertex_lists(&self) -> Vec<Vec<Option<[f64; 3]>>> {
        self.traces.iter().map(|t| t.vertex_list()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::BufReader;

    #[test]
    fn test_from_reader() {
        let input = "\
#locus chr1:1000-1300
trace\tbin\tx\ty\tz
a\t0\t0\t0\t0
a\t2\t2\t0\t0
b\t1\t1\t1\t1
b\t0\tnan\t0\t0
";
        let ensemble = Ensemble::from_reader(BufReader::new(input.as_bytes())).unwrap();
        assert_eq!(ensemble.locus().unwrap().to_string(), "chr1:1000-1300");
        assert_eq!(ensemble.traces().len(), 2);
        assert_eq!(ensemble.live_map_trace_length(), 3);

        let a = &ensemble.traces()[0];
        assert_eq!(a.name, "a");
        assert!(a.points[1].is_none());
        let b = &ensemble.traces()[1];
        assert!(b.points[0].is_none());
        assert!(b.points[2].is_none());

        let lists = ensemble.live_map_vertex_lists();
        assert_eq!(lists[0][2], Some([2.0, 0.0, 0.0]));
    }

    #[test]
    fn test_malformed_line() {
        let input = "a\t0\t1\t2\n";
        assert!(Ensemble::from_reader(BufReader::new(input.as_bytes())).is_err());
        let input = "a\t0\t1\t2\tfoo\n";
        assert!(Ensemble::from_reader(BufReader::new(input.as_bytes())).is_err());
    }

    #[test]
    fn test_bounds() {
        let trace = Trace::new(
            "t",
            vec![
                Some(Point::new(0.0, 0.0, 0.0)),
                None,
                Some(Point::new(2.0, 2.0, 1.0)),
            ],
        );
        let bounds = trace_bounds(&trace);
        assert_relative_eq!(bounds.center.x, 1.0);
        assert_relative_eq!(bounds.center.z, 0.5);
        assert_relative_eq!(bounds.radius, 1.5);

        let empty = Trace::new("e", vec![None, None]);
        assert_eq!(trace_bounds(&empty).radius, 0.0);
    }

    #[test]
    fn test_select_trace() {
        let mut ensemble = Ensemble::new(
            vec![
                Trace::new("a", vec![None]),
                Trace::new("b", vec![None, None]),
            ],
            None,
        );
        assert_eq!(ensemble.traces()[0].len(), 2);
        assert_eq!(ensemble.current_trace().unwrap().name, "a");
        assert!(ensemble.select_trace("b"));
        assert_eq!(ensemble.current_trace().unwrap().name, "b");
        assert!(!ensemble.select_trace("z"));
    }
}
