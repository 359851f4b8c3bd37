//! Pairwise aggregation over an ensemble.
//!
//! A [`Job`] carries everything the computation needs as plain data, so it can
//! be shipped to another thread with no shared state. The vertex lists travel
//! serialized, mirroring a message copy across the worker boundary.
//!
//! * contact mode counts, for every bin pair, the traces in which both points
//!   lie within `threshold` of each other
//! * distance mode averages the Euclidean distance over traces that have both
//!   points; pairs with no sample get [`NO_DATA`]
//!
//! Summation order is fixed (bin-major, then trace-major), so a job always
//! yields the same buffer regardless of how rows are spread over threads.

use crate::libs::ensemble::Point;
use crate::libs::error::LiveMapError;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Distance value for bin pairs that no trace covers
pub const NO_DATA: f64 = f64::INFINITY;

pub const MAX_THRESHOLD: f64 = 1e4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Contact,
    Distance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub mode: Mode,
    pub trace_length: usize,
    /// JSON array of traces, each an array of `[x, y, z]` or `null`
    pub vertex_lists: String,
    /// Ignored in distance mode
    pub threshold: f64,
}

impl Job {
    pub fn new(
        mode: Mode,
        trace_length: usize,
        vertex_lists: &[Vec<Option<[f64; 3]>>],
        threshold: f64,
    ) -> Result<Self, LiveMapError> {
        let vertex_lists = serde_json::to_string(vertex_lists)
            .map_err(|e| LiveMapError::compute(format!("cannot serialize vertex lists: {}", e)))?;
        Ok(Self {
            mode,
            trace_length,
            vertex_lists,
            threshold,
        })
    }
}

/// Runs `job` and returns the dense `trace_length * trace_length` buffer,
/// indexed `bin1 * trace_length + bin2`.
pub fn aggregate(job: &Job) -> Result<Vec<f64>, LiveMapError> {
    let traces = decode(job)?;
    let n = job.trace_length;

    if job.mode == Mode::Contact
        && !(job.threshold.is_finite() && (0.0..=MAX_THRESHOLD).contains(&job.threshold))
    {
        return Err(LiveMapError::compute(format!(
            "threshold {} outside [0, {}]",
            job.threshold, MAX_THRESHOLD
        )));
    }

    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| match job.mode {
            Mode::Contact => contact_row(&traces, i, n, job.threshold),
            Mode::Distance => distance_row(&traces, i, n),
        })
        .collect();

    let mut buffer = vec![0.0; n * n];
    for (i, row) in rows.iter().enumerate() {
        for (k, value) in row.iter().enumerate() {
            let j = i + k;
            buffer[i * n + j] = *value;
            buffer[j * n + i] = *value;
        }
    }

    Ok(buffer)
}

fn decode(job: &Job) -> Result<Vec<Vec<Option<Point>>>, LiveMapError> {
    if job.trace_length == 0 {
        return Err(LiveMapError::compute("trace length is zero"));
    }

    let lists: Vec<Vec<Option<[f64; 3]>>> = serde_json::from_str(&job.vertex_lists)
        .map_err(|e| LiveMapError::compute(format!("malformed vertex lists: {}", e)))?;

    let mut traces = Vec::with_capacity(lists.len());
    for (t, list) in lists.into_iter().enumerate() {
        if list.len() != job.trace_length {
            return Err(LiveMapError::compute(format!(
                "trace {} has {} vertices, expected {}",
                t,
                list.len(),
                job.trace_length
            )));
        }
        let mut points = Vec::with_capacity(list.len());
        for v in list {
            match v {
                Some(xyz) if xyz.iter().all(|c| c.is_finite()) => {
                    points.push(Some(Point::new(xyz[0], xyz[1], xyz[2])))
                }
                Some(xyz) => {
                    return Err(LiveMapError::compute(format!(
                        "trace {} has a non-finite vertex {:?}",
                        t, xyz
                    )))
                }
                None => points.push(None),
            }
        }
        traces.push(points);
    }

    Ok(traces)
}

// Values for (i, i..n)
fn contact_row(traces: &[Vec<Option<Point>>], i: usize, n: usize, threshold: f64) -> Vec<f64> {
    (i..n)
        .map(|j| {
            let mut count = 0.0;
            for trace in traces {
                if let (Some(a), Some(b)) = (&trace[i], &trace[j]) {
                    if nalgebra::distance(a, b) <= threshold {
                        count += 1.0;
                    }
                }
            }
            count
        })
        .collect()
}

fn distance_row(traces: &[Vec<Option<Point>>], i: usize, n: usize) -> Vec<f64> {
    (i..n)
        .map(|j| {
            let mut sum = 0.0;
            let mut samples = 0usize;
            for trace in traces {
                if let (Some(a), Some(b)) = (&trace[i], &trace[j]) {
                    sum += nalgebra::distance(a, b);
                    samples += 1;
                }
            }
            if samples == 0 {
                NO_DATA
            } else {
                sum / samples as f64
            }
        })
        .collect()
}

/// Largest finite value of a distance buffer, `0.0` if there is none
pub fn max_distance(buffer: &[f64]) -> f64 {
    buffer
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_traces() -> Vec<Vec<Option<[f64; 3]>>> {
        vec![vec![Some([1.0, 1.0, 1.0]); 4], vec![Some([5.0, 5.0, 5.0]); 4]]
    }

    #[test]
    fn test_contact_identical_points() {
        let job = Job::new(Mode::Contact, 4, &uniform_traces(), 1.0).unwrap();
        let buffer = aggregate(&job).unwrap();
        assert_eq!(buffer.len(), 16);
        assert!(buffer.iter().all(|v| *v == 2.0));
    }

    #[test]
    fn test_distance_identical_points() {
        let job = Job::new(Mode::Distance, 4, &uniform_traces(), 0.0).unwrap();
        let buffer = aggregate(&job).unwrap();
        assert!(buffer.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_symmetry_and_missing() {
        let lists = vec![
            vec![
                Some([0.0, 0.0, 0.0]),
                Some([3.0, 0.0, 0.0]),
                None,
                Some([0.0, 4.0, 0.0]),
            ],
            vec![
                Some([0.0, 0.0, 0.0]),
                Some([1.0, 0.0, 0.0]),
                None,
                Some([0.0, 0.5, 0.0]),
            ],
        ];
        let n = 4;
        let contact = aggregate(&Job::new(Mode::Contact, n, &lists, 2.0).unwrap()).unwrap();
        let distance = aggregate(&Job::new(Mode::Distance, n, &lists, 0.0).unwrap()).unwrap();

        for i in 0..n {
            for j in 0..n {
                assert_eq!(contact[i * n + j], contact[j * n + i]);
                assert_eq!(distance[i * n + j], distance[j * n + i]);
            }
        }

        // bin 2 is missing in every trace
        assert_eq!(contact[2 * n + 2], 0.0);
        assert_eq!(distance[2 * n + 1], NO_DATA);
        assert_eq!(distance[2 * n + 2], NO_DATA);

        // (0, 1): distances 3 and 1
        assert_eq!(contact[1], 1.0);
        assert_eq!(distance[1], 2.0);
        // (1, 3): distances 5 and sqrt(1.25)
        assert_eq!(contact[n + 3], 1.0);

        approx::assert_relative_eq!(max_distance(&distance), (5.0 + 1.25_f64.sqrt()) / 2.0);
    }

    #[test]
    fn test_rejects_bad_jobs() {
        let lists = uniform_traces();

        let job = Job::new(Mode::Contact, 3, &lists, 1.0).unwrap();
        assert!(matches!(aggregate(&job), Err(LiveMapError::Compute(_))));

        let job = Job::new(Mode::Contact, 4, &lists, -1.0).unwrap();
        assert!(matches!(aggregate(&job), Err(LiveMapError::Compute(_))));

        let job = Job::new(Mode::Contact, 4, &lists, 2e4).unwrap();
        assert!(aggregate(&job).is_err());

        let job = Job::new(Mode::Distance, 0, &[], 0.0).unwrap();
        assert!(aggregate(&job).is_err());

        let mut job = Job::new(Mode::Distance, 4, &lists, 0.0).unwrap();
        job.vertex_lists = "[[1, 2".to_string();
        assert!(aggregate(&job).is_err());
    }

    #[test]
    fn test_job_serializes() {
        let job = Job::new(Mode::Distance, 1, &[vec![None]], 0.0).unwrap();
        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"mode\":\"distance\""));
        assert!(json.contains("\"vertex_lists\":\"[[null]]\""));
    }
}
