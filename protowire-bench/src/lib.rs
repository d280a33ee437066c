use std::fmt::Display;
use std::time::Instant;

/// Statistics from a benchmark run. Durations are in milliseconds.
#[derive(Default)]
pub struct BenchStats {
    /// Duration of longest run.
    pub max: f32,

    /// Mean duration.
    pub mean: f32,

    /// Median duration.
    pub median: f32,

    /// Minimum duration.
    pub min: f32,

    /// Mean absolute deviation of durations.
    pub var: f32,
}

impl BenchStats {
    fn from_times(mut times: Vec<f32>) -> BenchStats {
        if times.is_empty() {
            return BenchStats::default();
        }
        times.sort_by(|a, b| a.total_cmp(b));
        let min = times[0];
        let max = times[times.len() - 1];

        let mid = times.len() / 2;
        let median = if times.len() % 2 == 1 {
            times[mid]
        } else {
            (times[mid - 1] + times[mid]) / 2.
        };
        let mean = times.iter().sum::<f32>() / times.len() as f32;
        let var = times.iter().map(|x| (x - mean).abs()).sum::<f32>() / times.len() as f32;

        BenchStats {
            max,
            mean,
            median,
            min,
            var,
        }
    }

    /// Throughput in megabytes per second for a run that processed `bytes`
    /// bytes per trial, based on the median duration.
    pub fn megabytes_per_sec(&self, bytes: usize) -> f32 {
        if self.median <= 0. {
            return 0.;
        }
        (bytes as f32 / (1024. * 1024.)) / (self.median / 1000.)
    }
}

fn time_trials<F: FnMut()>(trials: usize, mut f: F) -> Vec<f32> {
    let mut times = Vec::with_capacity(trials);
    for _ in 0..trials {
        let start = Instant::now();

        f();

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        times.push(duration_ms as f32);
    }
    times
}

/// Run a benchmark function `f` for `trials` iterations and print statistics
/// about the run.
pub fn run_bench<F: FnMut(), D: Display>(trials: usize, description: D, f: F) -> BenchStats {
    let stats = BenchStats::from_times(time_trials(trials, f));
    if trials > 0 {
        println!(
            "{}. mean {:.3}ms median {:.3} var {:.3} min {:.3} max {:.3}",
            description, stats.mean, stats.median, stats.var, stats.min, stats.max
        );
    }
    stats
}

/// Run a codec benchmark which processes `bytes` bytes per call of `f`, and
/// print throughput alongside the timing statistics.
pub fn run_throughput_bench<F: FnMut(), D: Display>(
    trials: usize,
    bytes: usize,
    description: D,
    f: F,
) -> BenchStats {
    let stats = BenchStats::from_times(time_trials(trials, f));
    if trials > 0 {
        println!(
            "{}. {} bytes, median {:.3}ms min {:.3} max {:.3}, {:.1} MB/s",
            description,
            bytes,
            stats.median,
            stats.min,
            stats.max,
            stats.megabytes_per_sec(bytes)
        );
    }
    stats
}
