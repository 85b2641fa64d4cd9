use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::config::MAX_WORKERS;
use crate::model::job::{AssetJob, BatchReport, JobOutcome, JobStatus};
use crate::services::generation::{AssetSource, GenerationError};
use crate::services::{output, pool};

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("failed to write asset: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to create output directory {path}: {source}")]
    OutputDir { path: PathBuf, source: io::Error },

    #[error("failed to start worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Generates and stores one asset per job, `workers` at a time (never more
/// than [`MAX_WORKERS`]).
///
/// Job failures are printed and recorded in the report; only an unusable
/// output directory or a pool where no worker could start fails the batch.
/// Console lines go to `out`, which workers share.
pub fn run<S, W>(
    jobs: &[AssetJob],
    source: &S,
    output_dir: &Path,
    workers: usize,
    out: &Mutex<W>,
) -> Result<BatchReport, BatchError>
where
    S: AssetSource,
    W: Write + Send,
{
    fs::create_dir_all(output_dir).map_err(|source| BatchError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let workers = workers.clamp(1, MAX_WORKERS);

    emit(out, format_args!("Generating {} backgrounds via Ideogram API...", jobs.len()));
    tracing::info!(jobs = jobs.len(), workers, dir = %output_dir.display(), "Starting batch");

    let outcomes = pool::run(jobs.to_vec(), workers, |job| {
        let status = match process_job(&job, source, output_dir) {
            Ok(path) => {
                emit(out, format_args!("  OK: {}", job.file_name()));
                tracing::debug!(job = job.name, path = %path.display(), "Asset written");
                JobStatus::Written { path }
            }
            Err(e) => {
                emit(out, format_args!("  FAIL: {} — {}", job.name, e));
                tracing::warn!(job = job.name, error = %e, "Job failed");
                JobStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        JobOutcome {
            name: job.name.to_string(),
            status,
        }
    })
    .map_err(BatchError::Spawn)?;

    let report = BatchReport::from_outcomes(outcomes);

    emit(
        out,
        format_args!("Done: {}/{} backgrounds generated.", report.succeeded, report.total),
    );
    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        total = report.total,
        "Batch finished"
    );

    Ok(report)
}

fn process_job<S: AssetSource>(job: &AssetJob, source: &S, output_dir: &Path) -> Result<PathBuf, JobError> {
    tracing::debug!(job = job.name, "Requesting generation");
    let url = source.generate(job.prompt)?;

    tracing::debug!(job = job.name, url = %url, "Downloading asset");
    let bytes = source.download(&url)?;

    let path = job.output_path(output_dir);
    output::write_atomic(&path, &bytes)?;

    Ok(path)
}

fn emit<W: Write>(out: &Mutex<W>, line: std::fmt::Arguments<'_>) {
    if let Ok(mut w) = out.lock() {
        let _ = writeln!(w, "{line}");
        let _ = w.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::slides;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    const JOBS: &[AssetJob] = &[
        AssetJob::new("01-one", "prompt one"),
        AssetJob::new("02-two", "prompt two"),
        AssetJob::new("03-three", "prompt three"),
        AssetJob::new("04-four", "prompt four"),
        AssetJob::new("05-five", "prompt five"),
        AssetJob::new("06-six", "prompt six"),
    ];

    /// Echoes the prompt back as the URL and the URL back as the bytes.
    struct Succeeding;

    impl AssetSource for Succeeding {
        fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            Ok(format!("https://cdn.test/{}", prompt.replace(' ', "-")))
        }

        fn download(&self, url: &str) -> Result<Vec<u8>, GenerationError> {
            Ok(url.as_bytes().to_vec())
        }
    }

    struct Failing;

    impl AssetSource for Failing {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Api {
                status: 503,
                body: "unavailable".into(),
            })
        }

        fn download(&self, _url: &str) -> Result<Vec<u8>, GenerationError> {
            unreachable!("generate never succeeds")
        }
    }

    /// Fails only the job whose prompt matches.
    struct FailingFor(&'static str);

    impl AssetSource for FailingFor {
        fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            if prompt == self.0 {
                return Err(GenerationError::MissingUrl);
            }
            Succeeding.generate(prompt)
        }

        fn download(&self, url: &str) -> Result<Vec<u8>, GenerationError> {
            Succeeding.download(url)
        }
    }

    #[derive(Default)]
    struct Counting {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl AssetSource for Counting {
        fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(40));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Succeeding.generate(prompt)
        }

        fn download(&self, url: &str) -> Result<Vec<u8>, GenerationError> {
            Succeeding.download(url)
        }
    }

    fn run_with<S: AssetSource>(source: &S, dir: &Path, jobs: &[AssetJob]) -> (BatchReport, String) {
        let out = Mutex::new(Vec::<u8>::new());
        let report = run(jobs, source, dir, 4, &out).unwrap();
        let text = String::from_utf8(out.into_inner().unwrap()).unwrap();
        (report, text)
    }

    fn png_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".png"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn all_succeed_writes_one_file_per_job() {
        let dir = tempfile::tempdir().unwrap();
        let (report, text) = run_with(&Succeeding, dir.path(), JOBS);

        assert_eq!(report.succeeded, JOBS.len());
        assert_eq!(report.failed, 0);
        assert_eq!(
            png_files(dir.path()),
            JOBS.iter().map(|j| j.file_name()).collect::<Vec<_>>()
        );
        assert_eq!(text.matches("  OK: ").count(), JOBS.len());
        assert!(text.contains("  OK: 03-three.png"));
        assert!(text.ends_with("Done: 6/6 backgrounds generated.\n"));

        let body = fs::read(dir.path().join("02-two.png")).unwrap();
        assert_eq!(body, b"https://cdn.test/prompt-two");
    }

    #[test]
    fn all_fail_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let (report, text) = run_with(&Failing, dir.path(), JOBS);

        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, JOBS.len());
        assert!(png_files(dir.path()).is_empty());
        assert_eq!(text.matches("  FAIL: ").count(), JOBS.len());
        assert!(text.contains("  FAIL: 04-four — HTTP 503: unavailable"));
        assert!(text.ends_with("Done: 0/6 backgrounds generated.\n"));
    }

    #[test]
    fn one_failure_does_not_affect_others() {
        let dir = tempfile::tempdir().unwrap();
        let (report, text) = run_with(&FailingFor("prompt three"), dir.path(), JOBS);

        assert_eq!(report.succeeded, JOBS.len() - 1);
        assert!(!dir.path().join("03-three.png").exists());
        for job in JOBS.iter().filter(|j| j.name != "03-three") {
            assert!(dir.path().join(job.file_name()).exists(), "{} missing", job.name);
        }
        assert!(text.contains("  FAIL: 03-three — response has no data[0].url"));

        let failed = &report.items[2];
        assert_eq!(failed.name, "03-three");
        assert!(!failed.is_written());
    }

    #[test]
    fn rerun_overwrites_in_place() {
        let dir = tempfile::tempdir().unwrap();

        run_with(&Succeeding, dir.path(), JOBS);
        let (report, _) = run_with(&Succeeding, dir.path(), JOBS);

        assert_eq!(report.succeeded, JOBS.len());
        assert_eq!(png_files(dir.path()).len(), JOBS.len());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), JOBS.len());
    }

    #[test]
    fn stale_files_are_not_counted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("01-one.png"), b"old").unwrap();
        fs::write(dir.path().join("leftover.png"), b"old").unwrap();

        let (report, text) = run_with(&Failing, dir.path(), JOBS);

        assert_eq!(report.succeeded, 0);
        assert!(text.ends_with("Done: 0/6 backgrounds generated.\n"));
    }

    #[test]
    fn four_in_flight_at_most_and_in_parallel() {
        let dir = tempfile::tempdir().unwrap();
        let jobs: Vec<AssetJob> = JOBS.iter().chain(JOBS.iter()).copied().collect();
        let source = Counting::default();

        let out = Mutex::new(io::sink());
        let report = run(&jobs, &source, dir.path(), 4, &out).unwrap();

        assert_eq!(report.total, jobs.len());
        let peak = source.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak was {peak}");
        assert!(peak > 1, "jobs ran one at a time");
    }

    #[test]
    fn oversized_worker_count_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let source = Counting::default();

        let out = Mutex::new(io::sink());
        let report = run(slides::SLIDES, &source, dir.path(), 12, &out).unwrap();

        assert_eq!(report.succeeded, slides::SLIDES.len());
        let peak = source.peak.load(Ordering::SeqCst);
        assert!(peak <= MAX_WORKERS, "peak was {peak}");
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("backgrounds");

        let (report, _) = run_with(&Succeeding, &nested, &JOBS[..1]);

        assert_eq!(report.succeeded, 1);
        assert!(nested.join("01-one.png").exists());
    }

    #[test]
    fn unusable_output_dir_fails_batch() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, b"").unwrap();

        let out = Mutex::new(io::sink());
        let err = run(JOBS, &Succeeding, &file.join("sub"), 4, &out).unwrap_err();

        assert!(matches!(err, BatchError::OutputDir { .. }));
    }

    #[test]
    fn empty_job_list_reports_zero() {
        let dir = tempfile::tempdir().unwrap();
        let (report, text) = run_with(&Succeeding, dir.path(), &[]);

        assert_eq!(report.total, 0);
        assert!(text.ends_with("Done: 0/0 backgrounds generated.\n"));
    }
}
