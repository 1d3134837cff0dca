use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "with-serde")]
use mailsweep::BatchReport;
use mailsweep::{
    AnnotatedRow, BatchError, BatchOptions, BatchProgress, DisposableDomains, InputRow, Pipeline,
    ProgressSink, SmtpProbeOptions, run_batch,
};

const EMAIL_COLUMN: &str = "Email Address";
const NAME_COLUMN: &str = "Name";
const MOBILE_COLUMN: &str = "Mobile Number";

#[derive(Parser)]
#[command(
    name = "mailsweep-cli",
    about = "Validate and clean a CSV of email addresses"
)]
struct Cli {
    /// input CSV with an 'Email Address' column
    input: PathBuf,

    /// write the annotated CSV here (stdout when omitted)
    #[arg(long)]
    out: Option<String>,

    /// keep only rows whose Status is Valid
    #[arg(long)]
    valid_only: bool,

    /// enable the live SMTP RCPT probe (slow; paced per probe)
    #[arg(long)]
    smtp: bool,

    /// SMTP probe timeout, in seconds
    #[arg(long, default_value_t = 10.0)]
    smtp_timeout: f64,

    /// pause between SMTP probes, in seconds
    #[arg(long, default_value_t = 1.5)]
    probe_delay: f64,

    /// extra disposable domain on top of the built-in set (repeatable)
    #[arg(long = "extra-disposable", value_name = "DOMAIN")]
    extra_disposable: Vec<String>,

    /// format: human|csv|json
    #[arg(long, default_value = "csv")]
    format: String,

    /// suppress the progress line
    #[arg(long)]
    quiet: bool,
}

/// Which of the optional passthrough columns the input actually had, so the
/// output mirrors its shape.
#[derive(Clone, Copy)]
struct ColumnLayout {
    has_name: bool,
    has_mobile: bool,
}

struct StderrProgress {
    quiet: bool,
}

impl ProgressSink for StderrProgress {
    fn report(&mut self, progress: &BatchProgress) {
        if self.quiet {
            return;
        }
        match progress.eta {
            Some(eta) => eprint!(
                "\rProcessing... {}/{} | ETA: {:.1}s   ",
                progress.processed,
                progress.total,
                eta.as_secs_f64()
            ),
            None => eprint!("\rProcessing... {}/{}   ", progress.processed, progress.total),
        }
        if progress.processed == progress.total {
            eprintln!();
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let (rows, layout) = read_rows(&cli.input)
        .with_context(|| format!("read input CSV '{}'", cli.input.display()))?;
    if !cli.quiet {
        eprintln!("Found {} rows", rows.len());
    }

    if !cli.probe_delay.is_finite() || cli.probe_delay < 0.0 {
        bail!("--probe-delay must be a non-negative number of seconds");
    }
    if !cli.smtp_timeout.is_finite() || cli.smtp_timeout <= 0.0 {
        bail!("--smtp-timeout must be a positive number of seconds");
    }
    let options = BatchOptions {
        enable_smtp_probe: cli.smtp,
        inter_probe_delay: Duration::from_secs_f64(cli.probe_delay),
        smtp: SmtpProbeOptions {
            timeout: Duration::from_secs_f64(cli.smtp_timeout),
            ..SmtpProbeOptions::default()
        },
    };
    let pipeline = Pipeline::new(DisposableDomains::with_extra(&cli.extra_disposable));

    let mut sink = StderrProgress { quiet: cli.quiet };
    let report = run_batch(rows, &pipeline, &options, &mut sink);

    if !cli.quiet {
        eprintln!(
            "Done: {} valid, {} removed out of {} rows",
            report.valid_count,
            report.invalid_count,
            report.rows.len()
        );
    }

    let selected: Vec<&AnnotatedRow> = report
        .rows
        .iter()
        .filter(|r| !cli.valid_only || r.outcome.is_valid())
        .collect();

    match cli.format.as_str() {
        "human" => {
            let data = render_human(&selected)?;
            match &cli.out {
                Some(path) => write_all_atomically(path, &data)?,
                None => std::io::stdout().write_all(&data)?,
            }
        }
        "csv" => {
            let data = render_csv(&selected, layout)?;
            match &cli.out {
                Some(path) => write_all_atomically(path, &data)?,
                None => std::io::stdout().write_all(&data)?,
            }
        }
        "json" => {
            #[cfg(feature = "with-serde")]
            {
                let s = serde_json::to_string_pretty(&json_view(&report, cli.valid_only))?;
                match &cli.out {
                    Some(path) => write_all_atomically(path, s.as_bytes())?,
                    None => println!("{s}"),
                }
            }
            #[cfg(not(feature = "with-serde"))]
            {
                bail!("format=json requires the 'with-serde' feature");
            }
        }
        other => bail!("unknown --format '{other}', use: human|csv|json"),
    }

    // exit codes: 0 all valid, 2 some rows invalid, 1 fatal
    if report.invalid_count > 0 {
        std::process::exit(2);
    }
    Ok(())
}

fn read_rows(path: &PathBuf) -> Result<(Vec<InputRow>, ColumnLayout)> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let find = |name: &str| headers.iter().position(|h| h.trim() == name);
    let Some(email_idx) = find(EMAIL_COLUMN) else {
        return Err(BatchError::MissingEmailField.into());
    };
    let name_idx = find(NAME_COLUMN);
    let mobile_idx = find(MOBILE_COLUMN);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("read CSV record")?;
        let field = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .map(str::to_string)
                .filter(|s| !s.is_empty())
        };
        rows.push(InputRow {
            name: field(name_idx),
            email: record.get(email_idx).unwrap_or_default().to_string(),
            mobile: field(mobile_idx),
        });
    }
    Ok((
        rows,
        ColumnLayout {
            has_name: name_idx.is_some(),
            has_mobile: mobile_idx.is_some(),
        },
    ))
}

fn render_human(rows: &[&AnnotatedRow]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for r in rows {
        if r.outcome.is_valid() {
            writeln!(buf, "[OK]      {}", r.row.email)?;
        } else {
            writeln!(buf, "[INVALID] {} :: {}", r.row.email, r.outcome.status_label())?;
        }
    }
    Ok(buf)
}

fn render_csv(rows: &[&AnnotatedRow], layout: ColumnLayout) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());

    let mut header = Vec::new();
    if layout.has_name {
        header.push(NAME_COLUMN);
    }
    header.push(EMAIL_COLUMN);
    if layout.has_mobile {
        header.push(MOBILE_COLUMN);
    }
    header.push("Status");
    wtr.write_record(&header)?;

    for r in rows {
        let status = r.outcome.status_label();
        let mut record = Vec::new();
        if layout.has_name {
            record.push(r.row.name.as_deref().unwrap_or(""));
        }
        record.push(r.row.email.as_str());
        if layout.has_mobile {
            record.push(r.row.mobile.as_deref().unwrap_or(""));
        }
        record.push(&status);
        wtr.write_record(&record)?;
    }

    Ok(wtr.into_inner()?)
}

#[cfg(feature = "with-serde")]
fn json_view(report: &BatchReport, valid_only: bool) -> BatchReport {
    if !valid_only {
        return report.clone();
    }
    let rows: Vec<AnnotatedRow> = report
        .rows
        .iter()
        .filter(|r| r.outcome.is_valid())
        .cloned()
        .collect();
    BatchReport {
        rows,
        valid_count: report.valid_count,
        invalid_count: report.invalid_count,
    }
}

fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}
