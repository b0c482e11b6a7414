//! Write-behind evidence sink: one JSONL row per decision event,
//! buffered through a bounded channel so the hot path never touches
//! the filesystem. Overflow drops rows and counts them.

use std::fmt::{Display, Formatter};

use anyhow::Context;
use engine::METRICS;
use serde::{Deserialize, Serialize};
use tokio::{
    fs::OpenOptions,
    io::{AsyncWriteExt, BufWriter},
    sync::mpsc,
};
use tokio_util::sync::CancellationToken;
use tracing::error;

const CHANNEL_CAPACITY: usize = 8_192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Detect,
    Reject,
    Submit,
    Confirm,
}

impl Display for EvidenceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detect => f.write_str("detect"),
            Self::Reject => f.write_str("reject"),
            Self::Submit => f.write_str("submit"),
            Self::Confirm => f.write_str("confirm"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub kind: EvidenceKind,
    pub ts: u64,
    pub pool: String,
    pub venue: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_est: Option<i128>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sig: Option<String>,
}

/// Hot-path handle: non-blocking enqueue only.
#[derive(Clone)]
pub struct EvidenceSink {
    tx: mpsc::Sender<EvidenceRow>,
}

impl EvidenceSink {
    #[must_use]
    pub fn new() -> (Self, mpsc::Receiver<EvidenceRow>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (Self { tx }, rx)
    }

    /// Drops the row (counted) when the writer is behind.
    pub fn record(&self, row: EvidenceRow) {
        if self.tx.try_send(row).is_err() {
            METRICS.record_evidence_drop();
        }
    }
}

/// Background writer: drains the channel into an append-only JSONL
/// file, flushing per batch.
pub struct EvidenceWriter {
    path: String,
    rx: mpsc::Receiver<EvidenceRow>,
}

impl EvidenceWriter {
    #[must_use]
    pub fn new(path: String, rx: mpsc::Receiver<EvidenceRow>) -> Self {
        Self { path, rx }
    }

    pub async fn run(mut self, token: CancellationToken) -> anyhow::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Could not open evidence file {}", self.path))?;
        let mut writer = BufWriter::new(file);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                row = self.rx.recv() => {
                    let Some(row) = row else { break };
                    if let Err(e) = Self::write_row(&mut writer, &row).await {
                        error!(error = %e, "Evidence write failed");
                    }
                    // Drain whatever else is queued before flushing.
                    while let Ok(row) = self.rx.try_recv() {
                        if let Err(e) = Self::write_row(&mut writer, &row).await {
                            error!(error = %e, "Evidence write failed");
                        }
                    }
                    writer.flush().await?;
                }
            }
        }

        writer.flush().await?;
        Ok(())
    }

    async fn write_row(
        writer: &mut BufWriter<tokio::fs::File>,
        row: &EvidenceRow,
    ) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(row)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        Ok(())
    }
}

/// Offline schema check over an evidence file. Returns the row count;
/// fails on the first malformed line. In strict mode, unknown keys are
/// also rejected.
pub fn verify_schema(path: &str, strict: bool) -> anyhow::Result<usize> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read evidence file {path}"))?;

    let mut rows = 0;
    for (number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        if strict {
            let value: serde_json::Value = serde_json::from_str(line)
                .with_context(|| format!("Invalid JSON at line {}", number + 1))?;
            let object = value
                .as_object()
                .with_context(|| format!("Row is not an object at line {}", number + 1))?;
            const KNOWN: [&str; 7] =
                ["kind", "ts", "pool", "venue", "reason", "profit_est", "sig"];
            for key in object.keys() {
                if !KNOWN.contains(&key.as_str()) {
                    anyhow::bail!("Unknown key {key:?} at line {}", number + 1);
                }
            }
        }

        serde_json::from_str::<EvidenceRow>(line)
            .with_context(|| format!("Schema mismatch at line {}", number + 1))?;
        rows += 1;
    }

    Ok(rows)
}
