use std::time::{Duration, Instant};

use crate::pipeline::Stage;

/* ───────────── Stufen‑Latenzen ─────────────────────────── */

/// Wall-Clock-Zeit pro Stufe, nur zur Ausgabe.
#[derive(Debug, Default, Clone)]
pub struct StageTimings {
    times: Vec<(Stage, Duration)>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nach jeder Stufe aufrufen: `timings.record(Stage::MemoryCopy, start)`
    pub fn record(&mut self, stage: Stage, start: Instant) {
        let dur = start.elapsed();
        tracing::info!(stage = stage.label(), micros = dur.as_micros() as u64, "stage finished");
        self.times.push((stage, dur));
    }

    /// Summe, falls eine Stufe mehrfach gemessen wurde.
    pub fn get(&self, stage: Stage) -> Option<Duration> {
        let mut hits = self.times.iter().filter(|(s, _)| *s == stage).peekable();
        hits.peek()?;
        Some(hits.map(|(_, d)| *d).sum())
    }

    pub fn total(&self) -> Duration {
        self.times.iter().map(|(_, d)| *d).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, Duration)> + '_ {
        self.times.iter().copied()
    }

    /* ───────────── Zusammenfassung ausgeben ─────────────── */

    /// Eine Zeile pro Stufe, in Messreihenfolge.
    pub fn summary_lines(&self) -> Vec<String> {
        self.times
            .iter()
            .map(|(stage, dur)| format!("{} time cost: {} ms", stage.label(), dur.as_millis()))
            .collect()
    }

    /// Am Programmende aufrufen, z. B. in `main()`
    pub fn summary(&self) {
        for line in self.summary_lines() {
            println!("{line}");
        }
    }
}
