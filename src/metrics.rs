// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus counters for probe outcomes and admission control.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Metric handles plus the registry they are exported from.
pub struct Metrics {
    registry: Registry,
    probe_outcomes: IntCounterVec,
    admission_rejected: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let probe_outcomes = IntCounterVec::new(
            Opts::new("url_probe_outcomes_total", "Probe outcomes by probe and result"),
            &["probe", "outcome"],
        )?;
        let admission_rejected = IntCounter::new(
            "url_probe_admission_rejected_total",
            "Requests rejected by per-client admission control",
        )?;

        registry.register(Box::new(probe_outcomes.clone()))?;
        registry.register(Box::new(admission_rejected.clone()))?;

        Ok(Self {
            registry,
            probe_outcomes,
            admission_rejected,
        })
    }

    pub fn record_outcome(&self, probe: &str, outcome: &str) {
        self.probe_outcomes.with_label_values(&[probe, outcome]).inc();
    }

    pub fn record_rejection(&self) {
        self.admission_rejected.inc();
    }

    pub fn outcome_count(&self, probe: &str, outcome: &str) -> u64 {
        self.probe_outcomes.with_label_values(&[probe, outcome]).get()
    }

    pub fn rejection_count(&self) -> u64 {
        self.admission_rejected.get()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
