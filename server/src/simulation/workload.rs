//! Workload generator for deterministic simulation testing.
//!
//! Generates random but reproducible [`ClientRequest`] sequences over a
//! bounded key pool, including malformed requests that must be rejected
//! without touching state.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{ClientRequest, FieldSet, Record};

/// Configuration for workload generation.
///
/// The operation rates are cumulative thresholds over `[0, 1)`: a draw below
/// `read_rate` is a read, below `read_rate + scan_rate` a scan, and so on;
/// whatever is left over is an insert.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Table every request targets.
    pub table: String,
    /// Probability of generating a malformed request (0.0 - 1.0).
    pub malformed_rate: f64,
    pub read_rate: f64,
    pub scan_rate: f64,
    pub update_rate: f64,
    pub delete_rate: f64,
    /// Number of distinct keys; a small pool promotes overwrites and
    /// duplicate timestamps.
    pub key_pool_size: usize,
    /// Fields per record (`field0`, `field1`, ...).
    pub field_count: usize,
    /// Upper bound of a scan's record count.
    pub max_scan_length: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            table: "usertable".to_string(),
            malformed_rate: 0.0,
            read_rate: 0.4,
            scan_rate: 0.1,
            update_rate: 0.2,
            delete_rate: 0.05,
            key_pool_size: 20,
            field_count: 4,
            max_scan_length: 10,
        }
    }
}

/// Ways a generated request can be malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformation {
    MissingTable,
    MissingKey,
    MissingValue,
    MissingColumn,
}

impl Malformation {
    pub const ALL: [Self; 4] = [
        Self::MissingTable,
        Self::MissingKey,
        Self::MissingValue,
        Self::MissingColumn,
    ];
}

/// Seeded generator of client requests.
///
/// Produces the same sequence of requests (up to request ids) given the
/// same seed and configuration.
#[derive(Debug)]
pub struct WorkloadGenerator {
    rng: StdRng,
    config: WorkloadConfig,
    keys: Vec<String>,
}

impl WorkloadGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, WorkloadConfig::default())
    }

    #[must_use]
    pub fn with_config(seed: u64, config: WorkloadConfig) -> Self {
        let keys = (0..config.key_pool_size.max(1))
            .map(|i| format!("user{i:04}"))
            .collect();
        Self {
            rng: StdRng::seed_from_u64(seed),
            config,
            keys,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &WorkloadConfig {
        &self.config
    }

    /// The key pool, in key order.
    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Generate the next request.
    pub fn next_request(&mut self) -> ClientRequest {
        if self.rng.random::<f64>() < self.config.malformed_rate {
            let malformation = Malformation::ALL[self.rng.random_range(0..Malformation::ALL.len())];
            return self.malformed(malformation);
        }

        let draw = self.rng.random::<f64>();
        let table = self.config.table.clone();
        let key = self.random_key();
        let mut threshold = self.config.read_rate;
        if draw < threshold {
            return ClientRequest::read(table, key, self.random_fields());
        }
        threshold += self.config.scan_rate;
        if draw < threshold {
            let count = self.rng.random_range(1..=self.config.max_scan_length.max(1));
            return ClientRequest::scan(table, key, count, self.random_fields());
        }
        threshold += self.config.update_rate;
        if draw < threshold {
            let values = self.random_record(false);
            return ClientRequest::update(table, key, values);
        }
        threshold += self.config.delete_rate;
        if draw < threshold {
            return ClientRequest::delete(table, key);
        }
        let values = self.random_record(true);
        ClientRequest::insert(table, key, values)
    }

    /// Generate a request with a specific malformation.
    pub fn malformed(&mut self, malformation: Malformation) -> ClientRequest {
        let table = self.config.table.clone();
        let key = self.random_key();
        match malformation {
            Malformation::MissingTable => {
                let values = self.random_record(true);
                ClientRequest::insert("", key, values)
            }
            Malformation::MissingKey => ClientRequest::read(table, "", None),
            Malformation::MissingValue => ClientRequest::update(table, key, Record::new()),
            Malformation::MissingColumn => {
                ClientRequest::insert(table, key, Record::new().with("", "orphan"))
            }
        }
    }

    fn random_key(&mut self) -> String {
        let index = self.rng.random_range(0..self.keys.len());
        self.keys[index].clone()
    }

    /// A full record, or a non-empty subset of the fields for updates.
    fn random_record(&mut self, full: bool) -> Record {
        let field_count = self.config.field_count.max(1);
        let mut record = Record::new();
        for i in 0..field_count {
            if full || self.rng.random_bool(0.5) {
                record.insert(format!("field{i}"), self.random_value());
            }
        }
        if record.is_empty() {
            record.insert("field0", self.random_value());
        }
        record
    }

    fn random_value(&mut self) -> String {
        let len = self.rng.random_range(1..=16);
        (0..len)
            .map(|_| char::from(self.rng.random_range(b'a'..=b'z')))
            .collect()
    }

    fn random_fields(&mut self) -> Option<FieldSet> {
        if self.rng.random_bool(0.7) {
            return None;
        }
        let field = self.rng.random_range(0..self.config.field_count.max(1));
        Some([format!("field{field}")].into())
    }
}
