//! Append-only observation log kept per table and per slot.

use std::fmt;

/// The tracked operations, `Total` receives a copy of every observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Search,
    Insert,
    Remove,
    Resize,
    Total,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Search,
        Operation::Insert,
        Operation::Remove,
        Operation::Resize,
        Operation::Total,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::Insert => "insert",
            Operation::Remove => "remove",
            Operation::Resize => "resize",
            Operation::Total => "total",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The measured variables of one observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    /// Abstract algorithmic steps
    Steps,
    /// CPU time of the whole process, seconds
    ProcessTime,
    /// Wall clock, seconds
    WallTime,
    UserCpuTime,
    SystemCpuTime,
    /// Highest traced heap usage above the starting point, bytes
    MemoryPeak,
    /// Traced heap usage after minus before, bytes
    MemoryDelta,
    /// Resident set size reported by the OS, bytes
    MemoryResident,
}

impl Variable {
    pub const ALL: [Variable; 8] = [
        Variable::Steps,
        Variable::ProcessTime,
        Variable::WallTime,
        Variable::UserCpuTime,
        Variable::SystemCpuTime,
        Variable::MemoryPeak,
        Variable::MemoryDelta,
        Variable::MemoryResident,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variable::Steps => "steps",
            Variable::ProcessTime => "process_time",
            Variable::WallTime => "wall_time",
            Variable::UserCpuTime => "user_cpu_time",
            Variable::SystemCpuTime => "system_cpu_time",
            Variable::MemoryPeak => "memory_peak",
            Variable::MemoryDelta => "memory_delta",
            Variable::MemoryResident => "memory_resident",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One measurement of one operation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Observation {
    pub steps: u64,
    pub process_time: f64,
    pub wall_time: f64,
    pub user_cpu_time: f64,
    pub system_cpu_time: f64,
    pub memory_peak: u64,
    pub memory_delta: i64,
    pub memory_resident: u64,
}

impl Observation {
    pub fn get(&self, var: Variable) -> f64 {
        match var {
            Variable::Steps => self.steps as f64,
            Variable::ProcessTime => self.process_time,
            Variable::WallTime => self.wall_time,
            Variable::UserCpuTime => self.user_cpu_time,
            Variable::SystemCpuTime => self.system_cpu_time,
            Variable::MemoryPeak => self.memory_peak as f64,
            Variable::MemoryDelta => self.memory_delta as f64,
            Variable::MemoryResident => self.memory_resident as f64,
        }
    }
}

/// Aggregate of one observation sequence, variance is the population one
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub sum: f64,
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub stdev: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Returns `None` for an empty sequence
    pub fn of<I>(values: I) -> Option<Summary>
    where
        I: IntoIterator<Item = f64>,
        I::IntoIter: Clone,
    {
        let values = values.into_iter();

        let mut count = 0usize;
        let mut sum = 0f64;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values.clone() {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return None;
        }

        let mean = sum / count as f64;
        let ss: f64 = values.map(|v| (v - mean) * (v - mean)).sum();
        let variance = ss / count as f64;

        Some(Summary {
            sum,
            count,
            mean,
            variance,
            stdev: variance.sqrt(),
            min,
            max,
        })
    }
}

/// Observations grouped by operation, in recording order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    by_operation: [Vec<Observation>; 5],
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `obs` under `op` and under [`Operation::Total`]
    ///
    /// # Panics
    ///
    /// Recording directly under `Total` panics in debug builds
    pub fn record(&mut self, op: Operation, obs: Observation) {
        debug_assert_ne!(op, Operation::Total, "total is derived from the others");
        self.by_operation[op.slot()].push(obs);
        self.by_operation[Operation::Total.slot()].push(obs);
    }

    pub fn observations(&self, op: Operation) -> &[Observation] {
        &self.by_operation[op.slot()]
    }

    pub fn count(&self, op: Operation) -> usize {
        self.observations(op).len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations(Operation::Total).is_empty()
    }

    /// The sequence of values of `var` recorded under `op`
    pub fn series(&self, op: Operation, var: Variable) -> impl Iterator<Item = f64> + Clone + '_ {
        self.observations(op).iter().map(move |o| o.get(var))
    }

    pub fn last(&self, op: Operation) -> Option<&Observation> {
        self.observations(op).last()
    }

    pub fn summary(&self, op: Operation, var: Variable) -> Option<Summary> {
        Summary::of(self.series(op, var))
    }

    /// Summaries of every non-empty `(operation, variable)` pair
    pub fn summaries(&self) -> Vec<(Operation, Variable, Summary)> {
        let mut out = Vec::new();
        for op in Operation::ALL {
            for var in Variable::ALL {
                if let Some(s) = self.summary(op, var) {
                    out.push((op, var, s));
                }
            }
        }
        out
    }

    pub fn clear(&mut self) {
        for obs in &mut self.by_operation {
            obs.clear();
        }
    }
}
