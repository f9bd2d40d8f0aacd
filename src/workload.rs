//! A fixed insert/search/remove workload run against one table.

use hashtables::{
    BucketStrategy, Collision, HashFunction, HashTable, Key, Multiplier, Operation, Probing,
    StructuralReport, TableConfig, Variable, build,
};
use log::{debug, info};

use crate::Error;

pub const DEFAULT_KEYS: usize = 10_000;
const INITIAL_CAPACITY: usize = 16;

/// One strategy combination to run the workload against
#[derive(Debug, Clone)]
pub struct Setup {
    pub name: String,
    pub collision: Collision,
    pub config: TableConfig,
}

/// What one run left behind
#[derive(Debug, Clone)]
pub struct Run {
    pub name: String,
    pub report: StructuralReport,
    pub hits: usize,
    pub misses: usize,
    pub removed: usize,
    /// Mean steps per operation, in [`Operation::ALL`] order
    pub mean_steps: Vec<(Operation, f64)>,
}

/// Every collision strategy crossed with every hash function
pub fn setups() -> Vec<Setup> {
    let functions = [
        HashFunction::Modulo,
        HashFunction::Folding,
        HashFunction::Multiplicative(Multiplier::GoldenRatio),
        HashFunction::Multiplicative(Multiplier::Euler),
        HashFunction::Multiplicative(Multiplier::Pi),
    ];

    let mut out = Vec::new();
    for hash in functions {
        let base = TableConfig::default()
            .with_hash_function(hash)
            .with_auto_shrinking(true);
        let layouts = [
            ("append", Collision::Chaining, base.clone()),
            (
                "sorted",
                Collision::Chaining,
                base.clone().with_bucket_strategy(BucketStrategy::Sorted),
            ),
            (
                "linear",
                Collision::Open,
                base.clone().with_probing(Probing::Linear),
            ),
            (
                "double",
                Collision::Open,
                base.clone().with_probing(Probing::DoubleHash),
            ),
        ];
        for (layout, collision, config) in layouts {
            out.push(Setup {
                name: format!("{layout}/{}", hash_name(hash)),
                collision,
                config,
            });
        }
    }
    out
}

fn hash_name(hash: HashFunction) -> &'static str {
    match hash {
        HashFunction::Modulo => "modulo",
        HashFunction::Folding => "folding",
        HashFunction::Multiplicative(Multiplier::GoldenRatio) => "golden",
        HashFunction::Multiplicative(Multiplier::Euler) => "euler",
        HashFunction::Multiplicative(Multiplier::Pi) => "pi",
    }
}

/// Keys `0..n`, every other one as a string
pub fn keys(n: usize) -> Vec<Key> {
    (0..n)
        .map(|i| {
            if i % 2 == 0 {
                Key::Int(i as i64)
            } else {
                Key::Str(format!("key-{i}"))
            }
        })
        .collect()
}

/// Inserts every key, searches each of them plus as many absent ones,
/// then removes the first half
pub fn run(setup: &Setup, keys: &[Key]) -> Result<Run, Error> {
    let mut table = build::<usize>(setup.collision, INITIAL_CAPACITY, setup.config.clone())?;

    for (i, key) in keys.iter().enumerate() {
        table.try_insert(key.clone(), i)?;
    }

    let mut hits = 0;
    for key in keys {
        if table.search(key).is_some() {
            hits += 1;
        }
    }

    let mut misses = 0;
    for i in 0..keys.len() {
        if table.search(&Key::Str(format!("absent-{i}"))).is_none() {
            misses += 1;
        }
    }

    let removed = keys[..keys.len() / 2]
        .iter()
        .filter(|key| table.remove(key))
        .count();

    Ok(summarize(setup, &*table, hits, misses, removed))
}

fn summarize(
    setup: &Setup,
    table: &dyn HashTable<usize>,
    hits: usize,
    misses: usize,
    removed: usize,
) -> Run {
    let report = table.structural_report();
    let metrics = table.metrics();

    for (op, var, s) in metrics.summaries() {
        if var == Variable::Steps || var == Variable::WallTime {
            debug!(
                target: "workload",
                "{} {op} {var}: n={} mean={:.3e} stdev={:.3e} min={:.3e} max={:.3e}",
                setup.name, s.count, s.mean, s.stdev, s.min, s.max
            );
        }
    }

    let mean_steps: Vec<(Operation, f64)> = Operation::ALL
        .into_iter()
        .filter_map(|op| {
            metrics
                .summary(op, Variable::Steps)
                .map(|s| (op, s.mean))
        })
        .collect();

    info!(
        "{:<16} cap={:<6} size={:<6} lf={:.3} longest={:<3} filled={:<6} stdev={:.3} steps/op={}",
        setup.name,
        report.capacity,
        report.size,
        report.load_factor,
        report.max_length,
        report.count_filled,
        report.stdev,
        mean_steps
            .iter()
            .map(|(op, mean)| format!("{op}:{mean:.1}"))
            .collect::<Vec<_>>()
            .join(" ")
    );

    Run {
        name: setup.name.clone(),
        report,
        hits,
        misses,
        removed,
        mean_steps,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_setup_survives_the_workload() {
        let keys = keys(300);
        let setups = setups();
        assert_eq!(setups.len(), 20);

        for setup in &setups {
            let run = run(setup, &keys).unwrap();
            assert_eq!(run.hits, 300, "{}", run.name);
            assert_eq!(run.misses, 300, "{}", run.name);
            assert_eq!(run.removed, 150, "{}", run.name);
            assert_eq!(run.report.size, 150, "{}", run.name);
            assert!(run.mean_steps.iter().any(|(op, _)| *op == Operation::Resize));
        }
    }

    #[test]
    fn keys_mix_both_kinds() {
        let ks = keys(4);
        assert_eq!(ks[0], Key::Int(0));
        assert_eq!(ks[1], Key::Str("key-1".into()));
        assert_eq!(ks[3], Key::Str("key-3".into()));
    }
}
