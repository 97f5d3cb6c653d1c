//! Aggregate executor.

use crate::ast::AggregateFunc;
use crate::executor::{Relation, RelationEntry, SharedTables};
use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use velio_core::{Row, Value};
use libm::{exp, log, sqrt};

/// Aggregate executor - computes aggregate functions.
pub struct AggregateExecutor {
    /// Group by column indices.
    group_by: Vec<usize>,
    /// Aggregates to compute: (function, column_index).
    aggregates: Vec<(AggregateFunc, Option<usize>)>,
}

impl AggregateExecutor {
    /// Creates a new aggregate executor.
    pub fn new(group_by: Vec<usize>, aggregates: Vec<(AggregateFunc, Option<usize>)>) -> Self {
        Self {
            group_by,
            aggregates,
        }
    }

    /// Creates an aggregate executor with no grouping.
    pub fn no_group(aggregates: Vec<(AggregateFunc, Option<usize>)>) -> Self {
        Self::new(Vec::new(), aggregates)
    }

    /// Executes the aggregation on the input relation.
    pub fn execute(&self, input: Relation) -> Relation {
        let tables = input.tables().to_vec();
        let shared_tables: SharedTables = tables.clone().into();
        // After aggregation, the result has a new column structure
        let result_column_count = self.group_by.len() + self.aggregates.len();

        if self.group_by.is_empty() {
            // No grouping - aggregate entire relation
            // Compute version as sum of all input row versions for change detection
            let version_sum: u64 = input.iter().map(|e| e.row.version()).sum();
            let values = self.compute_aggregates(input.iter());
            let entry = RelationEntry::new_combined(
                Rc::new(Row::dummy_with_version(version_sum, values)),
                shared_tables,
            );
            return Relation {
                entries: alloc::vec![entry],
                tables,
                table_column_counts: alloc::vec![result_column_count],
            };
        }

        // Group by specified columns
        let mut groups: BTreeMap<String, Vec<&RelationEntry>> = BTreeMap::new();

        for entry in input.iter() {
            let key = self.make_group_key(entry);
            groups.entry(key).or_default().push(entry);
        }

        let entries: Vec<RelationEntry> = groups
            .into_iter()
            .map(|(_, group_entries)| {
                let mut values = Vec::new();

                // Compute version as sum of group row versions for change detection
                let version_sum: u64 = group_entries.iter().map(|e| e.row.version()).sum();

                // Add group by values
                if let Some(first) = group_entries.first() {
                    for &idx in &self.group_by {
                        values.push(first.get_field(idx).cloned().unwrap_or(Value::Null));
                    }
                }

                // Add aggregate values
                let agg_values = self.compute_aggregates(group_entries.iter().copied());
                values.extend(agg_values);

                RelationEntry::new_combined(
                    Rc::new(Row::dummy_with_version(version_sum, values)),
                    shared_tables.clone(),
                )
            })
            .collect();

        Relation {
            entries,
            tables,
            table_column_counts: alloc::vec![result_column_count],
        }
    }

    fn make_group_key(&self, entry: &RelationEntry) -> String {
        self.group_by
            .iter()
            .map(|&idx| {
                entry
                    .get_field(idx)
                    .map(value_to_string)
                    .unwrap_or_else(|| String::from("null"))
            })
            .collect::<Vec<_>>()
            .join("|")
    }

    fn compute_aggregates<'a>(
        &self,
        entries: impl Iterator<Item = &'a RelationEntry>,
    ) -> Vec<Value> {
        let entries: Vec<_> = entries.collect();

        self.aggregates
            .iter()
            .map(|(func, col_idx)| self.compute_single_aggregate(*func, *col_idx, &entries))
            .collect()
    }

    fn compute_single_aggregate(
        &self,
        func: AggregateFunc,
        col_idx: Option<usize>,
        entries: &[&RelationEntry],
    ) -> Value {
        match func {
            AggregateFunc::Count => {
                if let Some(idx) = col_idx {
                    // COUNT(column) - count non-null values
                    let count = entries
                        .iter()
                        .filter(|e| {
                            e.get_field(idx)
                                .map(|v| !v.is_null())
                                .unwrap_or(false)
                        })
                        .count();
                    Value::Int64(count as i64)
                } else {
                    // COUNT(*) - count all rows
                    Value::Int64(entries.len() as i64)
                }
            }
            AggregateFunc::Sum => {
                let idx = col_idx.unwrap_or(0);
                let sum = entries
                    .iter()
                    .filter_map(|e| e.get_field(idx))
                    .filter(|v| !v.is_null())
                    .fold(0.0f64, |acc, v| {
                        acc + match v {
                            Value::Int32(i) => *i as f64,
                            Value::Int64(i) => *i as f64,
                            Value::Float64(f) => *f,
                            _ => 0.0,
                        }
                    });

                if entries.iter().all(|e| {
                    e.get_field(idx)
                        .map(|v| v.is_null() || matches!(v, Value::Int32(_) | Value::Int64(_)))
                        .unwrap_or(true)
                }) {
                    Value::Int64(sum as i64)
                } else {
                    Value::Float64(sum)
                }
            }
            AggregateFunc::Avg => {
                let idx = col_idx.unwrap_or(0);
                let values: Vec<f64> = entries
                    .iter()
                    .filter_map(|e| e.get_field(idx))
                    .filter(|v| !v.is_null())
                    .filter_map(|v| match v {
                        Value::Int32(i) => Some(*i as f64),
                        Value::Int64(i) => Some(*i as f64),
                        Value::Float64(f) => Some(*f),
                        _ => None,
                    })
                    .collect();

                if values.is_empty() {
                    Value::Null
                } else {
                    let sum: f64 = values.iter().sum();
                    Value::Float64(sum / values.len() as f64)
                }
            }
            AggregateFunc::Min => {
                let idx = col_idx.unwrap_or(0);
                entries
                    .iter()
                    .filter_map(|e| e.get_field(idx))
                    .filter(|v| !v.is_null())
                    .min()
                    .cloned()
                    .unwrap_or(Value::Null)
            }
            AggregateFunc::Max => {
                let idx = col_idx.unwrap_or(0);
                entries
                    .iter()
                    .filter_map(|e| e.get_field(idx))
                    .filter(|v| !v.is_null())
                    .max()
                    .cloned()
                    .unwrap_or(Value::Null)
            }
            AggregateFunc::Distinct => {
                let idx = col_idx.unwrap_or(0);
                let mut seen: BTreeMap<String, Value> = BTreeMap::new();
                for entry in entries {
                    if let Some(v) = entry.get_field(idx) {
                        let key = value_to_string(v);
                        seen.entry(key).or_insert_with(|| v.clone());
                    }
                }
                // Return count of distinct values for now
                Value::Int64(seen.len() as i64)
            }
            AggregateFunc::StdDev => {
                let idx = col_idx.unwrap_or(0);
                let values: Vec<f64> = entries
                    .iter()
                    .filter_map(|e| e.get_field(idx))
                    .filter(|v| !v.is_null())
                    .filter_map(|v| match v {
                        Value::Int32(i) => Some(*i as f64),
                        Value::Int64(i) => Some(*i as f64),
                        Value::Float64(f) => Some(*f),
                        _ => None,
                    })
                    .collect();

                if values.is_empty() {
                    Value::Null
                } else {
                    let mean: f64 = values.iter().sum::<f64>() / values.len() as f64;
                    let variance: f64 = values
                        .iter()
                        .map(|v| (v - mean) * (v - mean))
                        .sum::<f64>()
                        / values.len() as f64;
                    Value::Float64(sqrt(variance))
                }
            }
            AggregateFunc::GeoMean => {
                let idx = col_idx.unwrap_or(0);
                let values: Vec<f64> = entries
                    .iter()
                    .filter_map(|e| e.get_field(idx))
                    .filter(|v| !v.is_null())
                    .filter_map(|v| match v {
                        Value::Int32(i) => Some(*i as f64),
                        Value::Int64(i) => Some(*i as f64),
                        Value::Float64(f) => Some(*f),
                        _ => None,
                    })
                    .filter(|&v| v > 0.0)
                    .collect();

                if values.is_empty() {
                    Value::Null
                } else {
                    let log_sum: f64 = values.iter().map(|v| log(*v)).sum();
                    let geomean = exp(log_sum / values.len() as f64);
                    Value::Float64(geomean)
                }
            }
        }
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::from("null"),
        Value::Boolean(b) => alloc::format!("{}", b),
        Value::Int32(i) => alloc::format!("{}", i),
        Value::Int64(i) => alloc::format!("{}", i),
        Value::Float64(f) => alloc::format!("{}", f),
        Value::String(s) => s.clone(),
        Value::DateTime(d) => alloc::format!("{}", d),
        Value::Bytes(b) => alloc::format!("{:?}", b),
    }
}
