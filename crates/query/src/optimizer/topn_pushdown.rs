//! TopN pushdown optimization pass.
//!
//! This pass identifies `Limit -> Sort` patterns and converts them to a single
//! `TopN` operator, which is more efficient for selecting the top K elements.
//!
//! Example:
//! ```text
//! Limit(10, 0)                =>    TopN(order_by, limit=10, offset=0)
//!      |                                  |
//! Sort(order_by)                      input
//!      |
//!   input
//! ```
//!
//! Performance benefit:
//! - Full sort: O(n log n) time, O(n) space
//! - TopN with heap: O(n log k) time, O(k) space (where k = limit + offset)
//!
//! This optimization is safe because:
//! - TopN produces the same result as Sort + Limit
//! - It only applies when Limit is directly above Sort (no intervening operators)

use crate::planner::PhysicalPlan;
use alloc::boxed::Box;

/// TopN pushdown optimization pass.
///
/// Converts `Limit -> Sort` patterns to `TopN` for more efficient top-k selection.
pub struct TopNPushdown;

impl TopNPushdown {
    /// Creates a new TopNPushdown pass.
    pub fn new() -> Self {
        Self
    }

    /// Optimizes the physical plan by converting Limit+Sort to TopN.
    pub fn optimize(&self, plan: PhysicalPlan) -> PhysicalPlan {
        self.traverse(plan)
    }

    fn traverse(&self, plan: PhysicalPlan) -> PhysicalPlan {
        match plan {
            PhysicalPlan::Limit {
                input,
                limit,
                offset,
            } => {
                let optimized_input = self.traverse(*input);

                // Check if input is a Sort - if so, convert to TopN
                if let PhysicalPlan::Sort { input: sort_input, order_by } = optimized_input {
                    // Convert to TopN - more efficient for top-k selection
                    return PhysicalPlan::TopN {
                        input: sort_input,
                        order_by,
                        limit,
                        offset,
                    };
                }

                // Check if input is IndexGet - push limit into it
                if let PhysicalPlan::IndexGet { table, index, key, limit: _ } = optimized_input {
                    // Push limit into IndexGet for early termination
                    // Note: offset is handled by skipping rows after IndexGet
                    if offset == 0 {
                        return PhysicalPlan::IndexGet {
                            table,
                            index,
                            key,
                            limit: Some(limit),
                        };
                    } else {
                        // With offset, we need to fetch limit + offset rows
                        return PhysicalPlan::Limit {
                            input: Box::new(PhysicalPlan::IndexGet {
                                table,
                                index,
                                key,
                                limit: Some(limit + offset),
                            }),
                            limit,
                            offset,
                        };
                    }
                }

                // Check if input is IndexScan without limit - push limit into it
                if let PhysicalPlan::IndexScan {
                    table,
                    index,
                    range_start,
                    range_end,
                    include_start,
                    include_end,
                    limit: None,
                    offset: None,
                    reverse,
                } = optimized_input
                {
                    // Push limit into IndexScan for early termination
                    return PhysicalPlan::IndexScan {
                        table,
                        index,
                        range_start,
                        range_end,
                        include_start,
                        include_end,
                        limit: Some(limit + offset),
                        offset: Some(offset),
                        reverse,
                    };
                }

                // Not a Sort/IndexGet/IndexScan, keep as Limit
                PhysicalPlan::Limit {
                    input: Box::new(optimized_input),
                    limit,
                    offset,
                }
            }

            // Recursively process other nodes
            PhysicalPlan::Filter { input, predicate } => PhysicalPlan::Filter {
                input: Box::new(self.traverse(*input)),
                predicate,
            },

            PhysicalPlan::Project { input, columns } => PhysicalPlan::Project {
                input: Box::new(self.traverse(*input)),
                columns,
            },

            PhysicalPlan::Sort { input, order_by } => PhysicalPlan::Sort {
                input: Box::new(self.traverse(*input)),
                order_by,
            },

            PhysicalPlan::TopN {
                input,
                order_by,
                limit,
                offset,
            } => PhysicalPlan::TopN {
                input: Box::new(self.traverse(*input)),
                order_by,
                limit,
                offset,
            },

            PhysicalPlan::HashJoin {
                left,
                right,
                condition,
                join_type,
            } => PhysicalPlan::HashJoin {
                left: Box::new(self.traverse(*left)),
                right: Box::new(self.traverse(*right)),
                condition,
                join_type,
            },

            PhysicalPlan::SortMergeJoin {
                left,
                right,
                condition,
                join_type,
            } => PhysicalPlan::SortMergeJoin {
                left: Box::new(self.traverse(*left)),
                right: Box::new(self.traverse(*right)),
                condition,
                join_type,
            },

            PhysicalPlan::NestedLoopJoin {
                left,
                right,
                condition,
                join_type,
            } => PhysicalPlan::NestedLoopJoin {
                left: Box::new(self.traverse(*left)),
                right: Box::new(self.traverse(*right)),
                condition,
                join_type,
            },

            PhysicalPlan::IndexNestedLoopJoin {
                outer,
                inner_table,
                inner_index,
                condition,
                join_type,
            } => PhysicalPlan::IndexNestedLoopJoin {
                outer: Box::new(self.traverse(*outer)),
                inner_table,
                inner_index,
                condition,
                join_type,
            },

            PhysicalPlan::HashAggregate {
                input,
                group_by,
                aggregates,
            } => PhysicalPlan::HashAggregate {
                input: Box::new(self.traverse(*input)),
                group_by,
                aggregates,
            },

            PhysicalPlan::CrossProduct { left, right } => PhysicalPlan::CrossProduct {
                left: Box::new(self.traverse(*left)),
                right: Box::new(self.traverse(*right)),
            },

            PhysicalPlan::NoOp { input } => PhysicalPlan::NoOp {
                input: Box::new(self.traverse(*input)),
            },

            // Leaf nodes - no transformation
            plan @ (PhysicalPlan::TableScan { .. }
            | PhysicalPlan::IndexScan { .. }
            | PhysicalPlan::IndexGet { .. }
            | PhysicalPlan::IndexInGet { .. }
            | PhysicalPlan::Empty) => plan,
        }
    }
}

impl Default for TopNPushdown {
    fn default() -> Self {
        Self::new()
    }
}
