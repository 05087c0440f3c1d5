//! Dependency graph logic for ordering table operations
//!
//! This module provides functions to:
//! - Collect foreign-key references from table schemas
//! - Build an index-based dependency graph between tables
//! - Detect cycles in that graph
//! - Produce insert order (dependencies first) and delete order
//!
//! Cycles never make the sort fail. Edges inside a detected cycle are ignored
//! for ordering, and tables that still cannot be drained are appended in input
//! order so every table is processed exactly once.

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::Value;

use crate::sync::types::DependencyAnalysisResult;

/// Schema keyword naming the table a field references
pub const FOREIGN_KEY: &str = "foreignKey";

const CYCLE_SUGGESTION: &str = "Consider making one of the foreign key fields optional, \
     or sync the affected tables in separate passes";

/// Collect every foreign-key reference found anywhere in a schema
///
/// Walks objects and arrays recursively, so references nested under
/// `properties`, `items` or combinators like `anyOf` are all found.
/// References are returned in discovery order without duplicates.
pub fn collect_foreign_keys(schema: &Value) -> Vec<String> {
    let mut found = Vec::new();
    walk_schema(schema, &mut found);
    found
}

fn walk_schema(node: &Value, found: &mut Vec<String>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get(FOREIGN_KEY) {
                if !found.contains(target) {
                    found.push(target.clone());
                }
            }
            for child in map.values() {
                walk_schema(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_schema(item, found);
            }
        }
        _ => {}
    }
}

/// Dependency graph for a set of tables
///
/// Tables live in an arena indexed by position; edges point from a table to
/// the tables it references.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    tables: Vec<String>,
    index: HashMap<String, usize>,
    /// Adjacency list: table -> tables it references
    dependencies: Vec<Vec<usize>>,
    /// Reverse adjacency: table -> tables that reference it
    dependents: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Build a dependency graph from tables and their schemas
    ///
    /// Input order is kept and decides ties. A missing schema means no
    /// dependencies. References to tables outside the input and
    /// self-references are dropped.
    pub fn build(schemas: &[(String, Option<Value>)]) -> Self {
        let mut graph = DependencyGraph::default();

        for (name, _) in schemas {
            if !graph.index.contains_key(name) {
                graph.index.insert(name.clone(), graph.tables.len());
                graph.tables.push(name.clone());
            }
        }
        graph.dependencies = vec![Vec::new(); graph.tables.len()];
        graph.dependents = vec![Vec::new(); graph.tables.len()];

        for (name, schema) in schemas {
            let Some(schema) = schema else { continue };
            let from = graph.index[name];

            for target in collect_foreign_keys(schema) {
                let Some(&to) = graph.index.get(&target) else {
                    log::debug!("{} references unknown table {}, ignoring", name, target);
                    continue;
                };
                if to == from || graph.dependencies[from].contains(&to) {
                    continue;
                }
                graph.dependencies[from].push(to);
                graph.dependents[to].push(from);
            }
        }

        for list in graph.dependents.iter_mut() {
            list.sort_unstable();
        }

        graph
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    /// Tables that `table` references
    pub fn dependencies_of(&self, table: &str) -> Vec<&str> {
        self.neighbours(table, &self.dependencies)
    }

    /// Tables that reference `table`
    pub fn dependents_of(&self, table: &str) -> Vec<&str> {
        self.neighbours(table, &self.dependents)
    }

    fn neighbours<'a>(&'a self, table: &str, adjacency: &[Vec<usize>]) -> Vec<&'a str> {
        self.index
            .get(table)
            .map(|&i| adjacency[i].iter().map(|&j| self.tables[j].as_str()).collect())
            .unwrap_or_default()
    }

    /// Find cycles with a depth-first search
    ///
    /// Each cycle is the path from the revisited table back to itself, so a
    /// two-table cycle reads `[a, b, a]`. Cycles with the same members are
    /// reported once.
    pub fn find_cycles(&self) -> Vec<Vec<String>> {
        let mut visited = vec![false; self.len()];
        let mut on_stack = vec![false; self.len()];
        let mut stack = Vec::new();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        let mut cycles = Vec::new();

        for start in 0..self.len() {
            if !visited[start] {
                self.visit(
                    start,
                    &mut visited,
                    &mut on_stack,
                    &mut stack,
                    &mut seen,
                    &mut cycles,
                );
            }
        }

        cycles
            .into_iter()
            .map(|cycle: Vec<usize>| cycle.into_iter().map(|i| self.tables[i].clone()).collect())
            .collect()
    }

    fn visit(
        &self,
        node: usize,
        visited: &mut [bool],
        on_stack: &mut [bool],
        stack: &mut Vec<usize>,
        seen: &mut HashSet<Vec<usize>>,
        cycles: &mut Vec<Vec<usize>>,
    ) {
        visited[node] = true;
        on_stack[node] = true;
        stack.push(node);

        for &next in &self.dependencies[node] {
            if on_stack[next] {
                let Some(pos) = stack.iter().position(|&n| n == next) else {
                    continue;
                };
                let mut members = stack[pos..].to_vec();
                members.sort_unstable();
                if seen.insert(members) {
                    let mut cycle = stack[pos..].to_vec();
                    cycle.push(next);
                    cycles.push(cycle);
                }
            } else if !visited[next] {
                self.visit(next, visited, on_stack, stack, seen, cycles);
            }
        }

        stack.pop();
        on_stack[node] = false;
    }

    /// Sort tables so dependencies come before dependents
    ///
    /// Uses Kahn's algorithm, ignoring edges between members of the same
    /// detected cycle. Tables left over are appended in input order.
    pub fn analyze(&self) -> DependencyAnalysisResult {
        let cycles = self.find_cycles();

        // cycle id per table; a table in several cycles keeps all of them
        let mut cycle_membership: Vec<Vec<usize>> = vec![Vec::new(); self.len()];
        for (id, cycle) in cycles.iter().enumerate() {
            for name in cycle {
                let i = self.index[name];
                if !cycle_membership[i].contains(&id) {
                    cycle_membership[i].push(id);
                }
            }
        }
        let same_cycle = |a: usize, b: usize| {
            cycle_membership[a]
                .iter()
                .any(|id| cycle_membership[b].contains(id))
        };

        // in-degree = number of dependencies still to be placed
        let mut in_degree: Vec<usize> = (0..self.len())
            .map(|i| {
                self.dependencies[i]
                    .iter()
                    .filter(|&&dep| !same_cycle(i, dep))
                    .count()
            })
            .collect();

        let mut queue: VecDeque<usize> = (0..self.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut placed = vec![false; self.len()];
        let mut order = Vec::with_capacity(self.len());

        while let Some(table) = queue.pop_front() {
            placed[table] = true;
            order.push(table);

            for &dependent in &self.dependents[table] {
                if same_cycle(table, dependent) {
                    continue;
                }
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        for (i, done) in placed.iter().enumerate() {
            if !done {
                log::debug!("Appending {} after topological sort", self.tables[i]);
                order.push(i);
            }
        }

        let mut warnings: Vec<String> = cycles
            .iter()
            .map(|cycle| format!("Circular dependency detected: {}", cycle.join(" → ")))
            .collect();
        if !cycles.is_empty() {
            warnings.push(CYCLE_SUGGESTION.to_string());
        }

        DependencyAnalysisResult {
            sorted_tables: order.into_iter().map(|i| self.tables[i].clone()).collect(),
            cycles,
            warnings,
        }
    }

    /// Get insert order (dependencies before dependents)
    pub fn insert_order(&self) -> Vec<String> {
        self.analyze().sorted_tables
    }

    /// Get delete order (dependents before dependencies - reverse of insert)
    pub fn delete_order(&self) -> Vec<String> {
        let mut order = self.insert_order();
        order.reverse();
        order
    }
}

/// Resolve a safe processing order for tables and their schemas
pub fn resolve_dependencies(schemas: &[(String, Option<Value>)]) -> DependencyAnalysisResult {
    let result = DependencyGraph::build(schemas).analyze();
    for warning in &result.warnings {
        log::warn!("{}", warning);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_schema(references: &[&str]) -> Option<Value> {
        let properties: serde_json::Map<String, Value> = references
            .iter()
            .map(|target| {
                (
                    format!("{}Id", target),
                    json!({"type": "string", "foreignKey": target}),
                )
            })
            .collect();
        Some(json!({"type": "object", "properties": properties}))
    }

    fn table(name: &str, references: &[&str]) -> (String, Option<Value>) {
        (name.to_string(), make_schema(references))
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|t| t == name).unwrap()
    }

    #[test]
    fn test_collect_nested_foreign_keys() {
        let schema = json!({
            "type": "object",
            "properties": {
                "author": {"type": "string", "foreignKey": "users"},
                "gallery": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "image": {"type": "string", "foreignKey": "images"}
                        }
                    }
                },
                "editor": {"anyOf": [{"type": "string", "foreignKey": "users"}]}
            }
        });

        let mut refs = collect_foreign_keys(&schema);
        refs.sort();
        assert_eq!(refs, vec!["images", "users"]);
    }

    #[test]
    fn test_collect_ignores_malformed_schema() {
        assert!(collect_foreign_keys(&json!("not a schema")).is_empty());
        assert!(collect_foreign_keys(&json!({"foreignKey": 42})).is_empty());
        assert!(collect_foreign_keys(&Value::Null).is_empty());
    }

    #[test]
    fn test_chain_sorts_dependencies_first() {
        let result = resolve_dependencies(&[
            table("users", &["posts"]),
            table("posts", &["images"]),
            table("images", &[]),
        ]);

        assert_eq!(result.sorted_tables, vec!["images", "posts", "users"]);
        assert!(result.cycles.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_two_table_cycle_keeps_both() {
        let result =
            resolve_dependencies(&[table("users", &["posts"]), table("posts", &["users"])]);

        assert_eq!(result.sorted_tables.len(), 2);
        assert!(result.sorted_tables.contains(&"users".to_string()));
        assert!(result.sorted_tables.contains(&"posts".to_string()));

        assert_eq!(result.cycles.len(), 1);
        let cycle = &result.cycles[0];
        assert!(cycle.contains(&"users".to_string()));
        assert!(cycle.contains(&"posts".to_string()));

        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.contains("users") && w.contains("posts"))
        );
        assert_eq!(result.warnings[0], "Circular dependency detected: users → posts → users");
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_cycle_members_still_follow_outside_dependencies() {
        // users <-> posts, both reference images; comments references posts
        let result = resolve_dependencies(&[
            table("comments", &["posts"]),
            table("users", &["posts", "images"]),
            table("posts", &["users", "images"]),
            table("images", &[]),
        ]);

        let order = &result.sorted_tables;
        assert_eq!(order.len(), 4);
        assert!(position(order, "images") < position(order, "users"));
        assert!(position(order, "images") < position(order, "posts"));
        assert!(position(order, "posts") < position(order, "comments"));
    }

    #[test]
    fn test_self_reference_and_unknown_tables_ignored() {
        let graph = DependencyGraph::build(&[
            table("categories", &["categories", "external"]),
            table("products", &["categories"]),
        ]);

        assert!(graph.dependencies_of("categories").is_empty());
        assert_eq!(graph.dependencies_of("products"), vec!["categories"]);
        assert_eq!(graph.dependents_of("categories"), vec!["products"]);

        let result = graph.analyze();
        assert!(result.cycles.is_empty());
        assert_eq!(result.sorted_tables, vec!["categories", "products"]);
    }

    #[test]
    fn test_missing_schema_has_no_dependencies() {
        let result = resolve_dependencies(&[
            ("orders".to_string(), None),
            table("customers", &[]),
            table("invoices", &["orders"]),
        ]);

        assert_eq!(result.sorted_tables, vec!["orders", "customers", "invoices"]);
    }

    #[test]
    fn test_duplicate_references_counted_once() {
        let schema = json!({
            "properties": {
                "primary": {"foreignKey": "images"},
                "secondary": {"foreignKey": "images"}
            }
        });
        let graph = DependencyGraph::build(&[
            ("posts".to_string(), Some(schema)),
            table("images", &[]),
        ]);

        assert_eq!(graph.dependencies_of("posts"), vec!["images"]);
        assert_eq!(graph.insert_order(), vec!["images", "posts"]);
    }

    #[test]
    fn test_delete_order_is_reverse() {
        let graph = DependencyGraph::build(&[
            table("users", &["posts"]),
            table("posts", &["images"]),
            table("images", &[]),
        ]);

        assert_eq!(graph.delete_order(), vec!["users", "posts", "images"]);
    }

    #[test]
    fn test_three_table_cycle() {
        let result = resolve_dependencies(&[
            table("a", &["b"]),
            table("b", &["c"]),
            table("c", &["a"]),
            table("d", &["c"]),
        ]);

        assert_eq!(result.cycles, vec![vec!["a", "b", "c", "a"]]);
        assert_eq!(result.sorted_tables.len(), 4);
        // a, b and c drain once their in-cycle edges are ignored
        assert!(position(&result.sorted_tables, "c") < position(&result.sorted_tables, "d"));
    }

    #[test]
    fn test_empty_input() {
        let result = resolve_dependencies(&[]);
        assert!(result.sorted_tables.is_empty());
        assert!(DependencyGraph::build(&[]).is_empty());
    }
}
