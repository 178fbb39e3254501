//! Graphviz dump of the creator graph below a variable.

use std::collections::HashMap;

use petgraph::dot::{Config, Dot};
use petgraph::graph::NodeIndex;
use petgraph::Graph;

use crate::backward::ReadySet;
use crate::function::Function;
use crate::variable::Variable;

fn var_label(v: &Variable, verbose: bool) -> String {
    let name = v.name().unwrap_or_default();
    if verbose {
        format!("{name}({})", v.data())
    } else {
        name
    }
}

/// Builder that assigns one node per variable and per function.
struct DotBuilder {
    graph: Graph<String, &'static str>,
    vars: HashMap<usize, NodeIndex>,
    verbose: bool,
}

impl DotBuilder {
    fn var_node(&mut self, v: &Variable) -> NodeIndex {
        if let Some(&idx) = self.vars.get(&v.id()) {
            return idx;
        }
        let idx = self.graph.add_node(var_label(v, self.verbose));
        self.vars.insert(v.id(), idx);
        idx
    }

    fn func_node(&mut self, f: &Function) -> NodeIndex {
        let idx = self.graph.add_node(f.name().to_string());
        for x in f.inputs() {
            let xi = self.var_node(x);
            self.graph.add_edge(xi, idx, "");
        }
        for y in f.outputs().into_iter().flatten() {
            let yi = self.var_node(&y);
            self.graph.add_edge(idx, yi, "");
        }
        idx
    }
}

/// Render the graph reachable from `root` in DOT format. Variable nodes are
/// labelled by name, or `name(data)` when `verbose`; function nodes by op
/// name. Traversal follows descending generation, so output is stable for a
/// given graph.
pub fn get_dot_graph(root: &Variable, verbose: bool) -> String {
    let mut b = DotBuilder {
        graph: Graph::new(),
        vars: HashMap::new(),
        verbose,
    };
    b.var_node(root);

    let mut pending = ReadySet::new();
    if let Some(f) = root.creator() {
        pending.push(f);
    }
    while let Some(f) = pending.pop() {
        b.func_node(&f);
        for x in f.inputs() {
            if let Some(c) = x.creator() {
                pending.push(c);
            }
        }
    }

    format!("{}", Dot::with_config(&b.graph, &[Config::EdgeNoLabel]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[test]
    fn test_dot_lists_nodes_and_edges() {
        let x = Variable::constant(2.0).named("x");
        let y = ops::exp(&ops::square(&x).unwrap()).unwrap().named("y");
        let dot = get_dot_graph(&y, false);
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("label = \"x\""));
        assert!(dot.contains("label = \"y\""));
        assert!(dot.contains("label = \"Exp\""));
        assert!(dot.contains("label = \"Pow\""));
        // x -> Pow -> a -> Exp -> y
        assert_eq!(dot.matches("->").count(), 4);
    }

    #[test]
    fn test_dot_verbose_includes_data() {
        let x = Variable::constant(3.0).named("x");
        let y = ops::neg(&x).unwrap();
        let dot = get_dot_graph(&y, true);
        assert!(dot.contains("x(3)"));
        assert!(dot.contains("(-3)"));
    }

    #[test]
    fn test_dot_is_deterministic() {
        let x = Variable::new(vec![1.0, 2.0]).named("x");
        let a = ops::sin(&x).unwrap();
        let b = ops::cos(&x).unwrap();
        let y = ops::add(&a, &b).unwrap();
        assert_eq!(get_dot_graph(&y, false), get_dot_graph(&y, false));
    }

    #[test]
    fn test_dot_of_leaf() {
        let x = Variable::constant(1.0).named("leaf");
        let dot = get_dot_graph(&x, false);
        assert!(dot.contains("leaf"));
        assert!(!dot.contains("->"));
    }

    #[test]
    fn test_dot_long_chain_visits_each_function_once() {
        let x = Variable::constant(0.1).named("x");
        let mut v = x.clone();
        for _ in 0..200 {
            v = ops::add(&ops::sin(&v).unwrap(), &v).unwrap();
        }
        let dot = get_dot_graph(&v, false);
        assert_eq!(dot.matches("label = \"Sin\"").count(), 200);
        assert_eq!(dot.matches("label = \"Add\"").count(), 200);
        // sin: 1 in + 1 out, add: 2 in + 1 out
        assert_eq!(dot.matches("->").count(), 200 * 5);
    }
}
