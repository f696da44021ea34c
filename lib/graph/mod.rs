//! Implements a directed graph.
//!
//! The engine uses this graph for the blocks of a `ControlFlowGraph`. Two
//! vertices may be joined by several edges, as long as the edges differ.
//! Cycles are found from the retreating edges of a depth first walk, so
//! every cycle has a header where exploration can be bounded, whether or
//! not the cycle is a natural loop.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::Error;

pub trait Vertex: Clone + Sync {
    // The index of this vertex.
    fn index(&self) -> usize;
    // A string to display in dot graphviz format.
    fn dot_label(&self) -> String;
}

pub trait Edge: Clone + PartialEq + Sync {
    /// The index of the head vertex.
    fn head(&self) -> usize;
    /// The index of the tail vertex.
    fn tail(&self) -> usize;
    /// A string to display in dot graphviz format.
    fn dot_label(&self) -> String;
    // Style in dot graphviz format.
    fn dot_style(&self) -> String {
        "solid".to_string()
    }
}

/// A cycle, identified by the header a depth first walk enters it through.
///
/// For a natural loop the header dominates every node. Irreducible cycles
/// are entered at more than one node, and get the first one walked as
/// header.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Loop {
    header: usize,
    nodes: BTreeSet<usize>,
}

impl Loop {
    pub fn new(header: usize, nodes: BTreeSet<usize>) -> Self {
        Self { header, nodes }
    }

    /// The set of nodes part of this loop, header included
    pub fn nodes(&self) -> &BTreeSet<usize> {
        &self.nodes
    }

    /// The loop header node
    pub fn header(&self) -> usize {
        self.header
    }

    /// Returns `true` if the given node belongs to this loop.
    pub fn contains(&self, node: usize) -> bool {
        self.nodes.contains(&node)
    }
}

impl fmt::Display for Loop {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Loop 0x{:X}: {{", self.header)?;
        let mut is_first = true;
        for node in &self.nodes {
            if !is_first {
                write!(f, ", ")?;
            }
            write!(f, "0x{:X}", node)?;
            is_first = false;
        }
        write!(f, "}}")
    }
}

/// A directed graph.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Graph<V: Vertex, E: Edge> {
    vertices: BTreeMap<usize, V>,
    // Every edge between a head and a tail, in insertion order.
    edges: BTreeMap<(usize, usize), Vec<E>>,
    successors: BTreeMap<usize, BTreeSet<usize>>,
    predecessors: BTreeMap<usize, BTreeSet<usize>>,
}

impl<V: Vertex, E: Edge> Default for Graph<V, E> {
    fn default() -> Self {
        Graph::new()
    }
}

impl<V, E> Graph<V, E>
where
    V: Vertex,
    E: Edge,
{
    pub fn new() -> Graph<V, E> {
        Graph {
            vertices: BTreeMap::new(),
            edges: BTreeMap::new(),
            successors: BTreeMap::new(),
            predecessors: BTreeMap::new(),
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if the vertex with the given index exists in this graph
    pub fn has_vertex(&self, index: usize) -> bool {
        self.vertices.contains_key(&index)
    }

    /// Returns true if an edge with the given head and tail index exists in this graph
    pub fn has_edge(&self, head: usize, tail: usize) -> bool {
        self.edges.contains_key(&(head, tail))
    }

    /// Inserts a vertex into the graph.
    /// # Errors
    /// Error if the vertex already exists by index.
    pub fn insert_vertex(&mut self, v: V) -> Result<(), Error> {
        if self.vertices.contains_key(&v.index()) {
            return Err("duplicate vertex index".into());
        }
        self.successors.insert(v.index(), BTreeSet::new());
        self.predecessors.insert(v.index(), BTreeSet::new());
        self.vertices.insert(v.index(), v);
        Ok(())
    }

    /// Inserts an edge into the graph.
    ///
    /// Edges sharing a head and a tail must differ.
    /// # Errors
    /// Error if an equal edge already exists, or if either end is missing.
    pub fn insert_edge(&mut self, edge: E) -> Result<(), Error> {
        let (head, tail) = (edge.head(), edge.tail());
        if !self.vertices.contains_key(&head) {
            return Err(Error::GraphVertexNotFound(head));
        }
        if !self.vertices.contains_key(&tail) {
            return Err(Error::GraphVertexNotFound(tail));
        }

        let parallel = self.edges.entry((head, tail)).or_default();
        if parallel.contains(&edge) {
            return Err(format!("duplicate edge 0x{:X} -> 0x{:X}", head, tail).into());
        }
        parallel.push(edge);

        if let Some(successors) = self.successors.get_mut(&head) {
            successors.insert(tail);
        }
        if let Some(predecessors) = self.predecessors.get_mut(&tail) {
            predecessors.insert(head);
        }

        Ok(())
    }

    /// Returns the indices of all immediate successors of a vertex from the graph.
    pub fn successor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.successors
            .get(&index)
            .map(|successors| successors.iter().cloned().collect())
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Returns the indices of all immediate predecessors of a vertex from the graph.
    pub fn predecessor_indices(&self, index: usize) -> Result<Vec<usize>, Error> {
        self.predecessors
            .get(&index)
            .map(|predecessors| predecessors.iter().cloned().collect())
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Computes the set of vertices reachable from the given index.
    pub fn reachable_vertices(&self, index: usize) -> Result<FxHashSet<usize>, Error> {
        if !self.has_vertex(index) {
            return Err(Error::GraphVertexNotFound(index));
        }

        let mut reachable_vertices: FxHashSet<usize> = FxHashSet::default();
        let mut queue: Vec<usize> = vec![index];

        reachable_vertices.insert(index);

        while let Some(vertex) = queue.pop() {
            for &successor in &self.successors[&vertex] {
                if reachable_vertices.insert(successor) {
                    queue.push(successor);
                }
            }
        }

        Ok(reachable_vertices)
    }

    /// Computes the reverse post order of every vertex reachable from `root`.
    pub fn compute_reverse_post_order(&self, root: usize) -> Result<Vec<usize>, Error> {
        if !self.has_vertex(root) {
            return Err(Error::GraphVertexNotFound(root));
        }

        let mut visited: FxHashSet<usize> = FxHashSet::default();
        let mut order: Vec<usize> = Vec::new();
        // (vertex, successors already pushed)
        let mut stack: Vec<(usize, bool)> = vec![(root, false)];

        while let Some((vertex, expanded)) = stack.pop() {
            if expanded {
                order.push(vertex);
                continue;
            }
            if !visited.insert(vertex) {
                continue;
            }
            stack.push((vertex, true));
            for &successor in self.successors[&vertex].iter().rev() {
                if !visited.contains(&successor) {
                    stack.push((successor, false));
                }
            }
        }

        order.reverse();
        Ok(order)
    }

    /// Computes the retreating edges of a depth first walk from `root`.
    ///
    /// A retreating edge leads back to a vertex which comes no later in
    /// reverse post order, closing a cycle. Every cycle reachable from
    /// `root` holds at least one.
    pub fn compute_retreating_edges(&self, root: usize) -> Result<BTreeSet<(usize, usize)>, Error> {
        let positions: FxHashMap<usize, usize> = self
            .compute_reverse_post_order(root)?
            .into_iter()
            .enumerate()
            .map(|(position, vertex)| (vertex, position))
            .collect();

        let mut retreating_edges = BTreeSet::new();
        for (&head, &head_position) in &positions {
            for tail in &self.successors[&head] {
                if positions[tail] <= head_position {
                    retreating_edges.insert((head, *tail));
                }
            }
        }

        Ok(retreating_edges)
    }

    /// Computes the loops reachable from `root`, ordered by header.
    ///
    /// Every retreating edge `latch -> header` contributes the vertices on
    /// some path from `header` back to `latch`. Retreating edges sharing a
    /// header are combined into a single loop.
    pub fn compute_loops(&self, root: usize) -> Result<Vec<Loop>, Error> {
        let mut loops: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

        for (latch, header) in self.compute_retreating_edges(root)? {
            let from_header = self.reachable_vertices(header)?;
            let nodes = loops.entry(header).or_default();

            // walk backwards from the latch until we hit the header
            let mut to_latch: FxHashSet<usize> = FxHashSet::default();
            let mut queue: Vec<usize> = vec![latch];
            to_latch.insert(header);
            to_latch.insert(latch);
            while let Some(node) = queue.pop() {
                if node == header {
                    continue;
                }
                for &predecessor in &self.predecessors[&node] {
                    if to_latch.insert(predecessor) {
                        queue.push(predecessor);
                    }
                }
            }

            nodes.extend(to_latch.intersection(&from_header));
        }

        Ok(loops
            .into_iter()
            .map(|(header, nodes)| Loop::new(header, nodes))
            .collect())
    }

    /// Returns all vertices in the graph.
    pub fn vertices(&self) -> Vec<&V> {
        self.vertices.values().collect()
    }

    /// Fetches a vertex from the graph by index.
    pub fn vertex(&self, index: usize) -> Result<&V, Error> {
        self.vertices
            .get(&index)
            .ok_or(Error::GraphVertexNotFound(index))
    }

    // Fetches a mutable instance of a vertex.
    pub fn vertex_mut(&mut self, index: usize) -> Result<&mut V, Error> {
        self.vertices
            .get_mut(&index)
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Every edge from `head` to `tail`, in insertion order.
    pub fn edges_between(&self, head: usize, tail: usize) -> Result<&[E], Error> {
        self.edges
            .get(&(head, tail))
            .map(|edges| edges.as_slice())
            .ok_or(Error::GraphEdgeNotFound(head, tail))
    }

    /// Get a reference to every `Edge` in the `Graph`.
    pub fn edges(&self) -> Vec<&E> {
        self.edges.values().flatten().collect()
    }

    /// Return all edges out for a vertex
    pub fn edges_out(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.successors
            .get(&index)
            .map(|succs| {
                succs
                    .iter()
                    .flat_map(|succ| self.edges[&(index, *succ)].iter())
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Return all edges in for a vertex
    pub fn edges_in(&self, index: usize) -> Result<Vec<&E>, Error> {
        self.predecessors
            .get(&index)
            .map(|preds| {
                preds
                    .iter()
                    .flat_map(|pred| self.edges[&(*pred, index)].iter())
                    .collect()
            })
            .ok_or(Error::GraphVertexNotFound(index))
    }

    /// Returns a string in the graphviz format
    pub fn dot_graph(&self) -> String {
        let vertices = self
            .vertices
            .values()
            .map(|v| {
                format!(
                    "{} [shape=\"box\", label=\"{}\"];",
                    v.index(),
                    v.dot_label().replace('\n', "\\l")
                )
            })
            .collect::<Vec<String>>();

        let edges = self
            .edges
            .values()
            .flatten()
            .map(|e| {
                format!(
                    "{} -> {} [label=\"{}\", style=\"{}\"];",
                    e.head(),
                    e.tail(),
                    e.dot_label().replace('\n', "\\l"),
                    e.dot_style()
                )
            })
            .collect::<Vec<String>>();

        format!(
            "digraph G {{\nnode [fontname = \"Courier New\"]\n\n{}\n{}\n}}",
            vertices.join("\n"),
            edges.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl Vertex for usize {
        fn index(&self) -> usize {
            *self
        }

        fn dot_label(&self) -> String {
            self.to_string()
        }
    }

    impl Edge for (usize, usize) {
        fn head(&self) -> usize {
            self.0
        }

        fn tail(&self) -> usize {
            self.1
        }

        fn dot_label(&self) -> String {
            format!("{} -> {}", self.0, self.1)
        }
    }

    // An edge carrying a label, so that parallel edges can differ.
    #[derive(Clone, Debug, Eq, PartialEq)]
    struct Labeled(usize, usize, &'static str);

    impl Edge for Labeled {
        fn head(&self) -> usize {
            self.0
        }

        fn tail(&self) -> usize {
            self.1
        }

        fn dot_label(&self) -> String {
            self.2.to_string()
        }
    }

    fn graph_from(vertices: &[usize], edges: &[(usize, usize)]) -> Graph<usize, (usize, usize)> {
        let mut graph = Graph::new();
        for vertex in vertices {
            graph.insert_vertex(*vertex).unwrap();
        }
        for edge in edges {
            graph.insert_edge(*edge).unwrap();
        }
        graph
    }

    fn nodes(vertices: &[usize]) -> BTreeSet<usize> {
        vertices.iter().cloned().collect()
    }

    /**
     *           +--> 3 +-+
     *          /          \
     *         | +--> 4 +--+
     *         |/          |
     *         +           v
     * 1 +---> 2 <-------+ 5
     *         +
     *         |
     *         v
     *         6
     */
    fn create_test_graph() -> Graph<usize, (usize, usize)> {
        graph_from(
            &[1, 2, 3, 4, 5, 6],
            &[(1, 2), (2, 3), (2, 4), (2, 6), (3, 5), (4, 5), (5, 2)],
        )
    }

    #[test]
    fn test_insert_edge_requires_both_vertices() {
        let mut graph = graph_from(&[1], &[]);
        assert!(matches!(
            graph.insert_edge((1, 2)),
            Err(Error::GraphVertexNotFound(2))
        ));
    }

    #[test]
    fn test_insert_duplicate_edge_fails() {
        let mut graph = graph_from(&[1, 2], &[(1, 2)]);
        assert!(graph.insert_edge((1, 2)).is_err());
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let mut graph: Graph<usize, Labeled> = Graph::new();
        graph.insert_vertex(1).unwrap();
        graph.insert_vertex(2).unwrap();

        graph.insert_edge(Labeled(1, 2, "true")).unwrap();
        graph.insert_edge(Labeled(1, 2, "false")).unwrap();
        assert!(graph.insert_edge(Labeled(1, 2, "true")).is_err());

        assert_eq!(graph.edges_out(1).unwrap().len(), 2);
        assert_eq!(graph.edges_in(2).unwrap().len(), 2);
        assert_eq!(graph.edges_between(1, 2).unwrap()[1].2, "false");
        assert_eq!(graph.successor_indices(1).unwrap(), vec![2]);
        assert_eq!(graph.edges().len(), 2);
    }

    #[test]
    fn test_reachable_vertices() {
        let graph = graph_from(&[1, 2, 3, 4], &[(1, 2), (2, 3)]);

        let reachable = graph.reachable_vertices(2).unwrap();

        assert_eq!(reachable.len(), 2);
        assert!(reachable.contains(&3));
        assert!(!reachable.contains(&4));
    }

    #[test]
    fn test_reverse_post_order_starts_with_root() {
        let graph = create_test_graph();

        let order = graph.compute_reverse_post_order(1).unwrap();

        assert_eq!(order.len(), 6);
        assert_eq!(order[0], 1);
        assert_eq!(order[1], 2);
        let position = |v: usize| order.iter().position(|x| *x == v).unwrap();
        assert!(position(3) < position(5));
        assert!(position(4) < position(5));
    }

    #[test]
    fn test_compute_retreating_edges() {
        let graph = create_test_graph();

        let retreating_edges = graph.compute_retreating_edges(1).unwrap();

        assert_eq!(retreating_edges.len(), 1);
        assert!(retreating_edges.contains(&(5, 2)));
    }

    #[test]
    fn test_compute_loops_single_loop() {
        let graph = create_test_graph();

        let loops = graph.compute_loops(1).unwrap();

        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].header(), 2);
        assert_eq!(loops[0].nodes(), &nodes(&[2, 3, 4, 5]));
    }

    #[test]
    fn test_compute_loops_nested_loops() {
        let graph = graph_from(
            &[1, 2, 3, 4, 5],
            &[(1, 2), (2, 3), (3, 4), (3, 2), (4, 5), (4, 1)],
        );

        let loops = graph.compute_loops(1).unwrap();

        assert_eq!(loops.len(), 2);
        assert!(loops.contains(&Loop::new(1, nodes(&[1, 2, 3, 4]))));
        assert!(loops.contains(&Loop::new(2, nodes(&[2, 3]))));
    }

    #[test]
    fn test_compute_loops_self_loop() {
        let graph = graph_from(&[1, 2, 3], &[(1, 2), (2, 3), (2, 2)]);

        let loops = graph.compute_loops(1).unwrap();

        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].header(), 2);
        assert_eq!(loops[0].nodes(), &nodes(&[2]));
    }

    #[test]
    fn test_compute_loops_should_combine_loops_with_same_header() {
        let graph = graph_from(&[1, 2, 3], &[(1, 2), (1, 3), (2, 1), (3, 1)]);

        let loops = graph.compute_loops(1).unwrap();

        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].header(), 1);
        assert_eq!(loops[0].nodes(), &nodes(&[1, 2, 3]));
    }

    /**
     * 1 +---> 2 +---> 3 +---> 4
     * +       ^       +
     * |       +-------+
     * +---------------^
     */
    #[test]
    fn test_compute_loops_irreducible_cycle() {
        let graph = graph_from(&[1, 2, 3, 4], &[(1, 2), (1, 3), (2, 3), (3, 2), (3, 4)]);

        let loops = graph.compute_loops(1).unwrap();

        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].header(), 2);
        assert_eq!(loops[0].nodes(), &nodes(&[2, 3]));
    }

    #[test]
    fn test_acyclic_graph_has_no_loops() {
        let graph = graph_from(&[1, 2, 3, 4], &[(1, 2), (1, 3), (2, 4), (3, 4)]);

        assert!(graph.compute_loops(1).unwrap().is_empty());
    }

    #[test]
    fn test_dot_graph_lists_vertices_and_edges() {
        let graph = graph_from(&[1, 2], &[(1, 2)]);

        let dot = graph.dot_graph();

        assert!(dot.starts_with("digraph G {"));
        assert!(dot.contains("1 -> 2"));
    }
}
