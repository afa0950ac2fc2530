//! # Line-Girder Stiffness Solver
//!
//! A 1-D Euler-Bernoulli beam model solved by the direct stiffness method.
//! Every node has a vertical and a rotational degree of freedom. Two nodes
//! may share degrees of freedom, which is how closure joints are modelled:
//! sharing both makes a rigid splice, sharing only the vertical one makes a
//! hinge, sharing nothing leaves the segments independent.
//!
//! ## Sign Conventions
//!
//! - Loads act downward when positive.
//! - Deflection and rotation are positive upward and counterclockwise.
//! - Internal moment is positive sagging, internal shear is `dM/dx`.
//! - Reactions are positive upward.
//!
//! ```text
//!           | 12   6L   -12   6L  |
//! k = EI/L³ | 6L   4L²  -6L   2L² |     DOF order (v1, θ1, v2, θ2)
//!           | -12  -6L   12  -6L  |
//!           | 6L   2L²  -6L   4L² |
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bridge_core::analysis::fem::{DirectStiffnessSolver, LineGirderSolver, LineModel, LoadSet};
//!
//! // 10 m simple span in two elements, 10 kN/m
//! let mut model = LineModel::new();
//! let a = model.add_node(0.0);
//! let b = model.add_node(5.0);
//! let c = model.add_node(10.0);
//! model.add_element(a, b, 1.0e8);
//! model.add_element(b, c, 1.0e8);
//! model.add_support(a);
//! model.add_support(c);
//!
//! let loads = LoadSet::new().with_uniform(0, 10.0e3).with_uniform(1, 10.0e3);
//! let response = DirectStiffnessSolver.solve(&model, &[loads]).unwrap();
//! let midspan = response[0].node_moment(&model, b);
//! assert!((midspan - 10.0e3 * 100.0 / 8.0).abs() < 1e-6);
//! ```

use nalgebra::{DMatrix, DVector};
use tracing::trace;

use crate::errors::{BridgeError, BridgeResult};

const STAGE: &str = "line-girder solver";

/// Smallest pivot, relative to the largest, of a stable model
const PIVOT_TOLERANCE: f64 = 1.0e-14;

/// A node of the line model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Station along the girder line (m)
    pub station: f64,
    vertical: usize,
    rotation: usize,
}

/// A prismatic beam element between two nodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    pub start: usize,
    pub end: usize,
    /// Flexural stiffness (N·m²)
    pub ei: f64,
}

/// The line-girder model of one structural configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineModel {
    nodes: Vec<Node>,
    elements: Vec<Element>,
    supports: Vec<usize>,
    dofs: usize,
}

impl LineModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with its own degrees of freedom
    pub fn add_node(&mut self, station: f64) -> usize {
        let node = Node {
            station,
            vertical: self.dofs,
            rotation: self.dofs + 1,
        };
        self.dofs += 2;
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn add_element(&mut self, start: usize, end: usize, ei: f64) -> usize {
        self.elements.push(Element { start, end, ei });
        self.elements.len() - 1
    }

    /// Restrain the vertical displacement of a node
    pub fn add_support(&mut self, node: usize) {
        self.supports.push(node);
    }

    /// Make `right` move with `left`: vertically, and in rotation when `rigid`
    pub fn connect(&mut self, left: usize, right: usize, rigid: bool) {
        let (lv, lr) = (self.nodes[left].vertical, self.nodes[left].rotation);
        let (rv, rr) = (self.nodes[right].vertical, self.nodes[right].rotation);
        for node in &mut self.nodes {
            if node.vertical == rv {
                node.vertical = lv;
            }
            if rigid && node.rotation == rr {
                node.rotation = lr;
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn supports(&self) -> &[usize] {
        &self.supports
    }

    pub fn element_length(&self, element: usize) -> f64 {
        let e = &self.elements[element];
        self.nodes[e.end].station - self.nodes[e.start].station
    }

    /// Elements to the left and right of a node
    pub fn adjacent_elements(&self, node: usize) -> (Option<usize>, Option<usize>) {
        let left = self.elements.iter().position(|e| e.end == node);
        let right = self.elements.iter().position(|e| e.start == node);
        (left, right)
    }

    /// Degrees of freedom actually used, in a dense numbering
    fn dof_numbering(&self) -> (Vec<Option<usize>>, usize) {
        let mut numbering = vec![None; self.dofs];
        let mut count = 0;
        for node in &self.nodes {
            for dof in [node.vertical, node.rotation] {
                if numbering[dof].is_none() {
                    numbering[dof] = Some(count);
                    count += 1;
                }
            }
        }
        (numbering, count)
    }
}

/// Loads of one load case on a [`LineModel`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadSet {
    /// (node, force) with force downward positive (N)
    pub point: Vec<(usize, f64)>,
    /// (element, intensity) downward positive (N/m)
    pub uniform: Vec<(usize, f64)>,
    /// (element, curvature) imposed free curvature, sagging positive (1/m)
    pub curvature: Vec<(usize, f64)>,
}

impl LoadSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_point(mut self, node: usize, force: f64) -> Self {
        self.point.push((node, force));
        self
    }

    pub fn with_uniform(mut self, element: usize, w: f64) -> Self {
        self.uniform.push((element, w));
        self
    }

    pub fn with_curvature(mut self, element: usize, kappa: f64) -> Self {
        self.curvature.push((element, kappa));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_empty() && self.uniform.is_empty() && self.curvature.is_empty()
    }

    /// Fixed-end forces of an element (v1, m1, v2, m2), upward and counterclockwise positive
    fn fixed_end_forces(&self, model: &LineModel, element: usize) -> [f64; 4] {
        let length = model.element_length(element);
        let ei = model.elements[element].ei;
        let mut f = [0.0; 4];
        for &(_, w) in self.uniform.iter().filter(|(e, _)| *e == element) {
            f[0] += w * length / 2.0;
            f[1] += w * length * length / 12.0;
            f[2] += w * length / 2.0;
            f[3] -= w * length * length / 12.0;
        }
        for &(_, kappa) in self.curvature.iter().filter(|(e, _)| *e == element) {
            f[1] += ei * kappa;
            f[3] -= ei * kappa;
        }
        f
    }
}

/// Response of a [`LineModel`] to one [`LoadSet`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    /// Per node, upward positive (m)
    pub deflection: Vec<f64>,
    /// Per node, counterclockwise positive (rad)
    pub rotation: Vec<f64>,
    /// Per element, internal moment at (start, end) (N·m)
    pub moment: Vec<(f64, f64)>,
    /// Per element, internal shear at (start, end) (N)
    pub shear: Vec<(f64, f64)>,
    /// Per support, in the order of [`LineModel::supports`] (N)
    pub reactions: Vec<f64>,
}

impl ModelResponse {
    /// Moment at a node, from the element to its right when there is one
    pub fn node_moment(&self, model: &LineModel, node: usize) -> f64 {
        match model.adjacent_elements(node) {
            (_, Some(right)) => self.moment[right].0,
            (Some(left), None) => self.moment[left].1,
            (None, None) => 0.0,
        }
    }

    /// Shear just left or right of a node
    pub fn node_shear(&self, model: &LineModel, node: usize, right_side: bool) -> f64 {
        match (model.adjacent_elements(node), right_side) {
            ((_, Some(right)), true) | ((None, Some(right)), false) => self.shear[right].0,
            ((Some(left), _), false) | ((Some(left), None), true) => self.shear[left].1,
            ((None, None), _) => 0.0,
        }
    }
}

/// External line-girder analysis service
pub trait LineGirderSolver: std::fmt::Debug + Send + Sync {
    /// Solve a model for several load sets with one factorization
    fn solve(&self, model: &LineModel, loads: &[LoadSet]) -> BridgeResult<Vec<ModelResponse>>;
}

/// Dense direct-stiffness solver with LU factorization
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectStiffnessSolver;

fn element_stiffness(ei: f64, length: f64) -> [[f64; 4]; 4] {
    let l = length;
    let k = ei / (l * l * l);
    [
        [12.0 * k, 6.0 * l * k, -12.0 * k, 6.0 * l * k],
        [6.0 * l * k, 4.0 * l * l * k, -6.0 * l * k, 2.0 * l * l * k],
        [-12.0 * k, -6.0 * l * k, 12.0 * k, -6.0 * l * k],
        [6.0 * l * k, 2.0 * l * l * k, -6.0 * l * k, 4.0 * l * l * k],
    ]
}

impl LineGirderSolver for DirectStiffnessSolver {
    fn solve(&self, model: &LineModel, loads: &[LoadSet]) -> BridgeResult<Vec<ModelResponse>> {
        if model.elements.is_empty() {
            return Err(BridgeError::validation(STAGE, "the structural model has no elements"));
        }
        let (numbering, n) = model.dof_numbering();
        let dof = |global: usize| {
            numbering[global].ok_or_else(|| BridgeError::internal(format!("unnumbered degree of freedom {}", global)))
        };
        let element_dofs = |e: &Element| -> BridgeResult<[usize; 4]> {
            let (a, b) = (&model.nodes[e.start], &model.nodes[e.end]);
            Ok([dof(a.vertical)?, dof(a.rotation)?, dof(b.vertical)?, dof(b.rotation)?])
        };

        let mut k = DMatrix::<f64>::zeros(n, n);
        for (index, e) in model.elements.iter().enumerate() {
            let length = model.element_length(index);
            if length <= 0.0 || e.ei <= 0.0 {
                return Err(BridgeError::validation(
                    STAGE,
                    format!("element {} has length {} and stiffness {}", index, length, e.ei),
                ));
            }
            let ke = element_stiffness(e.ei, length);
            let map = element_dofs(e)?;
            for i in 0..4 {
                for j in 0..4 {
                    k[(map[i], map[j])] += ke[i][j];
                }
            }
        }

        let mut restrained = vec![false; n];
        for &node in &model.supports {
            restrained[dof(model.nodes[node].vertical)?] = true;
        }
        let free: Vec<usize> = (0..n).filter(|&d| !restrained[d]).collect();
        let mut position = vec![None; n];
        for (i, &d) in free.iter().enumerate() {
            position[d] = Some(i);
        }

        let mut kff = DMatrix::<f64>::zeros(free.len(), free.len());
        for (i, &a) in free.iter().enumerate() {
            for (j, &b) in free.iter().enumerate() {
                kff[(i, j)] = k[(a, b)];
            }
        }

        // Equivalent nodal loads, one column per load set
        let mut forces = DMatrix::<f64>::zeros(n, loads.len());
        for (column, set) in loads.iter().enumerate() {
            for &(node, p) in &set.point {
                forces[(dof(model.nodes[node].vertical)?, column)] -= p;
            }
            for (index, e) in model.elements.iter().enumerate() {
                let fixed = set.fixed_end_forces(model, index);
                let map = element_dofs(e)?;
                for i in 0..4 {
                    forces[(map[i], column)] -= fixed[i];
                }
            }
        }

        let mut rhs = DMatrix::<f64>::zeros(free.len(), loads.len());
        for (i, &d) in free.iter().enumerate() {
            for column in 0..loads.len() {
                rhs[(i, column)] = forces[(d, column)];
            }
        }

        let lu = kff.lu();
        let pivots = lu.u().diagonal().map(f64::abs);
        if free.is_empty() || pivots.min() <= pivots.max() * PIVOT_TOLERANCE {
            return Err(BridgeError::validation(STAGE, "the structural model is unstable"));
        }
        let solution = lu
            .solve(&rhs)
            .ok_or_else(|| BridgeError::validation(STAGE, "the structural model is unstable"))?;
        trace!(dofs = n, free = free.len(), load_sets = loads.len(), "solved line model");

        let mut responses = Vec::with_capacity(loads.len());
        for (column, set) in loads.iter().enumerate() {
            let mut d = DVector::<f64>::zeros(n);
            for (global, slot) in position.iter().enumerate() {
                if let Some(i) = slot {
                    d[global] = solution[(*i, column)];
                }
            }

            let mut response = ModelResponse {
                deflection: Vec::with_capacity(model.nodes.len()),
                rotation: Vec::with_capacity(model.nodes.len()),
                ..ModelResponse::default()
            };
            for node in &model.nodes {
                response.deflection.push(d[dof(node.vertical)?]);
                response.rotation.push(d[dof(node.rotation)?]);
            }
            for (index, e) in model.elements.iter().enumerate() {
                let ke = element_stiffness(e.ei, model.element_length(index));
                let map = element_dofs(e)?;
                let mut end = set.fixed_end_forces(model, index);
                for i in 0..4 {
                    for j in 0..4 {
                        end[i] += ke[i][j] * d[map[j]];
                    }
                }
                response.moment.push((-end[1], end[3]));
                response.shear.push((end[0], -end[2]));
            }

            let kd = &k * &d;
            let mut counted = Vec::new();
            for &node in &model.supports {
                let v = dof(model.nodes[node].vertical)?;
                if counted.contains(&v) {
                    response.reactions.push(0.0);
                    continue;
                }
                counted.push(v);
                response.reactions.push(kd[v] - forces[(v, column)]);
            }
            responses.push(response);
        }
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EI: f64 = 2.0e9;

    /// Beam on supports at the given stations, meshed at every `step`
    fn beam(length: f64, step: usize, supports: &[f64]) -> LineModel {
        let mut model = LineModel::new();
        for i in 0..=step {
            model.add_node(length * i as f64 / step as f64);
        }
        for i in 0..step {
            model.add_element(i, i + 1, EI);
        }
        for &s in supports {
            let node = model
                .nodes()
                .iter()
                .position(|n| (n.station - s).abs() < 1e-9)
                .unwrap();
            model.add_support(node);
        }
        model
    }

    fn uniform(model: &LineModel, w: f64) -> LoadSet {
        (0..model.elements().len()).fold(LoadSet::new(), |set, e| set.with_uniform(e, w))
    }

    #[test]
    fn test_simple_span_uniform_load() {
        let model = beam(20.0, 10, &[0.0, 20.0]);
        let w = 15.0e3;
        let r = &DirectStiffnessSolver.solve(&model, &[uniform(&model, w)]).unwrap()[0];
        assert_relative_eq!(r.node_moment(&model, 5), w * 400.0 / 8.0, max_relative = 1e-9);
        assert_relative_eq!(r.deflection[5], -5.0 * w * 20.0f64.powi(4) / (384.0 * EI), max_relative = 1e-9);
        assert_relative_eq!(r.reactions[0], w * 10.0, max_relative = 1e-9);
        assert_relative_eq!(r.reactions[1], w * 10.0, max_relative = 1e-9);
        assert_relative_eq!(r.node_shear(&model, 0, true), w * 10.0, max_relative = 1e-9);
        assert_relative_eq!(r.node_shear(&model, 10, false), -w * 10.0, max_relative = 1e-9);
    }

    #[test]
    fn test_two_span_continuous_pier_moment() {
        let model = beam(20.0, 20, &[0.0, 10.0, 20.0]);
        let w = 10.0e3;
        let r = &DirectStiffnessSolver.solve(&model, &[uniform(&model, w)]).unwrap()[0];
        // -wL²/8 over the interior support, 5wL/4 reaction
        assert_relative_eq!(r.node_moment(&model, 10), -w * 100.0 / 8.0, max_relative = 1e-9);
        assert_relative_eq!(r.reactions[1], 1.25 * w * 10.0, max_relative = 1e-9);
    }

    #[test]
    fn test_point_load_and_multiple_load_sets() {
        let model = beam(10.0, 4, &[0.0, 10.0]);
        let p = 100.0e3;
        let sets = [LoadSet::new().with_point(2, p), LoadSet::new().with_point(1, p)];
        let r = DirectStiffnessSolver.solve(&model, &sets).unwrap();
        assert_relative_eq!(r[0].node_moment(&model, 2), p * 10.0 / 4.0, max_relative = 1e-9);
        assert_relative_eq!(r[0].deflection[2], -p * 1000.0 / (48.0 * EI), max_relative = 1e-9);
        assert_relative_eq!(r[1].reactions[0], 0.75 * p, max_relative = 1e-9);
    }

    #[test]
    fn test_imposed_curvature_free_on_simple_span() {
        let model = beam(10.0, 10, &[0.0, 10.0]);
        let kappa = -1.0e-4;
        let set = (0..10).fold(LoadSet::new(), |s, e| s.with_curvature(e, kappa));
        let r = &DirectStiffnessSolver.solve(&model, &[set]).unwrap()[0];
        // Statically determinate: no restraint moment, camber κL²/8
        assert!(r.node_moment(&model, 5).abs() < 1e-6);
        assert_relative_eq!(r.deflection[5], -kappa * 100.0 / 8.0, max_relative = 1e-9);
    }

    #[test]
    fn test_imposed_curvature_restrained_by_continuity() {
        let model = beam(20.0, 20, &[0.0, 10.0, 20.0]);
        let kappa = -1.0e-4;
        let set = (0..20).fold(LoadSet::new(), |s, e| s.with_curvature(e, kappa));
        let r = &DirectStiffnessSolver.solve(&model, &[set]).unwrap()[0];
        // Secondary moment over the pier: -3/2·EI·κ for two equal spans
        assert_relative_eq!(r.node_moment(&model, 10), -1.5 * EI * kappa, max_relative = 1e-9);
        let total: f64 = r.reactions.iter().sum();
        assert!(total.abs() < 1e-6);
    }

    #[test]
    fn test_hinge_and_rigid_connection() {
        // Two 10 m beams meeting at a doubled node over a middle support
        let build = |rigid: bool| {
            let mut model = LineModel::new();
            let a = model.add_node(0.0);
            let b = model.add_node(10.0);
            let c = model.add_node(10.0);
            let d = model.add_node(20.0);
            model.add_element(a, b, EI);
            model.add_element(c, d, EI);
            model.connect(b, c, rigid);
            model.add_support(a);
            model.add_support(b);
            model.add_support(d);
            model
        };
        let hinged = build(false);
        let r = &DirectStiffnessSolver.solve(&hinged, &[uniform(&hinged, 1.0e3)]).unwrap()[0];
        assert!(r.node_moment(&hinged, 1).abs() < 1e-6);

        let rigid = build(true);
        let r = &DirectStiffnessSolver.solve(&rigid, &[uniform(&rigid, 1.0e3)]).unwrap()[0];
        assert!(r.node_moment(&rigid, 2) < -1.0e3);
    }

    #[test]
    fn test_unstable_model_rejected() {
        let model = beam(10.0, 2, &[0.0]);
        let err = DirectStiffnessSolver.solve(&model, &[uniform(&model, 1.0)]).unwrap_err();
        assert_eq!(err.error_code(), "AGENT_VALIDATION_FAILURE");
    }
}
