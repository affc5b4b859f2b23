//! Function spaces and the element restriction operators that connect them to global vectors.
//!
//! Global vectors are node-interleaved: the value of component `i` at node `k` of a field with
//! `c` components lives at index `c * k + i`. Element-local vectors are component-major, as
//! expected by the kernels.
use crate::error::ConfigurationError;

/// Maps each element to the global nodes it touches, in element-local node order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRestriction {
    nodes_per_element: usize,
    element_nodes: Vec<usize>,
}

impl ElementRestriction {
    pub fn new(nodes_per_element: usize, element_nodes: Vec<usize>) -> Result<Self, ConfigurationError> {
        if nodes_per_element == 0 || element_nodes.len() % nodes_per_element != 0 {
            return Err(ConfigurationError::InvalidRestriction {
                reason: format!(
                    "{} node indices do not form elements of {} nodes",
                    element_nodes.len(),
                    nodes_per_element
                ),
            });
        }
        Ok(Self {
            nodes_per_element,
            element_nodes,
        })
    }

    pub fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    pub fn num_elements(&self) -> usize {
        self.element_nodes.len() / self.nodes_per_element
    }

    pub fn element_nodes(&self, element: usize) -> &[usize] {
        let n = self.nodes_per_element;
        &self.element_nodes[n * element..n * (element + 1)]
    }

    /// The largest node index referenced, if any.
    pub fn max_node(&self) -> Option<usize> {
        self.element_nodes.iter().copied().max()
    }

    /// Copies the dofs of `element` out of the node-interleaved `global` vector into the
    /// component-major `local` vector.
    pub fn gather(&self, element: usize, components: usize, global: &[f64], local: &mut [f64]) {
        let nodes = self.element_nodes(element);
        let n = nodes.len();
        assert_eq!(local.len(), components * n, "local buffer has wrong size");
        for (a, &node) in nodes.iter().enumerate() {
            for i in 0..components {
                local[i * n + a] = global[components * node + i];
            }
        }
    }

    /// Global indices of the local dofs of `element`, in component-major local order.
    pub fn dof_indices(&self, element: usize, components: usize) -> impl Iterator<Item = usize> + '_ {
        let nodes = self.element_nodes(element);
        (0..components).flat_map(move |i| nodes.iter().map(move |&node| components * node + i))
    }

    /// Adds the component-major `local` vector of `element` into the node-interleaved `global`
    /// vector.
    pub fn scatter_add(&self, element: usize, components: usize, local: &[f64], global: &mut [f64]) {
        assert_eq!(local.len(), components * self.nodes_per_element, "local buffer has wrong size");
        for (index, &value) in self.dof_indices(element, components).zip(local) {
            global[index] += value;
        }
    }
}

/// How the dofs of a [`FunctionSpace`] are attached to the mesh.
#[derive(Debug, Clone, PartialEq)]
enum Discretization {
    Nodal {
        order: usize,
        num_nodes: usize,
        restriction: ElementRestriction,
        boundary_restriction: Option<ElementRestriction>,
    },
    /// One value per component, shared by every cell.
    Uniform,
}

/// A field space: either a nodal finite element space of a given order, or a uniform space of
/// spatially constant parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpace {
    components: usize,
    discretization: Discretization,
}

impl FunctionSpace {
    pub fn new(
        order: usize,
        components: usize,
        num_nodes: usize,
        restriction: ElementRestriction,
    ) -> Result<Self, ConfigurationError> {
        if order == 0 {
            return Err(ConfigurationError::UnsupportedOrder { order });
        }
        check_components(components)?;
        check_nodes_in_bounds(&restriction, num_nodes)?;
        Ok(Self {
            components,
            discretization: Discretization::Nodal {
                order,
                num_nodes,
                restriction,
                boundary_restriction: None,
            },
        })
    }

    /// A space of `components` values that are constant over the whole mesh.
    ///
    /// Its global vectors hold exactly one value per component. Uniform fields interpolate to
    /// their values with zero gradient, and a uniform test space integrates sources over the
    /// whole domain.
    pub fn uniform(components: usize) -> Result<Self, ConfigurationError> {
        check_components(components)?;
        Ok(Self {
            components,
            discretization: Discretization::Uniform,
        })
    }

    /// Attaches the restriction to boundary faces, used by boundary integrals.
    pub fn with_boundary_restriction(mut self, restriction: ElementRestriction) -> Result<Self, ConfigurationError> {
        match &mut self.discretization {
            Discretization::Nodal {
                num_nodes,
                boundary_restriction,
                ..
            } => {
                check_nodes_in_bounds(&restriction, *num_nodes)?;
                *boundary_restriction = Some(restriction);
                Ok(self)
            }
            Discretization::Uniform => Err(ConfigurationError::InvalidRestriction {
                reason: "a uniform space is not restricted to cells".to_string(),
            }),
        }
    }

    pub fn is_uniform(&self) -> bool {
        self.discretization == Discretization::Uniform
    }

    /// Polynomial order of the nodal basis, zero for uniform spaces.
    pub fn order(&self) -> usize {
        match self.discretization {
            Discretization::Nodal { order, .. } => order,
            Discretization::Uniform => 0,
        }
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Number of nodes, counting a uniform space as a single node.
    pub fn num_nodes(&self) -> usize {
        match self.discretization {
            Discretization::Nodal { num_nodes, .. } => num_nodes,
            Discretization::Uniform => 1,
        }
    }

    pub fn num_dofs(&self) -> usize {
        self.components * self.num_nodes()
    }

    /// The cell restriction, `None` for uniform spaces.
    pub fn restriction(&self) -> Option<&ElementRestriction> {
        match &self.discretization {
            Discretization::Nodal { restriction, .. } => Some(restriction),
            Discretization::Uniform => None,
        }
    }

    pub fn boundary_restriction(&self) -> Option<&ElementRestriction> {
        match &self.discretization {
            Discretization::Nodal {
                boundary_restriction, ..
            } => boundary_restriction.as_ref(),
            Discretization::Uniform => None,
        }
    }
}

fn check_components(components: usize) -> Result<(), ConfigurationError> {
    if components == 0 {
        return Err(ConfigurationError::InvalidRestriction {
            reason: "a field needs at least one component".to_string(),
        });
    }
    Ok(())
}

fn check_nodes_in_bounds(restriction: &ElementRestriction, num_nodes: usize) -> Result<(), ConfigurationError> {
    match restriction.max_node() {
        Some(max) if max >= num_nodes => Err(ConfigurationError::InvalidRestriction {
            reason: format!("node {} is out of bounds for a space with {} nodes", max, num_nodes),
        }),
        _ => Ok(()),
    }
}
