use nalgebra::Vector3;

/// Indexed triangle mesh.
/// Tracks triangle -> node topology; all coordinates are f32, matching the
/// precision the supported file formats store on disk.
#[derive(Debug, Default, Clone)]
pub struct TriangleMesh {
    pub node_positions: Vec<Vector3<f32>>,
    pub triangle_indices: Vec<[usize; 3]>,
}

impl TriangleMesh {
    pub fn new() -> TriangleMesh {
        TriangleMesh {
            node_positions: Vec::new(),
            triangle_indices: Vec::new(),
        }
    }

    pub fn with_capacity(node_len: usize, triangle_len: usize) -> TriangleMesh {
        TriangleMesh {
            node_positions: Vec::with_capacity(node_len),
            triangle_indices: Vec::with_capacity(triangle_len),
        }
    }

    pub fn node_len(&self) -> usize {
        self.node_positions.len()
    }

    pub fn triangle_len(&self) -> usize {
        self.triangle_indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_indices.is_empty()
    }

    /// Append a node, returning its index.
    pub fn add_node(&mut self, position: Vector3<f32>) -> usize {
        let result = self.node_len();
        self.node_positions.push(position);
        result
    }

    pub fn node(&self, index: usize) -> &Vector3<f32> {
        &self.node_positions[index]
    }

    /// Append a triangle, returning its index.
    pub fn add_triangle(&mut self, indices: [usize; 3]) -> usize {
        let result = self.triangle_len();
        self.triangle_indices.push(indices);
        result
    }

    pub fn triangle(&self, index: usize) -> &[usize; 3] {
        &self.triangle_indices[index]
    }

    /// Unit normal of a triangle. Degenerate triangles get a zero normal
    /// rather than NaN so they still serialize.
    pub fn triangle_normal(&self, index: usize) -> Vector3<f32> {
        let &[n0, n1, n2] = self.triangle(index);
        let a = self.node(n1) - self.node(n0);
        let b = self.node(n2) - self.node(n0);
        let cross = a.cross(&b);
        if cross.norm_squared() > 0.0 {
            cross.normalize()
        } else {
            Vector3::zeros()
        }
    }

    /// Merge another mesh into this one, offsetting its triangle indices.
    /// This is how multi-object containers are normalized to a single mesh.
    pub fn append(&mut self, other: &TriangleMesh) {
        let offset = self.node_len();
        self.node_positions.extend_from_slice(&other.node_positions);
        for &[a, b, c] in &other.triangle_indices {
            self.triangle_indices.push([a + offset, b + offset, c + offset]);
        }
    }
}
