/// OccluderMesh — simplified object geometry written into the coverage buffer.
///
/// Polygons are convex and wound counter-clockwise when seen from outside
/// (right-handed normals point out of the object). A polygon faces a point
/// when the point is on the positive side of its plane.
///
/// When every edge is shared by exactly two polygons the mesh is closed and
/// its silhouette can be inserted as a single outline instead of polygon by
/// polygon.

use glam::{Vec3, Vec4};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use crate::error::Result;
use crate::geometry::AABB;
use crate::engine_bail;

/// Polygon vertex indices
pub type MeshPolygon = SmallVec<[u32; 4]>;

/// An edge with the polygons that use it
#[derive(Debug, Clone)]
struct MeshEdge {
    vertices: [u32; 2],
    polygons: SmallVec<[u32; 2]>,
}

/// Silhouette of a closed mesh seen from one point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outline {
    /// Silhouette edges as vertex index pairs
    pub edges: Vec<[u32; 2]>,
    /// Per mesh vertex: true if some silhouette edge uses it
    pub used_vertices: Vec<bool>,
}

impl Outline {
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Convex-polygon mesh used as an occluder.
#[derive(Debug, Clone)]
pub struct OccluderMesh {
    vertices: Vec<Vec3>,
    polygons: Vec<MeshPolygon>,
    planes: Vec<Vec4>,
    edges: Vec<MeshEdge>,
    closed: bool,
}

impl OccluderMesh {
    /// Build a mesh from vertices and polygons given as vertex indices.
    ///
    /// Every polygon needs at least 3 valid indices, a non-degenerate plane
    /// and a convex outline.
    pub fn new(vertices: Vec<Vec3>, polygons: Vec<Vec<u32>>) -> Result<Self> {
        let mut planes = Vec::with_capacity(polygons.len());
        let mut mesh_polygons = Vec::with_capacity(polygons.len());

        for (index, polygon) in polygons.iter().enumerate() {
            if polygon.len() < 3 {
                engine_bail!(
                    "galaxy3d::DynaVis",
                    InvalidGeometry,
                    "polygon {} has {} vertices",
                    index, polygon.len()
                );
            }
            if let Some(&bad) = polygon.iter().find(|&&v| v as usize >= vertices.len()) {
                engine_bail!(
                    "galaxy3d::DynaVis",
                    InvalidGeometry,
                    "polygon {} uses vertex {} of {}",
                    index, bad, vertices.len()
                );
            }

            let points: SmallVec<[Vec3; 8]> = polygon.iter().map(|&v| vertices[v as usize]).collect();
            let Some(plane) = polygon_plane(&points) else {
                engine_bail!("galaxy3d::DynaVis", InvalidGeometry, "polygon {} is degenerate", index);
            };
            if !is_convex(&points, plane.truncate()) {
                engine_bail!("galaxy3d::DynaVis", InvalidGeometry, "polygon {} is not convex", index);
            }

            planes.push(plane);
            mesh_polygons.push(polygon.iter().copied().collect());
        }

        let edges = collect_edges(&mesh_polygons);
        let closed = !edges.is_empty() && edges.iter().all(|e| e.polygons.len() == 2);

        Ok(Self {
            vertices,
            polygons: mesh_polygons,
            planes,
            edges,
            closed,
        })
    }

    /// Closed six-quad mesh of a box.
    pub fn from_box(aabb: &AABB) -> Self {
        const FACES: [[u32; 4]; 6] = [
            [0, 4, 6, 2],
            [1, 3, 7, 5],
            [0, 1, 5, 4],
            [2, 6, 7, 3],
            [0, 2, 3, 1],
            [4, 5, 7, 6],
        ];
        let vertices = aabb.corners().to_vec();
        let polygons: Vec<MeshPolygon> = FACES.iter().map(|f| MeshPolygon::from_slice(f)).collect();
        let planes = polygons
            .iter()
            .map(|p| {
                let points: SmallVec<[Vec3; 8]> = p.iter().map(|&v| vertices[v as usize]).collect();
                polygon_plane(&points).unwrap_or(Vec4::ZERO)
            })
            .collect();
        let edges = collect_edges(&polygons);
        Self {
            vertices,
            polygons,
            planes,
            edges,
            closed: true,
        }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    pub fn polygon(&self, index: usize) -> &[u32] {
        &self.polygons[index]
    }

    pub fn polygons(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.polygons.iter().map(|p| p.as_slice())
    }

    /// Plane `(normal, d)` of a polygon, normal pointing outward.
    pub fn plane(&self, index: usize) -> Vec4 {
        self.planes[index]
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True when `point` sees the front side of the polygon.
    #[inline]
    pub fn is_front_facing(&self, index: usize, point: Vec3) -> bool {
        self.planes[index].dot(point.extend(1.0)) > 0.0
    }

    /// Silhouette edges seen from `point` (in object space).
    ///
    /// An edge is on the silhouette when exactly one of its two polygons
    /// faces the point. Only meaningful for closed meshes: open meshes
    /// return an empty outline.
    pub fn outline(&self, point: Vec3) -> Outline {
        let mut outline = Outline {
            edges: Vec::new(),
            used_vertices: vec![false; self.vertices.len()],
        };
        if !self.closed {
            return outline;
        }

        for edge in &self.edges {
            let [p0, p1] = [edge.polygons[0], edge.polygons[1]];
            if self.is_front_facing(p0 as usize, point) != self.is_front_facing(p1 as usize, point) {
                outline.edges.push(edge.vertices);
                outline.used_vertices[edge.vertices[0] as usize] = true;
                outline.used_vertices[edge.vertices[1] as usize] = true;
            }
        }
        outline
    }
}

/// Plane through a polygon by Newell's method, normalized.
fn polygon_plane(points: &[Vec3]) -> Option<Vec4> {
    let mut normal = Vec3::ZERO;
    let mut centroid = Vec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
        centroid += *a;
    }
    let length = normal.length();
    if !(length > 1e-6) {
        return None;
    }
    let normal = normal / length;
    centroid /= points.len() as f32;
    Some(normal.extend(-normal.dot(centroid)))
}

/// Every turn of the outline goes the same way around `normal`.
fn is_convex(points: &[Vec3], normal: Vec3) -> bool {
    let n = points.len();
    (0..n).all(|i| {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let e1 = b - a;
        let e2 = c - b;
        e1.cross(e2).dot(normal) >= -1e-5 * e1.length() * e2.length()
    })
}

fn collect_edges(polygons: &[MeshPolygon]) -> Vec<MeshEdge> {
    let mut edges: Vec<MeshEdge> = Vec::new();
    let mut lookup: FxHashMap<(u32, u32), usize> = FxHashMap::default();
    for (index, polygon) in polygons.iter().enumerate() {
        for i in 0..polygon.len() {
            let a = polygon[i];
            let b = polygon[(i + 1) % polygon.len()];
            let key = (a.min(b), a.max(b));
            let slot = *lookup.entry(key).or_insert_with(|| {
                edges.push(MeshEdge {
                    vertices: [a, b],
                    polygons: SmallVec::new(),
                });
                edges.len() - 1
            });
            edges[slot].polygons.push(index as u32);
        }
    }
    edges
}

#[cfg(test)]
#[path = "occluder_mesh_tests.rs"]
mod tests;
