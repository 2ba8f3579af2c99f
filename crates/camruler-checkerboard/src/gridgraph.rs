use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_4;

use camruler_core::Corner;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Vector2;

use crate::geom::{axis_diff, is_orthogonal};
use crate::params::GridGraphParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    Right,
    Left,
    Up,
    Down,
}

impl NeighborDirection {
    pub fn opposite(self) -> Self {
        match self {
            NeighborDirection::Right => NeighborDirection::Left,
            NeighborDirection::Left => NeighborDirection::Right,
            NeighborDirection::Up => NeighborDirection::Down,
            NeighborDirection::Down => NeighborDirection::Up,
        }
    }

    /// Grid step (di, dj) taken when following this edge.
    pub fn step(self) -> (i32, i32) {
        match self {
            NeighborDirection::Right => (1, 0),
            NeighborDirection::Left => (-1, 0),
            NeighborDirection::Up => (0, -1),
            NeighborDirection::Down => (0, 1),
        }
    }

    fn slot(self) -> usize {
        match self {
            NeighborDirection::Right => 0,
            NeighborDirection::Left => 1,
            NeighborDirection::Up => 2,
            NeighborDirection::Down => 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NodeNeighbor {
    pub direction: NeighborDirection,
    pub index: usize,
    pub distance: f32,
    pub score: f32,
}

fn direction_quadrant(v: &Vector2<f32>) -> NeighborDirection {
    if v.x.abs() > v.y.abs() {
        if v.x >= 0.0 {
            NeighborDirection::Right
        } else {
            NeighborDirection::Left
        }
    } else if v.y >= 0.0 {
        NeighborDirection::Down
    } else {
        NeighborDirection::Up
    }
}

/// Check whether `neighbor` is an adjacent checkerboard corner of `corner`.
///
/// ChESS orientations follow the diagonals of the squares, so adjacent corners
/// have orthogonal orientations and the edge between them sits at ~45° to
/// both. Lower scores are better.
fn neighbor_candidate(
    corner: &Corner,
    neighbor: &Corner,
    neighbor_index: usize,
    params: &GridGraphParams,
) -> Option<NodeNeighbor> {
    let tol = params.orientation_tolerance_deg.to_radians();
    if !is_orthogonal(corner.orientation, neighbor.orientation, tol) {
        return None;
    }

    let edge = neighbor.position - corner.position;
    let distance = edge.norm();
    if distance < params.min_spacing_pix || distance > params.max_spacing_pix {
        return None;
    }

    let edge_angle = edge.y.atan2(edge.x);
    let score_corner = (axis_diff(corner.orientation, edge_angle) - FRAC_PI_4).abs();
    let score_neighbor = (axis_diff(neighbor.orientation, edge_angle) - FRAC_PI_4).abs();
    if score_corner > tol || score_neighbor > tol {
        return None;
    }

    let score_orientation = (std::f32::consts::FRAC_PI_2
        - axis_diff(corner.orientation, neighbor.orientation))
    .abs();

    Some(NodeNeighbor {
        direction: direction_quadrant(&edge),
        index: neighbor_index,
        distance,
        score: score_corner + score_neighbor + score_orientation,
    })
}

/// Keep at most one neighbor per direction: the closest valid candidate, ties
/// broken by score. Farther corners along the same row also pass the
/// orientation checks, so distance must dominate.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> Vec<NodeNeighbor> {
    let mut best: [Option<NodeNeighbor>; 4] = [None, None, None, None];

    for candidate in candidates {
        let slot = &mut best[candidate.direction.slot()];
        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.distance < current.distance
                    || (candidate.distance == current.distance && candidate.score < current.score)
            }
        };
        if replace {
            *slot = Some(candidate);
        }
    }

    best.into_iter().flatten().collect()
}

/// 4-connected graph over checkerboard corners.
///
/// Edges are mutual: `i -> j` in direction `d` exists only if `j -> i` exists
/// in `d.opposite()`.
pub struct GridGraph {
    pub neighbors: Vec<Vec<NodeNeighbor>>,
}

impl GridGraph {
    pub fn new(corners: &[Corner], params: &GridGraphParams) -> Self {
        if corners.is_empty() {
            return Self {
                neighbors: Vec::new(),
            };
        }

        let coords = corners
            .iter()
            .map(|c| [c.position.x, c.position.y])
            .collect::<Vec<_>>();
        let tree: KdTree<f32, 2> = (&coords).into();

        let directed: Vec<Vec<NodeNeighbor>> = corners
            .iter()
            .enumerate()
            .map(|(i, corner)| {
                let query = [corner.position.x, corner.position.y];
                let candidates = tree
                    .nearest_n::<SquaredEuclidean>(&query, params.k_neighbors + 1)
                    .into_iter()
                    .map(|nn| nn.item as usize)
                    .filter(|&j| j != i)
                    .filter_map(|j| neighbor_candidate(corner, &corners[j], j, params))
                    .collect();
                select_neighbors(candidates)
            })
            .collect();

        let neighbors = directed
            .iter()
            .enumerate()
            .map(|(i, list)| {
                list.iter()
                    .filter(|n| {
                        directed[n.index]
                            .iter()
                            .any(|back| back.index == i && back.direction == n.direction.opposite())
                    })
                    .cloned()
                    .collect()
            })
            .collect();

        Self { neighbors }
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}

pub fn connected_components(graph: &GridGraph) -> Vec<Vec<usize>> {
    let mut visited = vec![false; graph.len()];
    let mut components = Vec::new();

    for start in 0..graph.len() {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            component.push(node);
            stack.extend(
                graph.neighbors[node]
                    .iter()
                    .map(|n| n.index)
                    .filter(|&j| !visited[j]),
            );
        }

        components.push(component);
    }

    components
}

/// BFS from the first node of `component`, assigning integer grid coordinates.
///
/// Returns `(node, i, j)` triples; `i` grows to the right and `j` downwards.
pub fn assign_grid_coordinates(graph: &GridGraph, component: &[usize]) -> Vec<(usize, i32, i32)> {
    let Some(&start) = component.first() else {
        return Vec::new();
    };

    let mut coords = Vec::with_capacity(component.len());
    let mut visited = vec![false; graph.len()];
    let mut queue = VecDeque::from([(start, 0, 0)]);

    while let Some((node, i, j)) = queue.pop_front() {
        if visited[node] {
            continue;
        }
        visited[node] = true;
        coords.push((node, i, j));

        for neighbor in &graph.neighbors[node] {
            let (di, dj) = neighbor.direction.step();
            queue.push_back((neighbor.index, i + di, j + dj));
        }
    }

    coords
}
