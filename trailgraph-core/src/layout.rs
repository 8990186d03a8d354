// Force-directed placement for the graph view

use crate::index::GraphIndex;
use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct LayoutParams {
    /// Many-body strength; negative repels
    pub charge: f64,
    pub link_distance: f64,
    /// Fraction of velocity lost per tick
    pub velocity_decay: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
}

impl Default for LayoutParams {
    fn default() -> Self {
        let alpha_min: f64 = 0.001;
        Self {
            charge: -200.0,
            link_distance: 80.0,
            velocity_decay: 0.4,
            alpha_min,
            // Reach alpha_min from 1.0 in 300 ticks
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
        }
    }
}

/// Velocity-Verlet style simulation with repulsion, link springs and
/// centering. Fully deterministic: the same graph always lands in the same
/// place.
#[derive(Debug, Clone)]
pub struct ForceLayout {
    params: LayoutParams,
    positions: Vec<Point>,
    velocities: Vec<Point>,
    links: Vec<(usize, usize)>,
    degree: Vec<usize>,
    alpha: f64,
}

impl ForceLayout {
    pub fn new(node_count: usize, links: Vec<(usize, usize)>) -> Self {
        Self::with_params(node_count, links, LayoutParams::default())
    }

    pub fn from_index(index: &GraphIndex) -> Self {
        Self::new(index.node_count(), index.edge_positions())
    }

    pub fn with_params(node_count: usize, links: Vec<(usize, usize)>, params: LayoutParams) -> Self {
        let links: Vec<(usize, usize)> = links
            .into_iter()
            .filter(|&(s, t)| s < node_count && t < node_count && s != t)
            .collect();

        let mut degree = vec![0; node_count];
        for &(s, t) in &links {
            degree[s] += 1;
            degree[t] += 1;
        }

        let radius = params.link_distance.max(node_count as f64 * 10.0 / TAU * 2.0);
        let positions = (0..node_count)
            .map(|i| {
                let angle = TAU * i as f64 / node_count.max(1) as f64;
                Point {
                    x: radius * angle.cos(),
                    y: radius * angle.sin(),
                }
            })
            .collect();

        Self {
            params,
            positions,
            velocities: vec![Point { x: 0.0, y: 0.0 }; node_count],
            links,
            degree,
            alpha: 1.0,
        }
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn is_settled(&self) -> bool {
        self.alpha < self.params.alpha_min
    }

    /// Restart cooling from `alpha`
    pub fn reheat(&mut self, alpha: f64) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Advance one step. Returns false once the simulation has cooled.
    pub fn tick(&mut self) -> bool {
        if self.is_settled() {
            return false;
        }
        self.alpha += (0.0 - self.alpha) * self.params.alpha_decay;

        self.apply_links();
        self.apply_charge();

        let keep = 1.0 - self.params.velocity_decay;
        for (p, v) in self.positions.iter_mut().zip(self.velocities.iter_mut()) {
            v.x *= keep;
            v.y *= keep;
            p.x += v.x;
            p.y += v.y;
        }

        self.apply_centering();
        true
    }

    pub fn run(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && self.tick() {
            ticks += 1;
        }
        ticks
    }

    /// (min, max) corners of the current placement
    pub fn bounds(&self) -> Option<(Point, Point)> {
        let first = *self.positions.first()?;
        let (min, max) = self.positions.iter().fold((first, first), |(min, max), p| {
            (
                Point {
                    x: min.x.min(p.x),
                    y: min.y.min(p.y),
                },
                Point {
                    x: max.x.max(p.x),
                    y: max.y.max(p.y),
                },
            )
        });
        Some((min, max))
    }

    fn apply_links(&mut self) {
        for &(s, t) in &self.links {
            let (ds, dt) = (self.degree[s] as f64, self.degree[t] as f64);
            let strength = 1.0 / ds.min(dt);
            let bias = ds / (ds + dt);

            let mut dx = self.positions[t].x + self.velocities[t].x
                - self.positions[s].x
                - self.velocities[s].x;
            let mut dy = self.positions[t].y + self.velocities[t].y
                - self.positions[s].y
                - self.velocities[s].y;
            if dx == 0.0 && dy == 0.0 {
                dx = 1e-6;
                dy = 1e-6;
            }
            let len = (dx * dx + dy * dy).sqrt();
            let scale = (len - self.params.link_distance) / len * self.alpha * strength;
            dx *= scale;
            dy *= scale;

            self.velocities[t].x -= dx * bias;
            self.velocities[t].y -= dy * bias;
            self.velocities[s].x += dx * (1.0 - bias);
            self.velocities[s].y += dy * (1.0 - bias);
        }
    }

    fn apply_charge(&mut self) {
        let n = self.positions.len();
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let dx = self.positions[j].x - self.positions[i].x;
                let dy = self.positions[j].y - self.positions[i].y;
                // Floor at 1 so coincident nodes don't explode
                let dist2 = (dx * dx + dy * dy).max(1.0);
                let w = self.params.charge * self.alpha / dist2;
                self.velocities[i].x += dx * w;
                self.velocities[i].y += dy * w;
            }
        }
    }

    fn apply_centering(&mut self) {
        let n = self.positions.len();
        if n == 0 {
            return;
        }
        let (sx, sy) = self
            .positions
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        let (cx, cy) = (sx / n as f64, sy / n as f64);
        for p in &mut self.positions {
            p.x -= cx;
            p.y -= cy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance(a: Point, b: Point) -> f64 {
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
    }

    #[test]
    fn test_layout_is_deterministic() {
        let links = vec![(0, 1), (1, 2), (2, 0), (2, 3)];
        let mut a = ForceLayout::new(5, links.clone());
        let mut b = ForceLayout::new(5, links);
        a.run(300);
        b.run(300);

        assert_eq!(a.positions(), b.positions());
    }

    #[test]
    fn test_layout_cools_and_stays_finite() {
        let links = (1..20).map(|i| (0, i)).collect();
        let mut layout = ForceLayout::new(20, links);
        let ticks = layout.run(1000);

        assert!(ticks <= 301, "took {} ticks", ticks);
        assert!(layout.is_settled());
        assert!(!layout.tick());
        assert!(
            layout
                .positions()
                .iter()
                .all(|p| p.x.is_finite() && p.y.is_finite())
        );
    }

    #[test]
    fn test_linked_nodes_end_closer_than_unlinked() {
        let mut layout = ForceLayout::new(3, vec![(0, 1)]);
        layout.run(300);
        let p = layout.positions();

        assert!(distance(p[0], p[1]) < distance(p[0], p[2]));
    }

    #[test]
    fn test_reheat_restarts_cooling() {
        let mut layout = ForceLayout::new(2, vec![(0, 1)]);
        layout.run(1000);
        assert!(layout.is_settled());

        layout.reheat(0.5);
        assert!(!layout.is_settled());
        assert!(layout.tick());
    }

    #[test]
    fn test_out_of_range_and_self_links_are_ignored() {
        let mut layout = ForceLayout::new(2, vec![(0, 0), (0, 7)]);
        layout.run(10);

        assert_eq!(layout.positions().len(), 2);
        assert!(layout.bounds().is_some());
        assert!(ForceLayout::new(0, Vec::new()).bounds().is_none());
    }
}
