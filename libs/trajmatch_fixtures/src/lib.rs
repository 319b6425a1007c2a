//! Synthetic road networks and trajectories used by tests and benchmarks.
//!
//! Fixtures are planar unless noted: coordinates are metres, so they should
//! be loaded with a Euclidean distance function.

/// `(id, x, y)`
pub type NodeFixture = (i64, f64, f64);

/// `(x, y, time)`
pub type SampleFixture = (f64, f64, f64);

#[derive(Debug, Clone)]
pub struct WayFixture {
    pub id: i64,
    pub nodes: Vec<i64>,
    pub one_way: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkFixture {
    pub nodes: Vec<NodeFixture>,
    pub ways: Vec<WayFixture>,
}

#[derive(Debug, Clone)]
pub struct TrajectoryFixture {
    pub id: u64,
    pub samples: Vec<SampleFixture>,
}

impl NetworkFixture {
    fn node(mut self, id: i64, x: f64, y: f64) -> Self {
        self.nodes.push((id, x, y));
        self
    }

    fn way(mut self, id: i64, nodes: &[i64], one_way: bool) -> Self {
        self.ways.push(WayFixture {
            id,
            nodes: nodes.to_vec(),
            one_way,
        });
        self
    }
}

/// Two unconnected, parallel, two-way roads running west to east, 20m apart.
///
/// Way `1` lies on `y = 0`, way `2` on `y = 20`.
pub fn parallel_roads() -> NetworkFixture {
    NetworkFixture::default()
        .node(1, 0.0, 0.0)
        .node(2, 100.0, 0.0)
        .node(3, 0.0, 20.0)
        .node(4, 100.0, 20.0)
        .way(1, &[1, 2], false)
        .way(2, &[3, 4], false)
}

/// A straight main road along `y = 0` (ways `10` and `11`), crossed at
/// `x = 100` by a side street (way `12`) leading north to a parallel
/// back road (ways `13`, `14`) which rejoins the main road at `x = 200`.
pub fn crossroads() -> NetworkFixture {
    NetworkFixture::default()
        .node(1, 0.0, 0.0)
        .node(2, 100.0, 0.0)
        .node(3, 200.0, 0.0)
        .node(4, 100.0, 100.0)
        .node(5, 200.0, 100.0)
        .way(10, &[1, 2], false)
        .way(11, &[2, 3], false)
        .way(12, &[2, 4], false)
        .way(13, &[4, 5], false)
        .way(14, &[5, 3], false)
}

/// A straight road along `y = 0`, made of ways `20` (`x` in `0..200`)
/// and `21` (`x` in `200..400`).
pub fn straight_road() -> NetworkFixture {
    NetworkFixture::default()
        .node(1, 0.0, 0.0)
        .node(2, 200.0, 0.0)
        .node(3, 400.0, 0.0)
        .way(20, &[1, 2], false)
        .way(21, &[2, 3], false)
}

/// Two components with no connection: way `30` spans `x` in `0..100`, way
/// `31` spans `x` in `200..300`, both on `y = 0`.
pub fn disconnected() -> NetworkFixture {
    NetworkFixture::default()
        .node(1, 0.0, 0.0)
        .node(2, 100.0, 0.0)
        .node(3, 200.0, 0.0)
        .node(4, 300.0, 0.0)
        .way(30, &[1, 2], false)
        .way(31, &[3, 4], false)
}

/// A one-way road `40` heading east from `(0, 0)` to `(100, 0)`.
pub fn one_way_road() -> NetworkFixture {
    NetworkFixture::default()
        .node(1, 0.0, 0.0)
        .node(2, 50.0, 0.0)
        .node(3, 100.0, 0.0)
        .way(40, &[1, 2, 3], true)
}

/// A `rows` by `columns` lattice of two-way streets, `spacing` metres apart.
///
/// Node `r * columns + c` sits at `(c * spacing, r * spacing)`. Horizontal
/// streets have ids starting at `1`, vertical streets follow them.
pub fn city_grid(rows: usize, columns: usize, spacing: f64) -> NetworkFixture {
    let mut network = NetworkFixture::default();
    let node = |r: usize, c: usize| (r * columns + c) as i64;

    for r in 0..rows {
        for c in 0..columns {
            network = network.node(node(r, c), c as f64 * spacing, r as f64 * spacing);
        }
    }

    let mut id = 1;
    for r in 0..rows {
        for c in 0..columns.saturating_sub(1) {
            network = network.way(id, &[node(r, c), node(r, c + 1)], false);
            id += 1;
        }
    }

    for c in 0..columns {
        for r in 0..rows.saturating_sub(1) {
            network = network.way(id, &[node(r, c), node(r + 1, c)], false);
            id += 1;
        }
    }

    network
}

/// A [`city_grid`] in longitude and latitude, with its south-west corner at
/// `origin` and `spacing` degrees between streets. Load with a great-circle
/// distance function.
pub fn geographic_grid(rows: usize, columns: usize, origin: (f64, f64), spacing: f64) -> NetworkFixture {
    let mut network = city_grid(rows, columns, 1.0);
    for (_, x, y) in network.nodes.iter_mut() {
        (*x, *y) = (origin.0 + *x * spacing, origin.1 + *y * spacing);
    }

    network
}

/// Deterministic xorshift generator, so fixtures are reproducible without
/// pulling in a random number crate.
#[derive(Debug, Clone)]
pub struct Shuffle(u64);

impl Shuffle {
    pub fn new(seed: u64) -> Self {
        Shuffle(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Uniform in `[-1, 1)`.
    pub fn unit(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64 * 2.0 - 1.0
    }

    pub fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() % bound.max(1) as u64) as usize
    }
}

/// Random walks over a [`city_grid`], sampled every half block with up to
/// `noise` metres of jitter and five seconds between samples.
pub fn grid_trajectories(
    count: usize,
    blocks: usize,
    rows: usize,
    columns: usize,
    spacing: f64,
    noise: f64,
    seed: u64,
) -> Vec<TrajectoryFixture> {
    let mut random = Shuffle::new(seed);

    (0..count)
        .map(|id| {
            let (mut r, mut c) = (random.below(rows), random.below(columns));
            let mut time = 0.0;
            let mut samples = vec![];

            for _ in 0..blocks {
                let (dr, dc) = match random.below(4) {
                    0 if r + 1 < rows => (1, 0),
                    1 if r > 0 => (-1, 0),
                    2 if c + 1 < columns => (0, 1),
                    _ if c > 0 => (0, -1),
                    _ => (0, 1),
                };

                let (nr, nc) = ((r as isize + dr) as usize, (c as isize + dc) as usize);
                let (x0, y0) = (c as f64 * spacing, r as f64 * spacing);
                let (x1, y1) = (nc as f64 * spacing, nr as f64 * spacing);

                for step in [0.25, 0.75] {
                    samples.push((
                        x0 + (x1 - x0) * step + random.unit() * noise,
                        y0 + (y1 - y0) * step + random.unit() * noise,
                        time,
                    ));
                    time += 5.0;
                }

                (r, c) = (nr, nc);
            }

            TrajectoryFixture {
                id: id as u64,
                samples,
            }
        })
        .collect()
}
