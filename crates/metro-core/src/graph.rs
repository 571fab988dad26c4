//! # Station Graph Module
//!
//! Undirected weighted graph of station codes with a route distance query.
//!
//! ## Route Query Outcomes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  distance(source, dest)                                                 │
//! │                                                                         │
//! │  ├── source == dest, both known      → Km(0)                           │
//! │  ├── either code unregistered        → UnknownStation                  │
//! │  ├── no path between the components  → NoRoute                         │
//! │  └── path found                      → Km(total km along BFS path)     │
//! │                                                                         │
//! │  Callers must distinguish all three non-trivial cases: "same station"  │
//! │  is a valid zero, "unknown code" is a typo, "no route" is a real but   │
//! │  unreachable pair.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Note
//! `distance` runs a breadth-first traversal that accumulates edge weights
//! and returns the distance at which the destination is first reached. This
//! is shortest-by-hop-count, not shortest-by-weight: on topologies where a
//! longer-hop path is lighter, BFS reports the fewer-hop path's weight. The
//! production network is small enough that this is the accepted behavior;
//! see `test_bfs_prefers_fewer_hops_over_lighter_path` for the documented
//! case. A general-topology deployment would swap in weighted relaxation
//! (Dijkstra) behind the same contract.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::Station;

// =============================================================================
// Route Distance
// =============================================================================

/// Result of a route distance query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteDistance {
    /// Distance in kilometres; 0 means source and destination are the same
    /// known station.
    Km(u32),
    /// Both stations are known but no path connects them.
    NoRoute,
    /// At least one station code is not registered.
    UnknownStation,
}

impl RouteDistance {
    /// Returns the distance when the route is usable for fare calculation
    /// (known stations, connected, strictly positive distance).
    pub fn chargeable_km(&self) -> Option<u32> {
        match self {
            RouteDistance::Km(km) if *km > 0 => Some(*km),
            _ => None,
        }
    }
}

// =============================================================================
// Station Graph
// =============================================================================

/// Undirected weighted graph of station codes.
///
/// ## Ownership
/// Process-wide and read-mostly. Structural edits happen only through the
/// admin primitives [`StationGraph::add_station`] and
/// [`StationGraph::add_or_update_edge`]; concurrent publication is the
/// engine's concern (it swaps in fully built snapshots).
///
/// ## Invariants
/// - Edges are symmetric: inserting A→B with weight w inserts B→A with the
///   same w
/// - Edge weights are strictly positive
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationGraph {
    /// Station records keyed by code.
    stations: BTreeMap<String, Station>,

    /// Ordered adjacency: code → (neighbor code → distance in km).
    edges: BTreeMap<String, BTreeMap<String, u32>>,
}

impl StationGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        StationGraph::default()
    }

    /// Registers a station record. Re-registering a code replaces the
    /// descriptive record and keeps existing edges.
    pub fn add_station(&mut self, station: Station) {
        self.edges.entry(station.code.clone()).or_default();
        self.stations.insert(station.code.clone(), station);
    }

    /// Adds or updates an undirected edge between two known codes.
    ///
    /// Both directions are written with the same weight, preserving the
    /// symmetry invariant. Zero-weight edges are ignored.
    pub fn add_or_update_edge(&mut self, a: &str, b: &str, km: u32) {
        if km == 0 || a == b {
            return;
        }
        self.edges
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string(), km);
        self.edges
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string(), km);
    }

    /// Looks up a station record by code.
    pub fn station(&self, code: &str) -> Option<&Station> {
        self.stations.get(code)
    }

    /// True when the code is registered.
    pub fn contains(&self, code: &str) -> bool {
        self.stations.contains_key(code)
    }

    /// Iterates all registered stations in code order.
    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    /// Number of registered stations.
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    /// True when no stations are registered.
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Computes the route distance between two station codes.
    ///
    /// Breadth-first traversal from `source`, visiting each station once
    /// and accumulating edge weights; returns the first distance at which
    /// `dest` is reached. See the module doc for the hop-count caveat.
    pub fn distance(&self, source: &str, dest: &str) -> RouteDistance {
        if !self.contains(source) || !self.contains(dest) {
            return RouteDistance::UnknownStation;
        }
        if source == dest {
            return RouteDistance::Km(0);
        }

        let mut dist: BTreeMap<&str, u32> = BTreeMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        dist.insert(source, 0);
        queue.push_back(source);

        while let Some(curr) = queue.pop_front() {
            let curr_km = dist[curr];
            let Some(neighbors) = self.edges.get(curr) else {
                continue;
            };

            for (nbr, edge_km) in neighbors {
                if dist.contains_key(nbr.as_str()) {
                    continue;
                }
                let total = curr_km + edge_km;
                if nbr == dest {
                    return RouteDistance::Km(total);
                }
                dist.insert(nbr, total);
                queue.push_back(nbr);
            }
        }

        RouteDistance::NoRoute
    }

    /// Builds the fixed five-station production network.
    ///
    /// ```text
    ///        5        3        7        4
    ///   a ────── b ────── c ────── d ────── e
    ///   └──────────────── 12 ───────────────┘
    /// ```
    pub fn demo_network() -> Self {
        let mut g = StationGraph::new();
        g.add_station(Station::new("a", "Motera Stadium", true, true, true));
        g.add_station(Station::new("b", "Central Market", false, true, false));
        g.add_station(Station::new("c", "Residential Area", true, false, true));
        g.add_station(Station::new("d", "Commercial District", false, true, true));
        g.add_station(Station::new("e", "University Campus", true, true, false));

        g.add_or_update_edge("a", "b", 5);
        g.add_or_update_edge("b", "c", 3);
        g.add_or_update_edge("c", "d", 7);
        g.add_or_update_edge("d", "e", 4);
        g.add_or_update_edge("a", "e", 12);
        g
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
