//! Rig topology: pods of boards of branches
//!
//! A **branch** is one RGB strip occupying three channels on a DMX-32 board.
//! A **limb** is the group of 5-11 branches sharing one mounting pipe.
//! A **pod** is up to four boards (40 branches) wired to one DMX universe.
//!
//! [`TopologyIndex::resolve`] turns [`TopologyParams`] into a flat list of
//! [`Branch`]es. Traversal order is pods in declaration order, then limbs by
//! ascending limb number, then branches by ascending position. A branch's
//! position in that traversal is its index, and indices are stable for a
//! given configuration.
//!
//! ```rust
//! use aurora_core::topology::{BranchParams, PodParams, TopologyIndex, TopologyParams};
//!
//! let params = TopologyParams {
//!     links: vec!["/dev/ttyUSB0".to_string()],
//!     pods: vec![PodParams {
//!         name: "A".to_string(),
//!         link_id: 0,
//!         board_starts: vec![100],
//!         branches: vec![
//!             BranchParams { limb: 1, position: 0, board: 0, channels: [1, 2, 3] },
//!             BranchParams { limb: 1, position: 1, board: 0, channels: [4, 5, 6] },
//!         ],
//!     }],
//! };
//!
//! let topology = TopologyIndex::resolve(&params).unwrap();
//! assert_eq!(topology.branch(1).unwrap().addresses, [103, 104, 105]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::ops::RangeInclusive;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

/// Number of addressable channels in one DMX universe
pub const DMX_ADDRESSES: usize = 512;

/// Highest local channel number accepted on a board
pub const MAX_LOCAL_CHANNEL: u16 = 32;

/// Boards a pod is built for
pub const NOMINAL_BOARDS_PER_POD: usize = 4;

/// Branches a pod is built for (10 per board)
pub const NOMINAL_BRANCHES_PER_POD: usize = 40;

/// Branches a limb is built for
pub const NOMINAL_LIMB_SIZE: RangeInclusive<usize> = 5..=11;

/// One configured branch: where it hangs and which board channels drive it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchParams {
    /// Limb number within the pod (1-based in practice)
    pub limb: u32,
    /// Position on the limb, 0-based
    pub position: u32,
    /// Board index within the pod
    pub board: usize,
    /// Red, green, blue channel on the board
    pub channels: [u16; 3],
}

/// One configured pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodParams {
    pub name: String,
    /// Index into [`TopologyParams::links`]
    pub link_id: usize,
    /// Start address of board 0, 1, ...
    pub board_starts: Vec<u16>,
    pub branches: Vec<BranchParams>,
}

/// Resolved configuration parameters consumed by [`TopologyIndex::resolve`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyParams {
    /// Transport link identifiers (e.g. serial device paths), one per universe
    pub links: Vec<String>,
    pub pods: Vec<PodParams>,
}

/// The smallest addressable light unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Branch {
    /// `<pod>-<limb>-<position>`
    pub name: String,
    /// Stable index in the topology
    pub index: usize,
    /// Universe this branch is wired to
    pub link_id: usize,
    /// Board index within the pod
    pub board: usize,
    /// Start address of the board
    pub board_start: u16,
    /// Board-local channels (r, g, b)
    pub channels: [u16; 3],
    /// Absolute DMX addresses (r, g, b), each in 0..512
    pub addresses: [u16; 3],
    limb: u32,
    position: u32,
}

impl Branch {
    fn resolve(
        name: String,
        index: usize,
        link_id: usize,
        board_start: u16,
        params: &BranchParams,
    ) -> Result<Self> {
        let mut addresses = [0u16; 3];
        for (slot, &local) in addresses.iter_mut().zip(params.channels.iter()) {
            *slot = resolve_address(&name, board_start, local)?;
        }

        Ok(Self {
            name,
            index,
            link_id,
            board: params.board,
            board_start,
            channels: params.channels,
            addresses,
            limb: params.limb,
            position: params.position,
        })
    }

    /// Limb number this branch hangs on
    pub fn limb_number(&self) -> u32 {
        self.limb
    }

    /// Position on its limb, 0-based
    pub fn position(&self) -> u32 {
        self.position
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} index {:3}, bd: {} chan: {:>12} DMX[{}]: {:?}",
            self.name,
            self.index,
            self.board,
            format!("{:?}", self.channels),
            self.link_id,
            self.addresses,
        )
    }
}

/// `board_start + local - 1`, or `ChannelOutOfRange`
fn resolve_address(branch: &str, board_start: u16, local: u16) -> Result<u16> {
    let resolved = i32::from(board_start) + i32::from(local) - 1;
    let in_range = local <= MAX_LOCAL_CHANNEL && (0..DMX_ADDRESSES as i32).contains(&resolved);

    match u16::try_from(resolved) {
        Ok(address) if in_range => Ok(address),
        _ => Err(ConfigError::ChannelOutOfRange {
            branch: branch.to_string(),
            local_channel: local,
            board_start,
        }),
    }
}

/// Branches sharing a mounting pipe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Limb {
    /// `<pod>-<limb>`
    pub name: String,
    pub number: u32,
    /// Topology indices of the branches, in position order
    pub branches: Vec<usize>,
}

impl Limb {
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

/// Boards sharing one universe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pod {
    pub name: String,
    pub link_id: usize,
    pub board_starts: Vec<u16>,
    pub limbs: Vec<Limb>,
}

impl Pod {
    /// Total branches across all limbs
    pub fn branch_count(&self) -> usize {
        self.limbs.iter().map(Limb::len).sum()
    }
}

/// Immutable, flattened topology. Built once at startup.
///
/// Deserializes from [`TopologyParams`] and goes through
/// [`resolve`](Self::resolve), so every address in it has been range checked.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "TopologyParams")]
pub struct TopologyIndex {
    links: Vec<String>,
    pods: Vec<Pod>,
    branches: Vec<Branch>,
}

impl TryFrom<TopologyParams> for TopologyIndex {
    type Error = ConfigError;

    fn try_from(params: TopologyParams) -> Result<Self> {
        Self::resolve(&params)
    }
}

impl TopologyIndex {
    /// Resolve configuration parameters into a topology.
    ///
    /// Either the whole topology is valid and returned, or the first
    /// configuration error is.
    ///
    /// # Errors
    ///
    /// `ChannelOutOfRange`, `UnknownBoard`, `DuplicateBranch`, `PositionGap`
    /// or `DuplicatePod` when the parameters describe an impossible rig.
    pub fn resolve(params: &TopologyParams) -> Result<Self> {
        let mut pods = Vec::with_capacity(params.pods.len());
        let mut branches = Vec::new();
        let mut pod_names = HashSet::new();

        for pod in &params.pods {
            if !pod_names.insert(pod.name.as_str()) {
                return Err(ConfigError::DuplicatePod(pod.name.clone()));
            }
            if pod.link_id >= params.links.len() {
                warn!(
                    "Pod {} is on universe {}, but only {} universe(s) are configured",
                    pod.name,
                    pod.link_id,
                    params.links.len()
                );
            }
            if pod.board_starts.len() > NOMINAL_BOARDS_PER_POD {
                warn!(
                    "Pod {} has {} boards (built for {})",
                    pod.name,
                    pod.board_starts.len(),
                    NOMINAL_BOARDS_PER_POD
                );
            }

            let mut by_limb: BTreeMap<u32, BTreeMap<u32, &BranchParams>> = BTreeMap::new();
            for branch in &pod.branches {
                let positions = by_limb.entry(branch.limb).or_default();
                if positions.insert(branch.position, branch).is_some() {
                    return Err(ConfigError::DuplicateBranch(format!(
                        "{}-{}-{}",
                        pod.name, branch.limb, branch.position
                    )));
                }
            }

            let mut limbs = Vec::with_capacity(by_limb.len());
            for (limb_number, positions) in by_limb {
                let limb_name = format!("{}-{}", pod.name, limb_number);
                let mut indices = Vec::with_capacity(positions.len());

                for (expected, (&position, branch)) in (0u32..).zip(positions.iter()) {
                    if position != expected {
                        return Err(ConfigError::PositionGap {
                            limb: limb_name,
                            expected,
                            found: position,
                        });
                    }

                    let name = format!("{}-{}", limb_name, position);
                    let board_start = *pod.board_starts.get(branch.board).ok_or_else(|| {
                        ConfigError::UnknownBoard {
                            branch: name.clone(),
                            board: branch.board,
                            boards: pod.board_starts.len(),
                        }
                    })?;

                    let resolved =
                        Branch::resolve(name, branches.len(), pod.link_id, board_start, branch)?;
                    debug!("Resolved {}", resolved);
                    indices.push(resolved.index);
                    branches.push(resolved);
                }

                if !NOMINAL_LIMB_SIZE.contains(&indices.len()) {
                    warn!("Limb {} has {} branches", limb_name, indices.len());
                }

                limbs.push(Limb {
                    name: limb_name,
                    number: limb_number,
                    branches: indices,
                });
            }

            let resolved_pod = Pod {
                name: pod.name.clone(),
                link_id: pod.link_id,
                board_starts: pod.board_starts.clone(),
                limbs,
            };
            if resolved_pod.branch_count() > NOMINAL_BRANCHES_PER_POD {
                warn!(
                    "Pod {} has {} branches (built for {})",
                    resolved_pod.name,
                    resolved_pod.branch_count(),
                    NOMINAL_BRANCHES_PER_POD
                );
            }
            pods.push(resolved_pod);
        }

        info!(
            "Topology resolved: {} pods, {} limbs, {} branches on {} universe(s)",
            pods.len(),
            pods.iter().map(|p| p.limbs.len()).sum::<usize>(),
            branches.len(),
            params.links.len()
        );

        Ok(Self {
            links: params.links.clone(),
            pods,
            branches,
        })
    }

    /// Number of branches
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Branch by stable index
    pub fn branch(&self, index: usize) -> Option<&Branch> {
        self.branches.get(index)
    }

    /// All branches in index order
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    pub fn pods(&self) -> &[Pod] {
        &self.pods
    }

    /// All limbs across all pods, in traversal order
    pub fn limbs(&self) -> impl Iterator<Item = &Limb> {
        self.pods.iter().flat_map(|pod| pod.limbs.iter())
    }

    /// Limb by its position in [`limbs`](Self::limbs)
    pub fn limb(&self, index: usize) -> Option<&Limb> {
        self.limbs().nth(index)
    }

    /// Branch at `position` on the `limb`-th limb
    pub fn branch_at(&self, limb: usize, position: usize) -> Option<&Branch> {
        let index = *self.limb(limb)?.branches.get(position)?;
        self.branch(index)
    }

    /// Branch by name, e.g. `"A-2-4"`
    pub fn find(&self, name: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.name == name)
    }

    /// Configured link identifiers, indexed by link id
    pub fn link_ids(&self) -> &[String] {
        &self.links
    }
}
