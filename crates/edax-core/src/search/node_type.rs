//! Compile-time node classification for the alpha-beta search.

/// A node searched with a null window; candidates for aggressive pruning.
pub struct NonPV;

/// A principal-variation node, searched with the full window.
pub struct PV;

/// The root of the search tree.
pub struct Root;

/// Marker trait specializing the search per node class at compile time.
pub trait NodeType {
    /// True for PV and Root nodes.
    const PV_NODE: bool;
    /// True for the root only.
    const ROOT_NODE: bool;
    /// Runtime tag used when re-entering the search from a split point.
    const TYPE_ID: u32;
}

impl NodeType for NonPV {
    const PV_NODE: bool = false;
    const ROOT_NODE: bool = false;
    const TYPE_ID: u32 = 1;
}

impl NodeType for PV {
    const PV_NODE: bool = true;
    const ROOT_NODE: bool = false;
    const TYPE_ID: u32 = 2;
}

impl NodeType for Root {
    const PV_NODE: bool = true;
    const ROOT_NODE: bool = true;
    const TYPE_ID: u32 = 3;
}
