//! Processes: decision trees with synchronous action lists.

use crate::module::{Attributes, SigSig};
use crate::sigspec::SigSpec;
use cxxsim_utils::Id;

/// The trigger kind of a [`SyncRule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncType {
    /// Rising edge.
    Posedge,
    /// Falling edge.
    Negedge,
    /// Either edge.
    Edge,
    /// Level 0.
    Low,
    /// Level 1.
    High,
    /// Unconditional.
    Always,
    /// Global clock; rejected by the backend.
    Global,
    /// Initialization; must be lowered away before code generation.
    Init,
}

impl SyncType {
    pub fn is_edge(self) -> bool {
        matches!(self, SyncType::Posedge | SyncType::Negedge | SyncType::Edge)
    }
}

/// One arm of a decision tree. The root case of a process has an empty
/// `compare` list; nested cases compare their parent switch's signal against
/// each entry of `compare` (empty means "default").
#[derive(Clone, Debug, Default)]
pub struct CaseRule {
    pub compare: Vec<SigSpec>,
    pub actions: Vec<SigSig>,
    pub switches: Vec<SwitchRule>,
    pub attributes: Attributes,
}

/// A multi-way branch on `signal`.
#[derive(Clone, Debug)]
pub struct SwitchRule {
    pub signal: SigSpec,
    pub cases: Vec<CaseRule>,
    pub attributes: Attributes,
}

impl SwitchRule {
    pub fn new(signal: SigSpec) -> Self {
        SwitchRule { signal, cases: Vec::new(), attributes: Attributes::default() }
    }
}

/// Actions executed when `signal` matches the trigger described by `kind`.
#[derive(Clone, Debug)]
pub struct SyncRule {
    pub kind: SyncType,
    pub signal: SigSpec,
    pub actions: Vec<SigSig>,
}

/// A behavioral process: a root decision tree plus a list of sync rules.
#[derive(Clone, Debug)]
pub struct Process {
    pub name: Id,
    pub root_case: CaseRule,
    pub syncs: Vec<SyncRule>,
    pub attributes: Attributes,
}

impl Process {
    pub fn new<N: Into<Id>>(name: N) -> Self {
        Process {
            name: name.into(),
            root_case: CaseRule::default(),
            syncs: Vec::new(),
            attributes: Attributes::default(),
        }
    }
}
