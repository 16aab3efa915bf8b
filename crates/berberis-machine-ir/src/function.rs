//! `Function`/`BasicBlock`/`Edge`: the arena-owned CFG.
//!
//! `spec.md` §9 calls out that `BasicBlock ↔ Edge` is a cycle and directs
//! implementing it as "a `Function` arena owns both `BasicBlock`s and
//! `Edge`s; blocks and edges hold arena indices (not owning pointers) to
//! each other" — `BlockId`/`EdgeId` below are exactly that. The C++ source
//! (`backend/include/berberis/backend/x86_64/machine_ir_builder.h`) instead
//! gives blocks and edges raw pointers into a `bump_pointer` arena; an
//! index-based arena is the idiomatic Rust substitute for that ownership
//! shape without unsafe code or reference-counting.

use crate::instruction::Instruction;
use crate::reg::MachineReg;
use berberis_base::fatal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub usize);

#[derive(Debug, Default)]
pub struct BasicBlock {
    pub insns: Vec<Instruction>,
    pub in_edges: Vec<EdgeId>,
    pub out_edges: Vec<EdgeId>,
    pub live_in: Vec<MachineReg>,
    pub live_out: Vec<MachineReg>,
}

/// Reload/spill fixup instructions attached to one control-flow edge,
/// executed only when control actually crosses that edge. `src`/`dst` are
/// arena indices into the owning `Function`, not pointers — see the module
/// doc comment.
#[derive(Debug)]
pub struct Edge {
    pub src: BlockId,
    pub dst: BlockId,
    pub insns: Vec<Instruction>,
}

/// Owns every `BasicBlock` and `Edge` for one translated guest function.
/// Blocks are kept in program order in `blocks`; `block_order` additionally
/// records the order they were appended to the function (insertion order),
/// which for a builder that emits blocks as it walks the guest code is the
/// same thing, but is kept distinct so a future block-reordering pass can
/// change layout without renumbering ids.
#[derive(Debug, Default)]
pub struct Function {
    blocks: Vec<BasicBlock>,
    edges: Vec<Edge>,
    block_order: Vec<BlockId>,
    next_vreg: u32,
}

impl Function {
    pub fn new() -> Self {
        Function::default()
    }

    pub fn alloc_vreg(&mut self) -> MachineReg {
        let reg = MachineReg::virtual_reg(self.next_vreg);
        self.next_vreg += 1;
        reg
    }

    pub fn new_block(&mut self) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(BasicBlock::default());
        self.block_order.push(id);
        id
    }

    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.0]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        &mut self.blocks[id.0]
    }

    /// Blocks in the order they were created, the order the debug and DOT
    /// printers walk.
    pub fn blocks_in_order(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> {
        self.block_order.iter().map(|&id| (id, &self.blocks[id.0]))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Creates an edge from `src` to `dst` and registers it in both blocks'
    /// edge lists. Fatal if either endpoint doesn't exist — a caller asking
    /// to link unknown blocks is a builder bug.
    pub fn add_edge(&mut self, src: BlockId, dst: BlockId) -> EdgeId {
        if src.0 >= self.blocks.len() || dst.0 >= self.blocks.len() {
            fatal!("add_edge: block id out of range");
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge {
            src,
            dst,
            insns: Vec::new(),
        });
        self.blocks[src.0].out_edges.push(id);
        self.blocks[dst.0].in_edges.push(id);
        id
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.0]
    }

    pub fn push_insn(&mut self, block: BlockId, insn: Instruction) {
        self.blocks[block.0].insns.push(insn);
    }

    /// Every basic block has at least one terminator, per `spec.md` §4.2.
    pub fn has_terminators(&self) -> bool {
        self.blocks
            .iter()
            .all(|bb| bb.insns.last().is_some_and(Instruction::is_terminator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{ExitKind, Instruction};

    #[test]
    fn add_edge_links_both_endpoints() {
        let mut f = Function::new();
        let a = f.new_block();
        let b = f.new_block();
        let edge = f.add_edge(a, b);
        assert_eq!(f.block(a).out_edges, vec![edge]);
        assert_eq!(f.block(b).in_edges, vec![edge]);
        assert_eq!(f.edge(edge).src, a);
        assert_eq!(f.edge(edge).dst, b);
    }

    #[test]
    fn has_terminators_requires_every_block_to_end_in_one() {
        let mut f = Function::new();
        let a = f.new_block();
        assert!(!f.has_terminators());
        f.push_insn(
            a,
            Instruction::JumpToExit {
                target: 0,
                kind: ExitKind::ExitGeneratedCode,
            },
        );
        assert!(f.has_terminators());
    }

    #[test]
    fn alloc_vreg_hands_out_distinct_indices() {
        let mut f = Function::new();
        let v0 = f.alloc_vreg();
        let v1 = f.alloc_vreg();
        assert_ne!(v0.index(), v1.index());
    }
}
