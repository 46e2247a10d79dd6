//! Signal descriptions: constants, chunks, bits, and chunk sequences.

use crate::common::WireId;
use crate::module::Module;
use smallvec::{smallvec, SmallVec};

/// A single logic level.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    S0,
    S1,
    Sx,
    Sz,
    /// "Don't care" in case comparisons.
    Sa,
}

impl State {
    pub fn is_def(self) -> bool {
        matches!(self, State::S0 | State::S1)
    }

    pub fn from_bool(b: bool) -> Self {
        if b {
            State::S1
        } else {
            State::S0
        }
    }
}

/// A constant: a bit vector (LSB first) or, rarely, a string (used for
/// parameters such as the memory identifier of a memory port cell).
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum Const {
    Bits(Vec<State>),
    Str(String),
}

impl Const {
    pub fn from_u64(value: u64, width: usize) -> Self {
        let bits = (0..width)
            .map(|i| {
                if i < 64 && (value >> i) & 1 == 1 {
                    State::S1
                } else {
                    State::S0
                }
            })
            .collect();
        Const::Bits(bits)
    }

    pub fn zeros(width: usize) -> Self {
        Const::Bits(vec![State::S0; width])
    }

    pub fn ones(width: usize) -> Self {
        Const::Bits(vec![State::S1; width])
    }

    pub fn string<S: ToString>(s: S) -> Self {
        Const::Str(s.to_string())
    }

    pub fn bits(&self) -> &[State] {
        match self {
            Const::Bits(bits) => bits,
            Const::Str(_) => panic!("bit access on a string constant"),
        }
    }

    pub fn len(&self) -> usize {
        self.bits().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bit(&self, index: usize) -> State {
        self.bits()[index]
    }

    pub fn extract(&self, offset: usize, width: usize) -> Const {
        Const::Bits(self.bits()[offset..offset + width].to_vec())
    }

    /// Interpret as an unsigned integer; undefined bits read as zero.
    pub fn as_u64(&self) -> u64 {
        self.bits()
            .iter()
            .take(64)
            .enumerate()
            .fold(0, |acc, (i, bit)| {
                acc | if *bit == State::S1 { 1 << i } else { 0 }
            })
    }

    pub fn as_u32(&self) -> u32 {
        self.as_u64() as u32
    }

    /// True when any bit is 1.
    pub fn as_bool(&self) -> bool {
        self.bits().contains(&State::S1)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Const::Str(s) => s,
            Const::Bits(_) => panic!("string access on a bit constant"),
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Const::Str(_))
    }

    pub fn is_fully_def(&self) -> bool {
        self.bits().iter().all(|bit| bit.is_def())
    }

    pub fn is_fully_ones(&self) -> bool {
        self.bits().iter().all(|bit| *bit == State::S1)
    }
}

/// A single signal bit: either one bit of a wire or a constant level.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum SigBit {
    Wire(WireId, u32),
    Const(State),
}

impl SigBit {
    pub fn wire(self) -> Option<WireId> {
        match self {
            SigBit::Wire(wire, _) => Some(wire),
            SigBit::Const(_) => None,
        }
    }
}

/// A contiguous piece of a signal: a slice of a wire or a constant run.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum SigChunk {
    Wire { wire: WireId, offset: u32, width: u32 },
    Const(Const),
}

impl SigChunk {
    pub fn width(&self) -> u32 {
        match self {
            SigChunk::Wire { width, .. } => *width,
            SigChunk::Const(value) => value.len() as u32,
        }
    }

    fn bit(&self, index: u32) -> SigBit {
        match self {
            SigChunk::Wire { wire, offset, .. } => {
                SigBit::Wire(*wire, offset + index)
            }
            SigChunk::Const(value) => SigBit::Const(value.bit(index as usize)),
        }
    }
}

/// An ordered, LSB-first sequence of chunks describing a signal.
#[derive(Clone, Debug, Hash, PartialEq, Eq, Default)]
pub struct SigSpec {
    chunks: SmallVec<[SigChunk; 1]>,
}

/// Append `bit` to `chunks`, merging into the last chunk when contiguous.
fn push_bit(chunks: &mut SmallVec<[SigChunk; 1]>, bit: SigBit) {
    match (chunks.last_mut(), bit) {
        (
            Some(SigChunk::Wire { wire, offset, width }),
            SigBit::Wire(bit_wire, bit_offset),
        ) if *wire == bit_wire && *offset + *width == bit_offset => {
            *width += 1;
        }
        (Some(SigChunk::Const(Const::Bits(bits))), SigBit::Const(state)) => {
            bits.push(state);
        }
        (_, SigBit::Wire(wire, offset)) => {
            chunks.push(SigChunk::Wire { wire, offset, width: 1 });
        }
        (_, SigBit::Const(state)) => {
            chunks.push(SigChunk::Const(Const::Bits(vec![state])));
        }
    }
}

impl SigSpec {
    pub fn new() -> Self {
        SigSpec::default()
    }

    pub fn from_chunk(chunk: SigChunk) -> Self {
        SigSpec { chunks: smallvec![chunk] }
    }

    /// The whole of `wire`, whose declared width is `width`.
    pub fn wire(wire: WireId, width: u32) -> Self {
        SigSpec::from_chunk(SigChunk::Wire { wire, offset: 0, width })
    }

    pub fn slice(wire: WireId, offset: u32, width: u32) -> Self {
        SigSpec::from_chunk(SigChunk::Wire { wire, offset, width })
    }

    pub fn constant(value: Const) -> Self {
        SigSpec::from_chunk(SigChunk::Const(value))
    }

    pub fn from_bits<I: IntoIterator<Item = SigBit>>(bits: I) -> Self {
        let mut chunks = SmallVec::new();
        for bit in bits {
            push_bit(&mut chunks, bit);
        }
        SigSpec { chunks }
    }

    /// Append a more-significant chunk.
    pub fn push(&mut self, chunk: SigChunk) {
        self.chunks.push(chunk);
    }

    pub fn chunks(&self) -> &[SigChunk] {
        &self.chunks
    }

    pub fn len(&self) -> u32 {
        self.chunks.iter().map(SigChunk::width).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn as_chunk(&self) -> Option<&SigChunk> {
        if self.chunks.len() == 1 {
            Some(&self.chunks[0])
        } else {
            None
        }
    }

    /// The wire this spec names in full, if it is a single chunk covering one
    /// entire wire in bit order.
    pub fn as_wire(&self, module: &Module) -> Option<WireId> {
        match self.as_chunk() {
            Some(&SigChunk::Wire { wire, offset: 0, width })
                if width == module.wire(wire).width =>
            {
                Some(wire)
            }
            _ => None,
        }
    }

    pub fn is_wire(&self, module: &Module) -> bool {
        self.as_wire(module).is_some()
    }

    pub fn is_bit(&self) -> bool {
        self.len() == 1
    }

    pub fn bit(&self, index: u32) -> SigBit {
        let mut base = 0;
        for chunk in &self.chunks {
            if index < base + chunk.width() {
                return chunk.bit(index - base);
            }
            base += chunk.width();
        }
        panic!("bit index {} out of range for sigspec of width {}", index, base);
    }

    pub fn bits(&self) -> Vec<SigBit> {
        let mut bits = Vec::with_capacity(self.len() as usize);
        for chunk in &self.chunks {
            for index in 0..chunk.width() {
                bits.push(chunk.bit(index));
            }
        }
        bits
    }

    pub fn extract(&self, offset: u32, count: u32) -> SigSpec {
        assert!(offset + count <= self.len());
        SigSpec::from_bits(
            (offset..offset + count).map(|index| self.bit(index)),
        )
    }

    pub fn extract_bit(&self, offset: u32) -> SigSpec {
        self.extract(offset, 1)
    }

    pub fn is_fully_const(&self) -> bool {
        self.chunks
            .iter()
            .all(|chunk| matches!(chunk, SigChunk::Const(_)))
    }

    pub fn as_const(&self) -> Option<Const> {
        if !self.is_fully_const() {
            return None;
        }
        let mut bits = Vec::with_capacity(self.len() as usize);
        for chunk in &self.chunks {
            if let SigChunk::Const(value) = chunk {
                bits.extend_from_slice(value.bits());
            }
        }
        Some(Const::Bits(bits))
    }

    pub fn is_fully_def(&self) -> bool {
        self.as_const().map_or(false, |value| value.is_fully_def())
    }

    pub fn is_fully_ones(&self) -> bool {
        self.as_const().map_or(false, |value| value.is_fully_ones())
    }
}

impl From<SigChunk> for SigSpec {
    fn from(chunk: SigChunk) -> Self {
        SigSpec::from_chunk(chunk)
    }
}

impl From<Const> for SigSpec {
    fn from(value: Const) -> Self {
        SigSpec::constant(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_round_trip() {
        let value = Const::from_u64(0xa5, 8);
        assert_eq!(value.len(), 8);
        assert_eq!(value.as_u64(), 0xa5);
        assert!(value.is_fully_def());
        assert!(!value.is_fully_ones());
        assert_eq!(value.extract(4, 4).as_u64(), 0xa);
    }

    #[test]
    fn bit_merging() {
        let wire = WireId::new(0);
        let sig = SigSpec::from_bits([
            SigBit::Wire(wire, 0),
            SigBit::Wire(wire, 1),
            SigBit::Wire(wire, 2),
            SigBit::Const(State::S0),
            SigBit::Const(State::S1),
            SigBit::Wire(wire, 5),
        ]);
        assert_eq!(sig.chunks().len(), 3);
        assert_eq!(sig.len(), 6);
        assert_eq!(sig.bit(1), SigBit::Wire(wire, 1));
        assert_eq!(sig.bit(4), SigBit::Const(State::S1));
        assert_eq!(sig.bit(5), SigBit::Wire(wire, 5));
    }

    #[test]
    fn extract_rechunks() {
        let a = WireId::new(0);
        let b = WireId::new(1);
        let mut sig = SigSpec::wire(a, 4);
        sig.push(SigChunk::Wire { wire: b, offset: 0, width: 4 });
        let mid = sig.extract(2, 4);
        assert_eq!(
            mid.chunks(),
            &[
                SigChunk::Wire { wire: a, offset: 2, width: 2 },
                SigChunk::Wire { wire: b, offset: 0, width: 2 },
            ]
        );
    }
}
