// LineId is consistent and stable across an entire crossbar's lifetime.
// repr(transparent) -> same memory layout as the wrapped u32, so it stays
// a free conversion when indexing into the line arrays.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId(pub u32);

impl LineId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for LineId {
    fn from(v: u32) -> Self {
        LineId(v)
    }
}

impl From<usize> for LineId {
    fn from(v: usize) -> Self {
        LineId(v as u32)
    }
}
