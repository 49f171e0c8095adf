const DELETED: u8 = 1 << 0;
const BOUNDARY: u8 = 1 << 1;

/// Bit flags stored alongside every node and element of the mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Status {
    flags: u8,
}

impl Status {
    fn check(&self, i: u8) -> bool {
        self.flags & i > 0
    }

    fn set(&mut self, i: u8, flag: bool) {
        if flag {
            self.flags |= i;
        } else {
            self.flags &= !i;
        }
    }

    pub fn deleted(&self) -> bool {
        self.check(DELETED)
    }

    pub fn set_deleted(&mut self, flag: bool) {
        self.set(DELETED, flag);
    }

    /// Only meaningful for nodes. Set for nodes on the outer boundary of the
    /// tissue.
    pub fn boundary(&self) -> bool {
        self.check(BOUNDARY)
    }

    pub fn set_boundary(&mut self, flag: bool) {
        self.set(BOUNDARY, flag)
    }
}
