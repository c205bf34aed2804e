// bounded counter of transmitters or receivers at a node
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct TransponderPool {
    in_use:usize,
    // None means unbounded
    capacity:Option<usize>,
}

impl Default for TransponderPool {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl TransponderPool {
    pub fn unbounded() -> Self {
        Self {in_use:0,capacity:None}
    }
    pub fn bounded(capacity:usize) -> Self {
        Self {in_use:0,capacity:Some(capacity)}
    }
    pub fn in_use(&self) -> usize {
        self.in_use
    }
    pub fn has_free(&self) -> bool {
        self.capacity.is_none_or(|c| self.in_use < c)
    }
    pub fn allocate(&mut self) -> bool {
        if !self.has_free() {return false}
        self.in_use += 1;
        true
    }
    pub fn release(&mut self) -> bool {
        if self.in_use == 0 {return false}
        self.in_use -= 1;
        true
    }
}
