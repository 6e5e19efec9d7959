use std::mem;

/// A ping-pong pair of buffers. The trail field's diffusion pass is a
/// neighborhood function of the previous generation, so it reads the current
/// buffer, writes the scratch buffer, and swaps the two at the end of the
/// pass. The swap is the only synchronization point between sub-steps.
pub struct Swapper<T> {
    current: T,
    scratch: T,
}

impl<T> Swapper<T> {
    pub fn new(current: T, scratch: T) -> Self {
        Self { current, scratch }
    }

    pub fn swap(&mut self) {
        mem::swap(&mut self.current, &mut self.scratch)
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    pub fn read_current_write_scratch(&mut self) -> (&T, &mut T) {
        (&self.current, &mut self.scratch)
    }
}
