use bitflags::bitflags;

bitflags! {
    /// Per-address properties discovered during block finding
    ///
    /// The finder keeps one of these for every byte offset of the method (plus one for the
    /// end-of-code position, which try ranges may name as their exclusive end).
    pub struct OpcodeFlags: u8 {
        /// An instruction starts at this address
        const START_OF_INSTRUCTION = 0x01;

        /// A basic block starts at this address
        const START_OF_BASIC_BLOCK = 0x02;

        /// A try range starts at this address (inclusive)
        const START_OF_TRY_BLOCK = 0x04;

        /// A try range ends at this address (exclusive)
        const START_OF_TRY_BLOCK_END = 0x08;

        /// An exception handler starts at this address
        const START_OF_EXCEPTION_HANDLER = 0x10;

        /// A backward branch leaves from this address, making it a safepoint candidate
        const YIELDPOINT = 0x20;

        /// The instruction here follows a `jsr` and is where the subroutine returns to
        const RET_TARGET = 0x40;
    }
}

impl Default for OpcodeFlags {
    fn default() -> Self {
        OpcodeFlags::empty()
    }
}
