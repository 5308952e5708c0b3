/// A memory cell, holding either data or an encoded instruction
pub type Word = i64;

/// Index of a memory cell
pub type Address = usize;

/// Number of cells a machine memory may grow to
pub const MEMORY_LIMIT: Address = 1 << 24;

/// Value fed to a networked machine which has nothing in its input queue
pub const IDLE_INPUT: Word = -1;

/// Packet destination reserved for the mailbox living outside the machine array
pub const MAILBOX_ADDRESS: Word = 255;

/// Default number of machines in a network
pub const NETWORK_SIZE: usize = 50;

/// Number of words in a network packet: destination, X and Y
pub const PACKET_LENGTH: usize = 3;

/// Largest number of parameters an instruction takes
pub const MAX_PARAMETERS: usize = 3;
