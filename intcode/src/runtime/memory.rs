use thiserror::Error;
use tracing::trace;

use crate::constants::{Address, Word, MEMORY_LIMIT};

/// Represents errors related to memory manipulations
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    /// The given address was negative
    #[error("invalid address {0}")]
    InvalidAddress(Word),

    /// The address lies past the largest memory a machine may have
    #[error("address {0} is out of bounds")]
    OutOfBounds(Address),

    /// Growing the memory up to the address failed
    #[error("could not grow memory to address {0}")]
    AllocationFailed(Address),
}

/// Convert a word to an address
///
/// # Errors
///
/// Fails if the word is negative.
pub fn to_address(word: Word) -> Result<Address, MemoryError> {
    Address::try_from(word).map_err(|_| MemoryError::InvalidAddress(word))
}

/// Holds the memory cells of the machine.
///
/// The memory grows on demand: any access past the end extends it with zeroed
/// cells, up to [`MEMORY_LIMIT`] cells. It never shrinks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    inner: Vec<Word>,
}

impl From<Vec<Word>> for Memory {
    fn from(inner: Vec<Word>) -> Self {
        Self { inner }
    }
}

impl From<&[Word]> for Memory {
    fn from(image: &[Word]) -> Self {
        Self {
            inner: image.to_vec(),
        }
    }
}

impl Memory {
    /// Number of cells currently allocated
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Word] {
        &self.inner
    }

    /// Make sure the cell at `address` exists
    fn grow(&mut self, address: Address) -> Result<(), MemoryError> {
        if address < self.inner.len() {
            return Ok(());
        }

        if address >= MEMORY_LIMIT {
            return Err(MemoryError::OutOfBounds(address));
        }

        trace!(from = self.inner.len(), to = address + 1, "Growing memory");
        self.inner
            .try_reserve(address + 1 - self.inner.len())
            .map_err(|_| MemoryError::AllocationFailed(address))?;
        self.inner.resize(address + 1, 0);
        Ok(())
    }

    /// Read the cell at an address, growing the memory if needed
    ///
    /// # Errors
    ///
    /// Fails if the memory can not grow up to the address.
    pub fn read(&mut self, address: Address) -> Result<Word, MemoryError> {
        self.grow(address)?;
        Ok(self.inner[address])
    }

    /// Write a cell at an address, growing the memory if needed
    ///
    /// # Errors
    ///
    /// Fails if the memory can not grow up to the address.
    pub fn write(&mut self, address: Address, value: Word) -> Result<(), MemoryError> {
        self.grow(address)?;
        self.inner[address] = value;
        Ok(())
    }

    /// Look at a cell without growing the memory.
    ///
    /// Cells past the end read as zero, like they would once allocated.
    #[must_use]
    pub fn get(&self, address: Address) -> Word {
        self.inner.get(address).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_on_write_test() {
        let mut memory = Memory::from(vec![1, 2, 3]);
        memory.write(7, 42).unwrap();

        assert_eq!(memory.len(), 8);
        assert_eq!(memory.as_slice(), &[1, 2, 3, 0, 0, 0, 0, 42]);
    }

    #[test]
    fn grow_on_read_test() {
        let mut memory = Memory::from(vec![5]);
        assert_eq!(memory.read(3), Ok(0));
        assert_eq!(memory.len(), 4);
        assert_eq!(memory.read(0), Ok(5));
    }

    #[test]
    fn get_does_not_grow_test() {
        let memory = Memory::from(vec![5]);
        assert_eq!(memory.get(100), 0);
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn out_of_bounds_test() {
        let mut memory = Memory::from(vec![5]);
        let far = to_address(Word::MAX).unwrap();

        assert_eq!(memory.read(far), Err(MemoryError::OutOfBounds(far)));
        assert_eq!(memory.write(far, 1), Err(MemoryError::OutOfBounds(far)));
        assert_eq!(
            memory.write(MEMORY_LIMIT, 1),
            Err(MemoryError::OutOfBounds(MEMORY_LIMIT))
        );
        assert_eq!(memory.len(), 1);
    }

    #[test]
    fn to_address_test() {
        assert_eq!(to_address(12), Ok(12));
        assert_eq!(to_address(0), Ok(0));
        assert_eq!(to_address(-1), Err(MemoryError::InvalidAddress(-1)));
    }
}
