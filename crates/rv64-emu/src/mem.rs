//! DRAM backing store.
use crate::exception::Exception;

/// A flat, byte-addressable array of guest physical memory starting at `bus::DRAM_BASE`.
#[derive(Debug)]
pub struct Dram {
    data: Vec<u8>,
}

impl Dram {
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
        }
    }

    /// Replace the contents starting at offset 0, growing the backing store if needed.
    pub fn load(&mut self, bytes: Vec<u8>) {
        if bytes.len() > self.data.len() {
            self.data.resize(bytes.len(), 0);
        }
        self.data[..bytes.len()].copy_from_slice(&bytes);
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Copy `bytes` into the image at `offset`. Used by the ELF loader to place sections
    /// away from offset 0.
    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<(), Exception> {
        let end = offset.checked_add(bytes.len()).ok_or(Exception::StoreAMOAccessFault)?;
        if end > self.data.len() {
            return Err(Exception::StoreAMOAccessFault);
        }
        self.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read(&self, offset: u64, size: u8) -> Result<u64, Exception> {
        let nbytes = (size / 8) as usize;
        let offset = offset as usize;
        if offset + nbytes > self.data.len() {
            return Err(Exception::LoadAccessFault);
        }
        let mut value: u64 = 0;
        for i in 0..nbytes {
            value |= (self.data[offset + i] as u64) << (8 * i);
        }
        Ok(value)
    }

    pub fn write(&mut self, offset: u64, value: u64, size: u8) -> Result<(), Exception> {
        let nbytes = (size / 8) as usize;
        let offset = offset as usize;
        if offset + nbytes > self.data.len() {
            return Err(Exception::StoreAMOAccessFault);
        }
        for i in 0..nbytes {
            self.data[offset + i] = ((value >> (8 * i)) & 0xff) as u8;
        }
        Ok(())
    }
}
