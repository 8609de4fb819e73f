// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! MMIO handler registration
//!
//! Hardware blocks expose their registers by installing one read handler and
//! one write handler per 16-bit register address. The mapping itself does no
//! decoding beyond an exact address lookup, so each device stays in charge of
//! its own side effects.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 Mapping                     │
//! ├─────────────────────────────────────────────┤
//! │  handlers: HashMap<u32, (read, write)>      │
//! │                                             │
//! │  read16(addr)  -> handlers[addr].read(addr) │
//! │  write16(addr) -> handlers[addr].write(..)  │
//! └─────────────────────────────────────────────┘
//!                     ▲
//!                     │ register_mmio(mapping, base)
//!              ┌──────┴──────┐
//!              │ VideoBackend│
//!              │ (CP regs)   │
//!              └─────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use gxvideo::core::memory::Mapping;
//! use std::sync::atomic::{AtomicU16, Ordering};
//! use std::sync::Arc;
//!
//! let reg = Arc::new(AtomicU16::new(0));
//! let mut mapping = Mapping::new();
//!
//! let r = reg.clone();
//! let w = reg.clone();
//! mapping.register(
//!     0xCC00_0002,
//!     Box::new(move |_| r.load(Ordering::Acquire)),
//!     Box::new(move |_, value| w.store(value, Ordering::Release)),
//! );
//!
//! mapping.write16(0xCC00_0002, 0x1234).unwrap();
//! assert_eq!(mapping.read16(0xCC00_0002).unwrap(), 0x1234);
//! ```

use crate::core::error::{Result, VideoError};
use std::collections::HashMap;

/// Read handler: receives the accessed address, returns the register value
pub type ReadHandler = Box<dyn Fn(u32) -> u16 + Send + Sync>;

/// Write handler: receives the accessed address and the written value
pub type WriteHandler = Box<dyn Fn(u32, u16) + Send + Sync>;

/// Address-to-handler table for 16-bit registers
#[derive(Default)]
pub struct Mapping {
    handlers: HashMap<u32, (ReadHandler, WriteHandler)>,
}

impl Mapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Install handlers at `address`, replacing any previous pair
    pub fn register(&mut self, address: u32, read: ReadHandler, write: WriteHandler) {
        if self.handlers.insert(address, (read, write)).is_some() {
            log::warn!("MMIO: handlers at 0x{:08X} replaced", address);
        }
    }

    /// Read handler that logs and returns 0, for write-only registers
    pub fn invalid_read() -> ReadHandler {
        Box::new(|addr| {
            log::warn!("MMIO: read from write-only register 0x{:08X}", addr);
            0
        })
    }

    /// Write handler that logs and discards, for read-only registers
    pub fn invalid_write() -> WriteHandler {
        Box::new(|addr, value| {
            log::warn!(
                "MMIO: write of 0x{:04X} to read-only register 0x{:08X}",
                value,
                addr
            );
        })
    }

    /// Check whether an address has handlers
    pub fn contains(&self, address: u32) -> bool {
        self.handlers.contains_key(&address)
    }

    /// Number of registered addresses
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check whether no handler is registered
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Read a 16-bit register
    ///
    /// # Errors
    ///
    /// Returns `InvalidMemoryAccess` if nothing is mapped at `address`.
    pub fn read16(&self, address: u32) -> Result<u16> {
        let (read, _) = self.lookup(address, 2)?;
        Ok(read(address))
    }

    /// Write a 16-bit register
    pub fn write16(&self, address: u32, value: u16) -> Result<()> {
        let (_, write) = self.lookup(address, 2)?;
        write(address, value);
        Ok(())
    }

    /// Read a 32-bit value as two 16-bit registers, high half first
    pub fn read32(&self, address: u32) -> Result<u32> {
        let hi = self.read16(address)? as u32;
        let lo = self.read16(address + 2)? as u32;
        Ok((hi << 16) | lo)
    }

    /// Write a 32-bit value as two 16-bit registers, high half first
    pub fn write32(&self, address: u32, value: u32) -> Result<()> {
        self.write16(address, (value >> 16) as u16)?;
        self.write16(address + 2, value as u16)
    }

    fn lookup(&self, address: u32, len: usize) -> Result<&(ReadHandler, WriteHandler)> {
        self.handlers
            .get(&address)
            .ok_or(VideoError::InvalidMemoryAccess { address, len })
    }
}
